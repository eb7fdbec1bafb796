use crate::id::ObjectId;
use crate::kind::DataType;
use crate::value::TaggedValue;
use std::cmp::Ordering;

/// One emitted output: when it was produced, by whom, and what it carries.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// Milliseconds since the run started.
    pub timetag_ms: u64,
    pub key: ObjectId,
    pub data_type: DataType,
    pub value: TaggedValue,
}

impl EventRecord {
    pub fn new(timetag_ms: u64, key: ObjectId, data_type: DataType, value: TaggedValue) -> Self {
        Self {
            timetag_ms,
            key,
            data_type,
            value,
        }
    }

    /// Orders records by production time, earliest first.
    pub fn timetag_compare(a: &EventRecord, b: &EventRecord) -> Ordering {
        a.timetag_ms.cmp(&b.timetag_ms)
    }
}

impl PartialEq for EventRecord {
    fn eq(&self, other: &Self) -> bool {
        self.timetag_ms == other.timetag_ms
            && self.key == other.key
            && self.data_type == other.data_type
            && self.value.equal(&other.value)
    }
}
