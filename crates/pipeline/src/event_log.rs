//! Event log: one text line per emitted tag.

use crate::error::{StageError, StageResult};
use chrono::Local;
use flow_types::{EventRecord, ModuleType, RunId};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub const EVENT_LOG_HEADER: &str =
    "TimeStamp, TimeTag, RunID, ModuleTyp, ModuleIdx, PaketIdx, DataTyp, Data";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Receiver of the `on_new_tag` stream of logger-adjacent nodes.
pub trait TagSink: Send + Sync {
    fn log_tag(&self, tag: &EventRecord) -> StageResult;

    fn flush(&self) -> StageResult {
        Ok(())
    }
}

/// Renders one event log line (without the trailing newline).
///
/// Numeric payloads list every element followed by `", "`; complex elements
/// print as `(re:im)`. Other payloads fall back to their display form.
pub fn format_tag_line(timestamp: &str, tag: &EventRecord) -> String {
    let key = &tag.key;
    let mut line = format!(
        "{}, {}, {}, {}, {}, {}, {}, ",
        timestamp,
        tag.timetag_ms,
        key.run_id_value(),
        ModuleType::name_of(key.module_type_code()),
        key.module_index(),
        key.paket_index(),
        tag.data_type.name(),
    );
    match tag.value.numeric_data() {
        Ok(data) => data.write_elements(&mut line),
        Err(_) => line.push_str(&tag.value.to_string()),
    }
    line
}

fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Appends tag lines to `pl_event_<run-id>.log`.
///
/// The file is created on the first tag and stays open until the log is
/// dropped.
pub struct EventLog {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl EventLog {
    pub fn new(dir: impl AsRef<Path>, run_id: RunId) -> Self {
        let path = dir.as_ref().join(format!("pl_event_{}.log", run_id.hex()));
        Self {
            path,
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> StageResult<BufWriter<File>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent).map_err(|e| {
                    StageError::Fatal(format!("Failed to create log directory {:?}: {}", parent, e))
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                StageError::Fatal(format!("Failed to open event log {:?}: {}", self.path, e))
            })?;
        let is_new = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if is_new {
            writeln!(writer, "{}", EVENT_LOG_HEADER)?;
        }
        info!(path = ?self.path, "Opened event log");
        Ok(writer)
    }
}

impl TagSink for EventLog {
    fn log_tag(&self, tag: &EventRecord) -> StageResult {
        let mut guard = self.writer();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        if let Some(writer) = guard.as_mut() {
            writeln!(writer, "{}", format_tag_line(&now(), tag))?;
        }
        Ok(())
    }

    fn flush(&self) -> StageResult {
        if let Some(writer) = self.writer().as_mut() {
            writer.flush()?;
            debug!(path = ?self.path, "Flushed event log");
        }
        Ok(())
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Err(e) = TagSink::flush(self) {
            warn!(path = ?self.path, "Failed to flush event log: {}", e);
        }
    }
}

/// Keeps every tag and its rendered line in memory.
#[derive(Default)]
pub struct MemoryTagLog {
    entries: Mutex<Vec<(EventRecord, String)>>,
}

impl MemoryTagLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<(EventRecord, String)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.entries().iter().map(|(tag, _)| tag.clone()).collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(|(_, line)| line.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl TagSink for MemoryTagLog {
    fn log_tag(&self, tag: &EventRecord) -> StageResult {
        let line = format_tag_line(&now(), tag);
        self.entries().push((tag.clone(), line));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_types::{DataType, ObjectId, TaggedValue};
    use num_complex::Complex32;

    fn tag(value: TaggedValue) -> EventRecord {
        let key = ObjectId::for_module_index(RunId::from_int(7), ModuleType::Adder, 2, 5).unwrap();
        EventRecord::new(42, key, value.data_type(), value)
    }

    #[test]
    fn test_line_layout() {
        let line = format_tag_line("T", &tag(TaggedValue::gen_vector_from_slice(&[1u8, 2, 3])));
        assert_eq!(line, "T, 42, 7, ADDER, 2, 5, GVEC_UINT8, 1, 2, 3, ");
    }

    #[test]
    fn test_complex_elements() {
        let line = format_tag_line(
            "T",
            &tag(TaggedValue::gen_vector_from_slice(&[Complex32::new(1.5, -2.0)])),
        );
        assert!(line.ends_with("GVEC_COMPLEX_FLOAT, (1.5:-2), "), "{}", line);
    }

    #[test]
    fn test_unknown_module_code() {
        let key = ObjectId::from_binary(&[0, 0, 0x7f, 1, 0, 0, 0, 0]).unwrap();
        let value = TaggedValue::gen_vector_from_slice(&[1i8]);
        let line = format_tag_line("T", &EventRecord::new(0, key, DataType::GvecInt8, value));
        assert!(line.contains(", UNKNOWN, 1, 0, GVEC_INT8, 1, "));
    }

    #[test]
    fn test_file_written_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::from_int(0xabcd);
        let log = EventLog::new(dir.path(), run_id);
        assert!(log.path().ends_with("pl_event_cdab.log"));
        assert!(!log.path().exists());

        log.log_tag(&tag(TaggedValue::gen_vector_from_slice(&[9u8]))).unwrap();
        log.log_tag(&tag(TaggedValue::gen_vector_from_slice(&[8u8]))).unwrap();
        TagSink::flush(&log).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], EVENT_LOG_HEADER);
        assert!(lines[1].ends_with(", 42, 7, ADDER, 2, 5, GVEC_UINT8, 9, "));
    }

    #[test]
    fn test_reopened_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::from_int(0x0304);
        {
            let log = EventLog::new(dir.path(), run_id);
            log.log_tag(&tag(TaggedValue::gen_vector_from_slice(&[1u8]))).unwrap();
        }
        let log = EventLog::new(dir.path(), run_id);
        log.log_tag(&tag(TaggedValue::gen_vector_from_slice(&[2u8]))).unwrap();
        TagSink::flush(&log).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], EVENT_LOG_HEADER);
        assert!(lines[1].ends_with("GVEC_UINT8, 1, "));
        assert!(lines[2].ends_with("GVEC_UINT8, 2, "));
    }

    #[test]
    fn test_memory_log_keeps_records() {
        let log = MemoryTagLog::new();
        assert!(log.is_empty());
        let record = tag(TaggedValue::gen_vector_from_slice(&[1u16]));
        log.log_tag(&record).unwrap();
        assert_eq!(log.records(), vec![record]);
        assert!(log.lines()[0].contains("GVEC_UINT16"));
    }
}
