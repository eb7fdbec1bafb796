//! Vector sink: records every vector and tag it receives.

use crate::config::Edge;
use crate::error::StageResult;
use crate::event_log::TagSink;
use crate::node::{Node, NodeCore};
use flow_types::{EventRecord, ModuleType, Sample, SharedContext, TaggedValue};
use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct VecSink<T: Sample> {
    core: NodeCore,
    state: Mutex<SinkState<T>>,
}

struct SinkState<T> {
    data: Vec<T>,
    chunks: Vec<TaggedValue>,
    tags: Vec<EventRecord>,
}

impl<T: Sample> VecSink<T> {
    pub fn new(
        index: u8,
        name: &str,
        edges: Vec<Edge>,
        trig_start: bool,
        context: SharedContext,
    ) -> Self {
        Self {
            core: NodeCore::new(ModuleType::SinkVec, index, name, edges, trig_start, context),
            state: Mutex::new(SinkState {
                data: Vec::new(),
                chunks: Vec::new(),
                tags: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SinkState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, value: &TaggedValue) -> StageResult {
        let items = value.elements::<T>()?;
        debug!(node = %self.core.name(), len = items.len(), "Sink received vector");
        let mut state = self.state();
        state.data.extend_from_slice(&items);
        state.chunks.push(value.clone());
        Ok(())
    }

    /// All received elements, in arrival order.
    pub fn data(&self) -> Vec<T> {
        self.state().data.clone()
    }

    /// Received vectors, one per delivery.
    pub fn chunks(&self) -> Vec<TaggedValue> {
        self.state().chunks.clone()
    }

    pub fn tags(&self) -> Vec<EventRecord> {
        self.state().tags.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state();
        state.data.clear();
        state.chunks.clear();
        state.tags.clear();
    }
}

impl<T: Sample> Node for VecSink<T> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn set_first_input(&self, value: &TaggedValue) -> StageResult {
        self.record(value)?;
        self.core.emit_first_input()
    }

    fn process(&self, value: &TaggedValue) -> StageResult {
        self.record(value)
    }

    fn start(&self) -> StageResult {
        Ok(())
    }

    fn is_done(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Sample> TagSink for VecSink<T> {
    fn log_tag(&self, tag: &EventRecord) -> StageResult {
        self.state().tags.push(tag.clone());
        Ok(())
    }
}
