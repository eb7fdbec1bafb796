//! Element-wise adder of two equally sized vectors.
//!
//! The first operand arrives through `set_first_input` (or, when nothing is
//! latched yet, through `process`). Every later `process` call adds its
//! operand to the latched one and emits the sum. The latch stays until
//! `set_first_input` replaces it.

use crate::config::Edge;
use crate::error::StageResult;
use crate::node::{Node, NodeCore};
use flow_types::{ModuleType, Sample, SharedContext, TaggedValue, ValueError};
use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct Adder<T: Sample> {
    core: NodeCore,
    size: usize,
    state: Mutex<AdderState<T>>,
}

struct AdderState<T> {
    latched: Option<Vec<T>>,
    output: Option<TaggedValue>,
}

impl<T: Sample> Adder<T> {
    pub fn new(
        index: u8,
        name: &str,
        edges: Vec<Edge>,
        out_vector_size: usize,
        trig_start: bool,
        context: SharedContext,
    ) -> Self {
        Self {
            core: NodeCore::new(ModuleType::Adder, index, name, edges, trig_start, context),
            size: out_vector_size,
            state: Mutex::new(AdderState {
                latched: None,
                output: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, AdderState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a first operand is waiting for its partner.
    pub fn has_first_input(&self) -> bool {
        self.state().latched.is_some()
    }

    fn operand(&self, value: &TaggedValue) -> StageResult<Vec<T>> {
        let items = value.elements::<T>()?;
        if items.len() != self.size {
            return Err(ValueError::LengthMismatch {
                expected: self.size,
                actual: items.len(),
            }
            .into());
        }
        Ok(items)
    }
}

impl<T: Sample> Node for Adder<T> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn set_first_input(&self, value: &TaggedValue) -> StageResult {
        let items = self.operand(value)?;
        self.state().latched = Some(items);
        self.core.emit_first_input()
    }

    fn process(&self, value: &TaggedValue) -> StageResult {
        let items = self.operand(value)?;

        let sum = {
            let mut guard = self.state();
            let state = &mut *guard;
            match &state.latched {
                None => {
                    state.latched = Some(items);
                    None
                }
                Some(first) => {
                    let sum: Vec<T> = first
                        .iter()
                        .zip(&items)
                        .map(|(a, b)| Sample::add(*a, *b))
                        .collect();
                    let value = TaggedValue::gen_vector_from_slice(&sum);
                    state.output = Some(value.clone());
                    Some(value)
                }
            }
        };

        match sum {
            Some(value) => self.core.emit_output(value),
            None => {
                debug!(node = %self.core.name(), "Latched first operand from process");
                self.core.emit_first_input()
            }
        }
    }

    fn start(&self) -> StageResult {
        Ok(())
    }

    fn is_done(&self) -> bool {
        true
    }

    fn output(&self) -> Option<TaggedValue> {
        self.state().output.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
