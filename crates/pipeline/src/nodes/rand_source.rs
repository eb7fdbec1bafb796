//! Random vector generator.

use crate::config::Edge;
use crate::error::StageResult;
use crate::node::{Node, NodeCore};
use flow_types::{ModuleType, Sample, SharedContext, TaggedValue};
use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Emits one vector of uniform random samples per `start()`, for a fixed
/// number of pulses.
pub struct RandSource<T: Sample> {
    core: NodeCore,
    chunk_len: usize,
    max_pulses: u64,
    state: Mutex<RandState>,
    _kind: std::marker::PhantomData<fn() -> T>,
}

struct RandState {
    pulses: u64,
    output: Option<TaggedValue>,
}

impl<T: Sample> RandSource<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: u8,
        name: &str,
        edges: Vec<Edge>,
        out_vector_size: usize,
        vlen: usize,
        trig_start: bool,
        max_pulses: u64,
        context: SharedContext,
    ) -> Self {
        Self {
            core: NodeCore::new(ModuleType::SrcNoise, index, name, edges, trig_start, context),
            chunk_len: out_vector_size * vlen.max(1),
            max_pulses,
            state: Mutex::new(RandState {
                pulses: 0,
                output: None,
            }),
            _kind: std::marker::PhantomData,
        }
    }

    fn state(&self) -> MutexGuard<'_, RandState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pulses(&self) -> u64 {
        self.state().pulses
    }
}

impl<T: Sample> Node for RandSource<T> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn set_first_input(&self, _value: &TaggedValue) -> StageResult {
        Ok(())
    }

    fn process(&self, _value: &TaggedValue) -> StageResult {
        Ok(())
    }

    fn start(&self) -> StageResult {
        let chunk = {
            let mut state = self.state();
            if state.pulses >= self.max_pulses {
                return Ok(());
            }
            state.pulses += 1;

            let mut rng = rand::thread_rng();
            let samples: Vec<T> = (0..self.chunk_len).map(|_| T::random_unit(&mut rng)).collect();
            let value = TaggedValue::gen_vector_from_slice(&samples);
            state.output = Some(value.clone());
            value
        };
        self.core.emit_output(chunk)
    }

    fn is_done(&self) -> bool {
        self.state().pulses >= self.max_pulses
    }

    fn output(&self) -> Option<TaggedValue> {
        self.state().output.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_types::{DataType, RunContext};

    #[test]
    fn test_done_after_max_pulses() {
        let src = RandSource::<u8>::new(1, "noise", vec![], 5, 1, true, 2, RunContext::new().shared());
        let count = std::sync::Arc::new(Mutex::new(0));
        let c = count.clone();
        src.core().on_new_data.connect(move |v: &TaggedValue| {
            assert_eq!(v.length()?, 5);
            assert!(v.elements::<u8>()?.iter().all(|x| *x <= 1));
            *c.lock().unwrap() += 1;
            Ok(())
        });

        while !src.is_done() {
            src.start().unwrap();
        }
        src.start().unwrap();
        assert_eq!(*count.lock().unwrap(), 2);
        assert_eq!(src.pulses(), 2);
    }

    #[test]
    fn test_tags_as_noise_source() {
        let src = RandSource::<f32>::new(4, "noise", vec![], 3, 2, true, 1, RunContext::new().shared());
        let kinds = std::sync::Arc::new(Mutex::new(Vec::new()));
        let k = kinds.clone();
        src.core().on_new_tag.connect(move |tag: &flow_types::EventRecord| {
            k.lock().unwrap().push((tag.key.module_type(), tag.data_type));
            Ok(())
        });
        src.start().unwrap();
        assert_eq!(
            *kinds.lock().unwrap(),
            vec![(Some(ModuleType::SrcNoise), DataType::GvecFloat)]
        );
        assert_eq!(src.output().unwrap().length(), Ok(6));
    }
}
