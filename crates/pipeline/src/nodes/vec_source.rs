//! Vector source: replays a backing buffer in fixed-size chunks.

use crate::config::Edge;
use crate::error::{StageError, StageResult};
use crate::node::{Node, NodeCore};
use flow_types::{ModuleType, Sample, SharedContext, TaggedValue};
use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct VecSource<T: Sample> {
    core: NodeCore,
    out_vector_size: usize,
    state: Mutex<SourceState<T>>,
}

struct SourceState<T> {
    data: Vec<T>,
    repeat: bool,
    vlen: usize,
    offset: usize,
    done: bool,
    output: Option<TaggedValue>,
}

impl<T: Sample> VecSource<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: u8,
        name: &str,
        edges: Vec<Edge>,
        out_vector_size: usize,
        trig_start: bool,
        data: &TaggedValue,
        repeat: bool,
        vlen: usize,
        context: SharedContext,
    ) -> StageResult<Self> {
        let data = data.elements::<T>()?;
        check_vlen(data.len(), vlen)?;

        Ok(Self {
            core: NodeCore::new(ModuleType::SrcVec, index, name, edges, trig_start, context),
            out_vector_size,
            state: Mutex::new(SourceState {
                data,
                repeat,
                vlen,
                offset: 0,
                done: false,
                output: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, SourceState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restarts playback from the first element.
    pub fn rewind(&self) {
        let mut state = self.state();
        state.offset = 0;
        state.done = false;
    }

    /// Replaces the backing buffer and rewinds.
    pub fn set_data(&self, data: &TaggedValue) -> StageResult {
        let data = data.elements::<T>()?;
        let mut state = self.state();
        check_vlen(data.len(), state.vlen)?;
        state.data = data;
        state.offset = 0;
        state.done = false;
        Ok(())
    }

    pub fn set_repeat(&self, repeat: bool) {
        self.state().repeat = repeat;
    }

    pub fn repeat(&self) -> bool {
        self.state().repeat
    }

    pub fn vlen(&self) -> usize {
        self.state().vlen
    }

    /// Elements per emitted chunk.
    pub fn chunk_len(&self) -> usize {
        self.out_vector_size * self.vlen()
    }

    fn next_chunk(&self) -> Option<TaggedValue> {
        let mut state = self.state();
        if state.done {
            return None;
        }

        let chunk_len = self.out_vector_size * state.vlen;
        let size = state.data.len();
        let mut chunk = vec![T::default(); chunk_len];

        if state.repeat {
            if size == 0 {
                state.done = true;
                return None;
            }
            let mut offset = state.offset;
            for slot in chunk.iter_mut() {
                *slot = state.data[offset];
                offset += 1;
                if offset >= size {
                    offset = 0;
                }
            }
            state.offset = offset;
        } else {
            if state.offset >= size {
                state.done = true;
                return None;
            }
            let n = (size - state.offset).min(chunk_len);
            chunk[..n].copy_from_slice(&state.data[state.offset..state.offset + n]);
            state.offset += n;
            if state.offset >= size {
                state.done = true;
            }
        }

        let value = TaggedValue::gen_vector_from_slice(&chunk);
        state.output = Some(value.clone());
        Some(value)
    }
}

fn check_vlen(len: usize, vlen: usize) -> StageResult {
    if vlen == 0 || len % vlen != 0 {
        return Err(StageError::BadParam(format!(
            "data length {} must be a multiple of vlen {}",
            len, vlen
        )));
    }
    Ok(())
}

impl<T: Sample> Node for VecSource<T> {
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
        match self.next_chunk() {
            Some(chunk) => self.core.emit_output(chunk),
            None => {
                debug!(node = %self.core.name(), "Source exhausted");
                Ok(())
            }
        }
    }

    fn is_done(&self) -> bool {
        self.state().done
    }

    fn output(&self) -> Option<TaggedValue> {
        self.state().output.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
