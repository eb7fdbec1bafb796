use crate::id::{ObjectId, RunId};
use std::sync::Arc;
use std::time::Instant;

/// Per-run state shared by the graph builder, every node and the event log.
#[derive(Debug)]
pub struct RunContext {
    run_id: RunId,
    started: Instant,
}

pub type SharedContext = Arc<RunContext>;

impl RunContext {
    /// Context with a freshly drawn random run id.
    pub fn new() -> Self {
        Self::with_run_id(RunId::from_random())
    }

    pub fn with_run_id(run_id: RunId) -> Self {
        Self {
            run_id,
            started: Instant::now(),
        }
    }

    /// Child context whose run id is derived from this one.
    pub fn derived(&self, parent: &ObjectId, counter: u64) -> Self {
        Self::with_run_id(RunId::from_unique_bytes(&self.run_id, parent, counter))
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Monotonic milliseconds since this context was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn shared(self) -> SharedContext {
        Arc::new(self)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
