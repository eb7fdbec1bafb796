//! Processing node contract and the state every node shares

use crate::config::Edge;
use crate::error::{StageError, StageResult};
use crate::event::Signal;
use flow_types::{EventRecord, ModuleType, ObjectId, SharedContext, TaggedValue};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Core trait that all processing nodes implement.
///
/// Every method takes `&self`: nodes are shared between the registry and the
/// subscriptions of their upstream nodes, and guard their own mutable state.
/// Implementations must release that state before emitting, since delivery is
/// synchronous and may re-enter the node.
pub trait Node: Send + Sync + 'static {
    fn core(&self) -> &NodeCore;

    /// Latches the first operand and fires `on_first_input_set`.
    fn set_first_input(&self, value: &TaggedValue) -> StageResult;

    /// Consumes one input, firing `on_new_tag` then `on_new_data` for any output.
    fn process(&self, value: &TaggedValue) -> StageResult;

    /// Produces the next chunk, or marks the node done.
    fn start(&self) -> StageResult;

    fn is_done(&self) -> bool;

    /// Most recently produced output.
    fn output(&self) -> Option<TaggedValue> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn index(&self) -> u8 {
        self.core().index()
    }

    fn module_type(&self) -> ModuleType {
        self.core().module_type()
    }

    fn edges(&self) -> &[Edge] {
        self.core().edges()
    }

    fn trig_start(&self) -> bool {
        self.core().trig_start()
    }
}

pub type NodeHandle = Arc<dyn Node>;

/// Identity, wiring and event channels of one node.
pub struct NodeCore {
    module_type: ModuleType,
    index: u8,
    name: String,
    edges: Vec<Edge>,
    trig_start: bool,
    paket_index: AtomicU64,
    context: SharedContext,
    pub on_new_tag: Signal<EventRecord>,
    pub on_new_data: Signal<TaggedValue>,
    pub on_first_input_set: Signal<()>,
}

impl NodeCore {
    pub fn new(
        module_type: ModuleType,
        index: u8,
        name: &str,
        edges: Vec<Edge>,
        trig_start: bool,
        context: SharedContext,
    ) -> Self {
        Self {
            module_type,
            index,
            name: name.to_string(),
            edges,
            trig_start,
            paket_index: AtomicU64::new(0),
            context,
            on_new_tag: Signal::new("on_new_tag"),
            on_new_data: Signal::new("on_new_data"),
            on_first_input_set: Signal::new("on_first_input_set"),
        }
    }

    pub fn module_type(&self) -> ModuleType {
        self.module_type
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn trig_start(&self) -> bool {
        self.trig_start
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Packets emitted so far.
    pub fn paket_count(&self) -> u64 {
        self.paket_index.load(Ordering::Relaxed)
    }

    /// Stamps `value` with the next packet identifier, then fires
    /// `on_new_tag` followed by `on_new_data`.
    pub fn emit_output(&self, value: TaggedValue) -> StageResult {
        let paket = self.paket_index.fetch_add(1, Ordering::Relaxed);
        let key = ObjectId::for_module_index(
            self.context.run_id(),
            self.module_type,
            self.index as u64,
            paket,
        )?;
        let tag = EventRecord::new(self.context.elapsed_ms(), key, value.data_type(), value.clone());
        debug!(node = %self.name, index = self.index, packet = paket, "Emitting output");

        self.on_new_tag.emit(&tag)?;
        self.on_new_data.emit(&value)
    }

    pub fn emit_first_input(&self) -> StageResult {
        self.on_first_input_set.emit(&())
    }

    /// Error for an operation a node kind does not support.
    pub fn unsupported(&self, operation: &str) -> StageError {
        StageError::BadParam(format!(
            "{} node '{}' does not support {}",
            self.module_type, self.name, operation
        ))
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("module_type", &self.module_type)
            .field("index", &self.index)
            .field("name", &self.name)
            .field("edges", &self.edges)
            .field("trig_start", &self.trig_start)
            .finish()
    }
}

impl fmt::Display for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModuleName:{} ModuleIndex:{} AdjacencyConnection:",
            self.name, self.index
        )?;
        for edge in &self.edges {
            write!(f, "{}", edge)?;
        }
        Ok(())
    }
}

/// Recovers the concrete node type behind a handle.
pub fn downcast_node<N: Node>(node: &NodeHandle) -> Option<&N> {
    node.as_any().downcast_ref::<N>()
}
