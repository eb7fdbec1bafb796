//! In-process dataflow pipeline runtime.
//!
//! Nodes declared in a `SystemConfig` are built by kind-indexed factories,
//! stored in a heterogeneous `NodeRegistry` and wired through synchronous
//! `Signal` channels. Running the graph starts the trigger nodes; everything
//! after that is driven by the events the nodes emit.

pub mod config;
pub mod error;
pub mod event;
pub mod event_log;
pub mod factory;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod registry;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use event::*;
pub use event_log::*;
pub use factory::*;
pub use graph::*;
pub use node::*;
pub use nodes::*;
pub use registry::*;
