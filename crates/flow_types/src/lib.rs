//! Shared types for the pipeline processing runtime
//!
//! This crate contains the values that flow between processing nodes, the
//! packed binary identifiers used to stamp every produced packet, and the
//! event records ("tags") handed to the event log.

pub mod error;
pub mod kind;
pub mod numeric;
pub mod value;
pub mod id;
pub mod tag;
pub mod context;

// Re-export commonly used types
pub use error::*;
pub use kind::*;
pub use numeric::*;
pub use value::*;
pub use id::*;
pub use tag::*;
pub use context::*;
