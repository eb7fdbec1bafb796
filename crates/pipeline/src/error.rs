//! Error types for the pipeline system

use flow_types::{IdError, ValueError};
use thiserror::Error;

/// Errors raised while building or wiring a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown data type '{data_type}' for node '{node}'")]
    UnknownDataType { node: String, data_type: String },

    #[error("Invalid connection from '{from}' to '{to}': {message}")]
    InvalidConnection {
        from: String,
        to: String,
        message: String,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Duplicate node name: {name}")]
    DuplicateNode { name: String },

    #[error("Too many nodes: index {index} does not fit the 8-bit module index")]
    TooManyNodes { index: u64 },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stage error in '{node}': {source}")]
    Stage {
        node: String,
        #[source]
        source: StageError,
    },
}

impl From<StageError> for PipelineError {
    fn from(err: StageError) -> Self {
        PipelineError::Stage {
            node: "unknown".to_string(),
            source: err,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by a node while it handles an event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("value error: {0}")]
    Value(#[from] ValueError),
    #[error("identifier error: {0}")]
    Id(#[from] IdError),
    #[error("node is not ready: {0}")]
    NotReady(String),
    #[error("bad param {0}")]
    BadParam(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<std::io::Error> for StageError {
    fn from(err: std::io::Error) -> Self {
        StageError::Io(err.to_string())
    }
}

pub type StageResult<T = ()> = Result<T, StageError>;
