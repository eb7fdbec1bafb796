//! Error types for values and identifiers

use crate::kind::DataType;
use thiserror::Error;

/// Recoverable failures raised by `TaggedValue` accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("wrong type: expected {expected}, found {found}")]
    WrongType { expected: DataType, found: DataType },

    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("key not found in dictionary")]
    KeyNotFound,
}

/// Precondition violations raised while constructing identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("module index {0} exceeds the 8-bit field")]
    ModuleIndexOutOfRange(u64),

    #[error("paket index {0} exceeds the 32-bit field")]
    PaketIndexOutOfRange(u64),

    #[error("expected {expected} bytes, but got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex identifier '{0}'")]
    InvalidHex(String),
}

pub type ValueResult<T> = Result<T, ValueError>;
