//! Errors in the library.
use thiserror::Error;

/// Error type of the crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Lengths of a parameter array and its gradient disagree.
    #[error("shape mismatch for parameter {param}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Identifier of the offending parameter.
        param: String,
        /// Length of the parameter array.
        expected: usize,
        /// Length of the gradient array.
        actual: usize,
    },

    /// A gradient refers to a parameter the weight set does not contain.
    #[error("unknown parameter: {0}")]
    UnknownParam(String),

    /// A parameter has no gradient in the batch.
    #[error("missing gradient for parameter: {0}")]
    MissingGradient(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
