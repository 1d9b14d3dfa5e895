//! Core error types.

use thiserror::Error;

/// Errors raised while constructing core identity types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The module ID is malformed.
    #[error("invalid module id: {0}")]
    InvalidId(String),

    /// The component key is malformed.
    #[error("invalid component key: {0}")]
    InvalidKey(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
