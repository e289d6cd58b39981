//! Core error types.

use thiserror::Error;

/// Errors raised while interpreting client-supplied values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A headless status report carried a token or code we do not know.
    #[error("unrecognized headless status: {0}")]
    InvalidHeadlessStatus(String),

    /// A required identifier was empty.
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
