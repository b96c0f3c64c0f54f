//! LUT error types.

use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors that can occur during LUT operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LutError {
    /// Invalid LUT size.
    #[error("invalid LUT size: {0}")]
    InvalidSize(String),

    /// Entry count does not match the declared size.
    #[error("expected {expected} entries, got {actual}")]
    DataLength {
        /// Entries required by the size
        expected: usize,
        /// Entries provided
        actual: usize,
    },
}
