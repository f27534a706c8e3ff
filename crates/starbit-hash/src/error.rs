//! Error types for name table operations

use thiserror::Error;

/// Errors that can occur while loading or persisting name tables
#[derive(Debug, Error)]
pub enum HashError {
    /// Lookup file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A name cannot be stored in the lookup file
    #[error("invalid field name {0:?}: names must be a single non-empty line")]
    InvalidName(String),
}

/// Result type for name table operations
pub type HashResult<T> = Result<T, HashError>;
