//! Error types for the command line front end.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Thread count outside the supported range
    #[error("Invalid thread count {0}: must be between 1 and {max}", max = crate::config::MAX_THREADS)]
    InvalidThreads(usize),

    /// Hit limit of zero
    #[error("Invalid hit limit: must be at least 1")]
    InvalidMaxHits,

    /// Missing required configuration value
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Bulk search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Search root is not a directory
    #[error("Search root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Invalid search configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}
