//! MSBF error types

use thiserror::Error;

use crate::lms::LmsError;

/// MSBF-specific error type
#[derive(Debug, Error)]
pub enum MsbfError {
    /// Container-level error
    #[error(transparent)]
    Lms(#[from] LmsError),

    /// Node or char counts do not fit in the FLW2 section
    #[error("{nodes} nodes and {chars} char codes exceed a {size}-byte section")]
    CountsExceedSection {
        /// Declared node count
        nodes: u16,
        /// Declared char count
        chars: u16,
        /// Section size
        size: usize,
    },

    /// Entry label names a node that is not an entry
    #[error("label {label:?} names node {index}, which is not an entry node")]
    InvalidLabelTarget {
        /// Label text
        label: String,
        /// Referenced node
        index: u32,
    },

    /// Flow node uses the entry kind code
    #[error("flow node {0} uses the reserved entry kind")]
    ReservedFlowKind(usize),

    /// Node index past the end of the graph
    #[error("node {index} out of range ({count} nodes)")]
    NodeOutOfRange {
        /// Requested index
        index: usize,
        /// Number of nodes
        count: usize,
    },

    /// Char index past the end of the char table
    #[error("char index {index} out of range ({count} codes)")]
    CharOutOfRange {
        /// Requested index
        index: usize,
        /// Number of codes
        count: usize,
    },

    /// Graph exceeds the 16-bit counts of the format
    #[error("{what} count {count} exceeds 65535")]
    TooMany {
        /// Which count
        what: &'static str,
        /// Offending count
        count: usize,
    },

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for MSBF operations
pub type MsbfResult<T> = Result<T, MsbfError>;
