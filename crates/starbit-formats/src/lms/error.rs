//! LMS container error types

use thiserror::Error;

/// Errors shared by the MSBT and MSBF containers
#[derive(Debug, Error)]
pub enum LmsError {
    /// Wrong file magic
    #[error("invalid magic: expected {expected:?}, got {found:02X?}")]
    InvalidMagic {
        /// Expected magic as text
        expected: String,
        /// Bytes found
        found: [u8; 8],
    },

    /// Byte order mark is neither FE FF nor FF FE
    #[error("invalid byte order mark {0:#06x}")]
    InvalidByteOrderMark(u16),

    /// Input ends before a declared structure
    #[error("container truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: u64,
        /// Bytes available
        available: usize,
    },

    /// Section data extends past the end of the file
    #[error("section {} of {size} bytes exceeds the file", String::from_utf8_lossy(.magic))]
    SectionOutOfBounds {
        /// Section magic
        magic: [u8; 4],
        /// Declared size
        size: u32,
    },

    /// Required section is absent
    #[error("missing {} section", String::from_utf8_lossy(.0))]
    MissingSection([u8; 4]),

    /// Label table with labels but no buckets
    #[error("label table has {0} labels but no hash buckets")]
    NoBuckets(usize),

    /// Label bucket or entry points outside the section
    #[error("label table entry at {0:#x} is out of bounds")]
    LabelOutOfBounds(u64),

    /// Label bytes are not valid text
    #[error("label at {0:#x} is not valid UTF-8")]
    InvalidLabel(u64),

    /// Label longer than its 8-bit length prefix allows
    #[error("label {0:?} exceeds 255 bytes")]
    LabelTooLong(String),

    /// Value exceeds the width of its on-disk field
    #[error("{what} of {value} exceeds the format limit")]
    TooLarge {
        /// Quantity being written
        what: &'static str,
        /// Offending value
        value: usize,
    },

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for LMS container operations
pub type LmsResult<T> = Result<T, LmsError>;
