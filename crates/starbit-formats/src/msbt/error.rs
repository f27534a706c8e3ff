//! MSBT error types

use thiserror::Error;

use crate::lms::LmsError;

/// Why a single message could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedMessage {
    /// Text offset points outside the TXT2 section
    #[error("text offset {0:#x} is outside the section")]
    OffsetOutOfBounds(u32),

    /// No terminating null before the end of the message
    #[error("missing null terminator")]
    Unterminated,

    /// Control sequence runs past the end of the message
    #[error("control sequence at unit {0} is truncated")]
    TruncatedControl(usize),

    /// Control sequence declares an odd parameter size
    #[error("control sequence at unit {position} has odd parameter size {size}")]
    OddControlSize {
        /// Unit index of the escape
        position: usize,
        /// Declared parameter size in bytes
        size: u16,
    },
}

/// MSBT-specific error type
#[derive(Debug, Error)]
pub enum MsbtError {
    /// Container-level error
    #[error(transparent)]
    Lms(#[from] LmsError),

    /// Text encoding other than UTF-16
    #[error("unsupported text encoding {0}")]
    UnsupportedEncoding(u8),

    /// Attribute records of a size this crate does not decode
    #[error("unsupported attribute record size {0}")]
    UnsupportedAttributeSize(u32),

    /// Attribute and text sections disagree on the message count
    #[error("{attributes} attribute records for {messages} messages")]
    AttributeCountMismatch {
        /// Records in ATR1
        attributes: u32,
        /// Messages in TXT2
        messages: u32,
    },

    /// Declared count does not fit in its section
    #[error("{what} count {count} exceeds its section")]
    CountExceedsSection {
        /// Which count
        what: &'static str,
        /// Declared count
        count: u32,
    },

    /// Label names a message that does not exist
    #[error("label {label:?} names message {index}, which does not exist")]
    LabelIndexOutOfRange {
        /// Label text
        label: String,
        /// Referenced index
        index: u32,
    },

    /// Message text could not be decoded
    #[error("message {index} is malformed: {reason}")]
    MalformedMessage {
        /// Message index
        index: usize,
        /// What was wrong
        reason: MalformedMessage,
    },

    /// Message index past the end of the table
    #[error("message {index} out of range ({count} messages)")]
    MessageOutOfRange {
        /// Requested index
        index: usize,
        /// Number of messages
        count: usize,
    },

    /// Section exceeds 32-bit sizes
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

/// Result type for MSBT operations
pub type MsbtResult<T> = Result<T, MsbtError>;
