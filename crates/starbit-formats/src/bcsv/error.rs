//! BCSV error types

use thiserror::Error;

use super::types::FieldType;

/// BCSV-specific error type
#[derive(Debug, Error)]
pub enum BcsvError {
    /// Input ends before a declared structure
    #[error("table truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: u64,
        /// Bytes available
        available: usize,
    },

    /// Field type byte is not a known type
    #[error("unknown field type {0}")]
    UnknownFieldType(u8),

    /// Field does not fit in the record
    #[error("field {hash:08X} at offset {offset} does not fit in {entry_size}-byte records")]
    FieldOutOfRecord {
        /// Field hash
        hash: u32,
        /// Byte offset within the record
        offset: u16,
        /// Record size
        entry_size: u32,
    },

    /// Entries declared with a record size of zero
    #[error("{0} entries declared with zero-sized records")]
    ZeroSizedEntries(u32),

    /// Two fields share the same hash
    #[error("duplicate field {0:08X}")]
    DuplicateField(u32),

    /// String offset points outside the string pool
    #[error("string offset {offset:#x} outside pool of {pool_size} bytes")]
    StringOffsetOutOfPool {
        /// Offending offset
        offset: u32,
        /// Pool size
        pool_size: usize,
    },

    /// String in the pool has no terminator
    #[error("unterminated string at pool offset {0:#x}")]
    UnterminatedString(u32),

    /// Field is not part of the schema
    #[error("unknown field {0:08X}")]
    UnknownField(u32),

    /// Entry index past the end of the table
    #[error("entry {index} out of range ({count} entries)")]
    EntryOutOfRange {
        /// Requested index
        index: usize,
        /// Number of entries
        count: usize,
    },

    /// Value variant does not match the field type
    #[error("field {hash:08X} holds {expected:?} values")]
    TypeMismatch {
        /// Field hash
        hash: u32,
        /// Declared field type
        expected: FieldType,
    },

    /// Value does not fit in the field's mask
    #[error("value {value} does not fit field {hash:08X}")]
    ValueOutOfRange {
        /// Field hash
        hash: u32,
        /// Rejected value
        value: i64,
    },

    /// Inline string longer than 32 bytes
    #[error("string of {len} bytes does not fit inline field {hash:08X}")]
    StringTooLong {
        /// Field hash
        hash: u32,
        /// Encoded length
        len: usize,
    },

    /// String cannot be represented in Shift-JIS
    #[error("string cannot be encoded as Shift-JIS: {0:?}")]
    UnencodableString(String),

    /// Table exceeds 32-bit sizes
    #[error("table of {0} bytes exceeds the 32-bit size range")]
    TableTooLarge(usize),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for BCSV operations
pub type BcsvResult<T> = Result<T, BcsvError>;
