//! Yaz0 error types

use thiserror::Error;

/// Yaz0-specific error type
#[derive(Debug, Error)]
pub enum Yaz0Error {
    /// Input does not start with the Yaz0 magic
    #[error("invalid Yaz0 magic: expected 'Yaz0', got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Input ended before the declared output size was produced
    #[error("compressed stream truncated at offset {offset} ({produced} of {expected} bytes produced)")]
    Truncated {
        /// Input offset where data ran out
        offset: usize,
        /// Bytes decompressed so far
        produced: usize,
        /// Declared decompressed size
        expected: usize,
    },

    /// Back reference points before the start of the output
    #[error("back reference distance {distance} exceeds {produced} bytes of output")]
    InvalidBackReference {
        /// Reference distance
        distance: usize,
        /// Bytes decompressed so far
        produced: usize,
    },

    /// Declared size is above the decompression limit
    #[error("declared size {0} exceeds the decompression limit")]
    SizeLimitExceeded(u32),

    /// Data is too large to be described by the 32-bit size field
    #[error("input of {0} bytes is too large to compress")]
    InputTooLarge(usize),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for Yaz0 operations
pub type Yaz0Result<T> = Result<T, Yaz0Error>;
