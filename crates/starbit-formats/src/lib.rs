//! File format parsers and builders for Galaxy level data
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for bit-packed fields
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)] // Format magics don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::float_cmp)] // Binary format requirements
#![allow(clippy::use_self)] // Type clarity
//! This crate provides symmetric (parser and builder) implementations for
//! the container and resource formats a Galaxy level editor works with.
//!
//! # Supported Formats
//!
//! - **RARC**: Hierarchical archive bundling the files of a stage or object
//! - **Yaz0**: LZ-style compression wrapped around most RARC archives
//! - **BCSV**: Fixed-schema binary tables (placement, scenario, and object data)
//! - **MSBT**: Label-indexed message tables with per-message attributes
//! - **MSBF**: Message flow graphs with entry labels and a char code table
//!
//! # Editing
//!
//! Decoded resources are bound to an archive file through an
//! [`session::EditSession`], which tracks whether the resource has unsaved
//! changes and writes it back into the archive buffer on save.
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: Both parsing and building supported
//! - **Eager Validation**: Structural corruption is reported at parse time
//! - **Type Safety**: Closed enums for node and entry kinds
//! - **Round-Trip Guarantee**: parse(build(data)) == data

#![warn(missing_docs)]

pub mod bcsv;
pub mod lms;
pub mod msbf;
pub mod msbt;
pub mod rarc;
pub mod session;
mod sjis;
pub mod yaz0;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

/// Boxed error returned through [`GalaxyFormat`]
pub type FormatError = Box<dyn std::error::Error + Send + Sync>;

/// Common format trait implemented by every decodable resource
pub trait GalaxyFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, FormatError>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, FormatError>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), FormatError> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}

/// Round `value` up to the next multiple of `align`
pub(crate) const fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Pad `buffer` with `fill` until its length is a multiple of `align`
pub(crate) fn pad_to(buffer: &mut Vec<u8>, align: usize, fill: u8) {
    let target = align_up(buffer.len(), align);
    buffer.resize(target, fill);
}
