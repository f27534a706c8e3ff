//! LMS container shared by MSBT and MSBF
//!
//! Both message formats wrap their payload in the same sectioned container.
//! The byte order mark in the header decides the byte order of every
//! multi-byte field in the file, sections included.
//!
//! # Layout
//!
//! ```text
//! 0x00  magic[8] | u16 BOM | u16 0 | u8 encoding | u8 version
//!       u16 section count | u16 0 | u32 file size | 10 bytes padding
//! 0x20  sections:
//!       magic[4] | u32 size | 8 bytes padding
//!       data, padded with 0xAB to a multiple of 16 bytes
//! ```
//!
//! Label sections (`LBL1`, `FEN1`) map names to indices through a small
//! hash table; see [`LabelTable`] and [`label_hash`].
//!
//! # Example
//!
//! ```
//! use starbit_formats::lms::{LmsFile, LmsSection};
//!
//! let mut file = LmsFile::new(*b"MsgStdBn");
//! file.sections.push(LmsSection { magic: *b"TXT2", data: vec![0; 4] });
//!
//! let data = file.build().unwrap();
//! assert_eq!(data.len(), 0x40);
//! assert_eq!(LmsFile::parse(&data, b"MsgStdBn").unwrap(), file);
//! ```

mod container;
mod error;
mod labels;

pub(crate) use container::{put_u16, put_u32, read_u16, read_u32};
pub use container::{
    DEFAULT_VERSION, ENCODING_UTF16, LmsFile, LmsHeader, LmsSection, SectionHeader,
};
pub use error::{LmsError, LmsResult};
pub use labels::{LabelEntry, LabelTable, MSBF_BUCKETS, MSBT_BUCKETS, label_hash};
