//! Field name hashing for Galaxy BCSV/JMap tables
//!
//! BCSV files never store column names, only a 32-bit hash of each name.
//! This crate provides the hash function and a lookup table used to recover
//! readable names for hashes that have been seen before.
//!
//! # Components
//!
//! - **Hashing**: [`jmap::hash`], the JMap field name hash
//! - **Name recovery**: [`FieldNameTable`], an append-only hash to name map
//!   backed by a plain text lookup file
//!
//! # Examples
//!
//! ## Hashing a field name
//!
//! ```
//! use starbit_hash::field_name_to_hash;
//!
//! assert_eq!(field_name_to_hash("name"), 0x0033_7A8B);
//! ```
//!
//! ## Recovering names
//!
//! ```
//! use starbit_hash::FieldNameTable;
//!
//! let mut names = FieldNameTable::empty();
//! let hash = names.add("ScenarioNo");
//! assert_eq!(names.name_of(hash), Some("ScenarioNo"));
//! assert_eq!(names.display_name(0x1234_5678), "[12345678]");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod jmap;
pub mod names;

pub use error::{HashError, HashResult};
pub use jmap::{field_name_to_hash, hash as jmap_hash};
pub use names::FieldNameTable;
