//! BCSV (JMap) table format
//!
//! BCSV files hold fixed-schema tables: object placements, scenario lists,
//! camera parameters, and most other tabular stage data. Column names are
//! not stored, only their JMap hash; see [`starbit_hash::FieldNameTable`]
//! for recovering them.
//!
//! # Layout
//!
//! ```text
//! 0x00  u32 entry count | u32 field count | u32 data offset | u32 entry size
//! 0x10  field descriptors, 12 bytes each:
//!       u32 hash | u32 mask | u16 offset | u8 shift | u8 type
//!       records, entry size bytes each
//!       string pool, null-terminated Shift-JIS
//!       '@' padding to a multiple of 32 bytes
//! ```
//!
//! Integer fields are read as `(raw & mask) >> shift`, so several small
//! fields can share one word.
//!
//! # Example
//!
//! ```
//! use starbit_formats::bcsv::{BcsvTable, FieldType, FieldValue};
//!
//! let mut table = BcsvTable::new();
//! table.add_field("HitPointNum", FieldType::Int).unwrap();
//! let row = table.add_entry();
//! table.set_value(row, "HitPointNum", FieldValue::Int(5)).unwrap();
//!
//! let parsed = BcsvTable::parse(&table.build().unwrap()).unwrap();
//! assert_eq!(parsed.value(0, "HitPointNum").unwrap(), &FieldValue::Int(5));
//! ```

mod error;
mod header;
mod pool;
mod table;
mod types;

pub use error::{BcsvError, BcsvResult};
pub use header::{BcsvHeader, FieldDescriptor};
pub use table::{BcsvEntry, BcsvTable};
pub use types::{BcsvField, FieldKey, FieldType, FieldValue};
