//! BCSV header and field descriptor records

use binrw::{BinRead, BinWrite};

/// Size of the table header
pub const HEADER_SIZE: usize = 0x10;

/// Size of one field descriptor
pub const FIELD_SIZE: usize = 0x0C;

/// Files are padded to this alignment
pub const FILE_ALIGNMENT: usize = 0x20;

/// Padding byte (`@`) used after the string pool
pub const PADDING_BYTE: u8 = 0x40;

/// BCSV table header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct BcsvHeader {
    /// Number of records
    pub entry_count: u32,
    /// Number of field descriptors
    pub field_count: u32,
    /// Offset of the first record
    pub data_offset: u32,
    /// Size of one record
    pub entry_size: u32,
}

/// Field descriptor
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct FieldDescriptor {
    /// JMap hash of the field name
    pub hash: u32,
    /// Bit mask applied to the raw value
    pub mask: u32,
    /// Byte offset within the record
    pub offset: u16,
    /// Right shift applied after masking
    pub shift: u8,
    /// Field type
    pub field_type: u8,
}
