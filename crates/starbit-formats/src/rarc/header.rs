//! RARC header, info block, and table records

use binrw::{BinRead, BinWrite};

/// RARC magic signature
pub const RARC_MAGIC: [u8; 4] = *b"RARC";

/// Size of the file header
pub const HEADER_SIZE: usize = 0x20;

/// Size of the info block following the header
pub const INFO_SIZE: usize = 0x20;

/// Size of one node record
pub const NODE_SIZE: usize = 0x10;

/// Size of one entry record
pub const ENTRY_SIZE: usize = 0x14;

/// Alignment of every section and of each file's data
pub const ALIGNMENT: usize = 0x20;

/// File id stored in directory entries
pub const NO_FILE_ID: u16 = 0xFFFF;

/// Node index stored in the root's `..` entry
pub const NO_NODE: u32 = 0xFFFF_FFFF;

/// Entry is a file
pub const ATTR_FILE: u8 = 0x01;
/// Entry is a directory
pub const ATTR_DIRECTORY: u8 = 0x02;
/// File data is compressed
pub const ATTR_COMPRESSED: u8 = 0x04;
/// File is preloaded into main RAM
pub const ATTR_PRELOAD_MRAM: u8 = 0x10;
/// File is preloaded into auxiliary RAM
pub const ATTR_PRELOAD_ARAM: u8 = 0x20;
/// File is loaded from disc on demand
pub const ATTR_LOAD_DVD: u8 = 0x40;
/// Compressed data uses Yaz0 rather than Yay0
pub const ATTR_YAZ0: u8 = 0x80;

/// Attributes given to newly created files
pub const DEFAULT_FILE_ATTRIBUTES: u8 = ATTR_FILE | ATTR_PRELOAD_MRAM;

/// RARC file header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct RarcHeader {
    /// Magic signature, always "RARC"
    pub magic: [u8; 4],
    /// Total archive size
    pub file_size: u32,
    /// Header size, always 0x20
    pub header_size: u32,
    /// Data section offset, relative to the info block
    pub data_offset: u32,
    /// Data section length
    pub data_length: u32,
    /// Bytes of data preloaded into main RAM
    pub mram_size: u32,
    /// Bytes of data preloaded into auxiliary RAM
    pub aram_size: u32,
    /// Bytes of data loaded on demand
    pub dvd_size: u32,
}

/// Info block describing the node, entry, and string tables
///
/// All offsets are relative to the start of this block (0x20).
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct InfoBlock {
    /// Number of directory nodes
    pub node_count: u32,
    /// Offset of the node table
    pub node_offset: u32,
    /// Number of entries across all directories
    pub entry_count: u32,
    /// Offset of the entry table
    pub entry_offset: u32,
    /// String table size
    pub string_table_size: u32,
    /// String table offset
    pub string_table_offset: u32,
    /// Next free file id
    pub next_file_id: u16,
    /// Non-zero when file ids equal entry indices
    pub sync_file_ids: u8,
    /// Padding
    pub padding: [u8; 5],
}

/// Directory node record
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct NodeRecord {
    /// Four character identifier, "ROOT" for the root node
    pub ident: [u8; 4],
    /// Name offset in the string table
    pub name_offset: u32,
    /// Name hash
    pub name_hash: u16,
    /// Number of entries including `.` and `..`
    pub entry_count: u16,
    /// Index of the first entry
    pub first_entry: u32,
}

/// File or directory entry record
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct EntryRecord {
    /// File id, [`NO_FILE_ID`] for directories
    pub file_id: u16,
    /// Name hash
    pub name_hash: u16,
    /// Attribute flags
    pub attributes: u8,
    /// Padding
    pub padding: u8,
    /// Name offset in the string table
    pub name_offset: u16,
    /// File data offset or node index for directories
    pub data_offset: u32,
    /// File size, or 0x10 for directories
    pub data_size: u32,
    /// Runtime pointer, zero on disc
    pub reserved: u32,
}

impl EntryRecord {
    /// Check if the entry describes a directory
    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }
}

/// RARC name hash used by nodes and entries
///
/// # Examples
///
/// ```
/// use starbit_formats::rarc::name_hash;
///
/// assert_eq!(name_hash(b"."), 0x2E);
/// assert_eq!(name_hash(b".."), 0xB8);
/// ```
pub fn name_hash(name: &[u8]) -> u16 {
    name.iter()
        .fold(0u16, |hash, &b| hash.wrapping_mul(3).wrapping_add(u16::from(b)))
}

/// Four character node identifier derived from a directory name
pub fn node_ident(name: &[u8], is_root: bool) -> [u8; 4] {
    if is_root {
        return *b"ROOT";
    }

    let mut ident = [b' '; 4];
    for (slot, &b) in ident.iter_mut().zip(name) {
        *slot = b.to_ascii_uppercase();
    }
    ident
}
