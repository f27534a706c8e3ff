//! RARC error types

use thiserror::Error;

/// RARC-specific error type
#[derive(Debug, Error)]
pub enum RarcError {
    /// Invalid RARC magic bytes
    #[error("invalid RARC magic: expected 'RARC', got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Unexpected header size
    #[error("invalid header size: expected 0x20, got {0:#x}")]
    InvalidHeaderSize(u32),

    /// Buffer is shorter than the structures it must contain
    #[error("archive truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: u64,
        /// Bytes available
        available: usize,
    },

    /// A declared table does not fit in the buffer
    #[error("{what} count {count} exceeds the archive buffer")]
    CountExceedsBuffer {
        /// Table being read
        what: &'static str,
        /// Declared number of records
        count: u32,
    },

    /// An offset points outside the buffer or its section
    #[error("{what} offset {offset:#x} is out of bounds")]
    OffsetOutOfBounds {
        /// Structure being located
        what: &'static str,
        /// Offending offset
        offset: u64,
    },

    /// Archive has no root node
    #[error("archive has no root node")]
    MissingRootNode,

    /// Directory entry references a missing node
    #[error("invalid node index: {0}")]
    InvalidNodeIndex(u32),

    /// Node entry range is outside the entry table
    #[error("node {node} entries {first}..{first}+{count} exceed the entry table")]
    InvalidEntryRange {
        /// Node index
        node: u32,
        /// First entry index
        first: u32,
        /// Number of entries
        count: u16,
    },

    /// A directory is reachable twice
    #[error("directory node {0} is referenced more than once")]
    DirectoryCycle(u32),

    /// Two entries of one directory share a name, ignoring ASCII case
    #[error("directory node {node} holds {name:?} more than once")]
    DuplicateEntry {
        /// Directory node index
        node: u32,
        /// Repeated name
        name: String,
    },

    /// Name in the string table has no terminator
    #[error("unterminated name at string table offset {0:#x}")]
    UnterminatedName(u32),

    /// Path does not exist
    #[error("path not found: {0}")]
    NotFound(String),

    /// Path names a directory where a file is required
    #[error("not a file: {0}")]
    NotAFile(String),

    /// Path names a file where a directory is required
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A sibling with the same name already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Entry name is empty or contains reserved characters
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),

    /// Name cannot be represented in Shift-JIS
    #[error("name cannot be encoded as Shift-JIS: {0:?}")]
    UnencodableName(String),

    /// Path is bound to an edit session
    #[error("path is bound to an open resource: {0}")]
    Bound(String),

    /// Path is already bound to another edit session
    #[error("path is already bound to an open resource: {0}")]
    AlreadyBound(String),

    /// String table grew beyond the 16-bit entry name offsets
    #[error("string table of {0} bytes exceeds the 16-bit name offset range")]
    NameTableOverflow(usize),

    /// Too many entries for 16-bit file ids
    #[error("{0} entries exceed the 16-bit file id range")]
    TooManyEntries(usize),

    /// Serialized archive exceeds 32-bit offsets
    #[error("archive of {0} bytes exceeds the 32-bit size range")]
    ArchiveTooLarge(usize),

    /// Yaz0 layer error
    #[error("Yaz0 error: {0}")]
    Yaz0(#[from] crate::yaz0::Yaz0Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for RARC operations
pub type RarcResult<T> = Result<T, RarcError>;
