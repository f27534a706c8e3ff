//! RARC archive container
//!
//! RARC archives bundle every file of a stage, object, or message package
//! into a single directory tree. Most archives on disc are additionally
//! Yaz0 compressed; [`RarcArchive::load`] detects and removes that layer.
//!
//! # Layout
//!
//! All values are big-endian. Offsets in the info block are relative to
//! its start at 0x20.
//!
//! ```text
//! 0x00  header       "RARC", sizes of the archive and its data section
//! 0x20  info block   node/entry/string table locations, file id settings
//! 0x40  node table   one 0x10 byte record per directory, root first
//!       entry table  0x14 byte records; each directory's run ends in "." and ".."
//!       strings      null-terminated Shift-JIS names, starting ".\0..\0"
//!       data         file contents aligned to 0x20, main RAM files first
//! ```
//!
//! # Example
//!
//! ```
//! use starbit_formats::rarc::RarcArchive;
//!
//! let mut archive = RarcArchive::new("stage");
//! let handle = archive.create_file("", "test.bin").unwrap();
//! archive.set_contents(&handle, vec![1, 2, 3, 4]).unwrap();
//!
//! let bytes = archive.save().unwrap();
//! let reopened = RarcArchive::open(&bytes).unwrap();
//! assert_eq!(reopened.read_file("test.bin").unwrap(), &[1, 2, 3, 4]);
//! ```

mod archive;
mod error;
mod header;
mod reader;
mod tree;
mod writer;

pub use archive::{Binding, FileHandle, RarcArchive, Walk};
pub use error::{RarcError, RarcResult};
pub use header::{
    ATTR_COMPRESSED, ATTR_DIRECTORY, ATTR_FILE, ATTR_LOAD_DVD, ATTR_PRELOAD_ARAM,
    ATTR_PRELOAD_MRAM, ATTR_YAZ0, DEFAULT_FILE_ATTRIBUTES, EntryRecord, InfoBlock, NodeRecord,
    RARC_MAGIC, RarcHeader, name_hash,
};
pub use tree::{RarcDirectory, RarcFile, RarcNode};
pub use writer::RarcWriteOptions;
