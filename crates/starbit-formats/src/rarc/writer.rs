//! RARC encoding
//!
//! Nodes are numbered breadth-first from the root. Every directory's
//! entries list its children in order followed by `.` and `..`. File data
//! is grouped by load destination (main RAM, auxiliary RAM, disc) with each
//! file aligned to 0x20.

use std::collections::HashMap;
use std::io::Cursor;

use binrw::BinWrite;
use tracing::debug;

use super::error::{RarcError, RarcResult};
use super::header::{
    ALIGNMENT, ATTR_DIRECTORY, ATTR_LOAD_DVD, ATTR_PRELOAD_ARAM, ENTRY_SIZE, EntryRecord,
    HEADER_SIZE, INFO_SIZE, InfoBlock, NO_FILE_ID, NO_NODE, NODE_SIZE, NodeRecord, RARC_MAGIC,
    RarcHeader, name_hash, node_ident,
};
use super::tree::{RarcDirectory, RarcNode};
use crate::{align_up, pad_to, sjis};

/// Options controlling how an archive is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RarcWriteOptions {
    /// Use entry indices as file ids
    pub sync_file_ids: bool,
}

impl Default for RarcWriteOptions {
    fn default() -> Self {
        Self {
            sync_file_ids: true,
        }
    }
}

impl RarcWriteOptions {
    /// Set whether file ids follow entry indices
    #[must_use]
    pub const fn with_sync_file_ids(mut self, sync: bool) -> Self {
        self.sync_file_ids = sync;
        self
    }
}

/// Load destination group, in data section order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadGroup {
    Mram,
    Aram,
    Dvd,
}

impl LoadGroup {
    const ALL: [Self; 3] = [Self::Mram, Self::Aram, Self::Dvd];

    const fn of(attributes: u8) -> Self {
        if attributes & ATTR_PRELOAD_ARAM != 0 {
            Self::Aram
        } else if attributes & ATTR_LOAD_DVD != 0 {
            Self::Dvd
        } else {
            Self::Mram
        }
    }
}

/// Deduplicating string table builder
struct StringTable {
    bytes: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl StringTable {
    fn new() -> Self {
        let mut table = Self {
            bytes: Vec::new(),
            offsets: HashMap::new(),
        };
        table.insert(b".");
        table.insert(b"..");
        table
    }

    fn insert(&mut self, name: &[u8]) -> u32 {
        if let Some(&offset) = self.offsets.get(name) {
            return offset;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(name);
        self.bytes.push(0);
        self.offsets.insert(name.to_vec(), offset);
        offset
    }

    fn insert_str(&mut self, name: &str) -> RarcResult<(u32, u16)> {
        let encoded =
            sjis::encode(name).ok_or_else(|| RarcError::UnencodableName(name.to_string()))?;
        Ok((self.insert(&encoded), name_hash(&encoded)))
    }
}

/// Encode a directory tree as an uncompressed RARC buffer
pub(crate) fn encode(root: &RarcDirectory, options: RarcWriteOptions) -> RarcResult<Vec<u8>> {
    // Breadth-first node numbering
    let mut dirs: Vec<&RarcDirectory> = vec![root];
    let mut parents: Vec<u32> = vec![NO_NODE];
    let mut index = 0;
    while let Some(&dir) = dirs.get(index) {
        for child in &dir.children {
            if let RarcNode::Directory(sub) = child {
                dirs.push(sub);
                parents.push(index as u32);
            }
        }
        index += 1;
    }

    let mut strings = StringTable::new();
    let mut nodes = Vec::with_capacity(dirs.len());
    let mut entries: Vec<EntryRecord> = Vec::new();
    // (entry index, file data, load group)
    let mut files: Vec<(usize, &[u8], LoadGroup)> = Vec::new();
    let mut next_child_node = 1u32;
    let mut next_file_id = 0u16;

    for (node_index, dir) in dirs.iter().enumerate() {
        let is_root = node_index == 0;
        let encoded =
            sjis::encode(&dir.name).ok_or_else(|| RarcError::UnencodableName(dir.name.clone()))?;
        let (name_offset, hash) = (strings.insert(&encoded), name_hash(&encoded));

        let entry_count = dir.children.len() + 2;
        nodes.push(NodeRecord {
            ident: node_ident(&encoded, is_root),
            name_offset,
            name_hash: hash,
            entry_count: u16::try_from(entry_count)
                .map_err(|_| RarcError::TooManyEntries(entry_count))?,
            first_entry: entries.len() as u32,
        });

        for child in &dir.children {
            let (name_offset, hash) = strings.insert_str(child.name())?;
            let name_offset = u16::try_from(name_offset)
                .map_err(|_| RarcError::NameTableOverflow(strings.bytes.len()))?;

            match child {
                RarcNode::Directory(_) => {
                    entries.push(directory_entry(hash, name_offset, next_child_node));
                    next_child_node += 1;
                }
                RarcNode::File(file) => {
                    let file_id = if options.sync_file_ids {
                        file_id_for(entries.len())?
                    } else {
                        next_file_id
                    };
                    next_file_id = next_file_id
                        .checked_add(1)
                        .ok_or(RarcError::TooManyEntries(entries.len()))?;

                    files.push((
                        entries.len(),
                        file.data.as_slice(),
                        LoadGroup::of(file.attributes),
                    ));
                    entries.push(EntryRecord {
                        file_id,
                        name_hash: hash,
                        attributes: file.attributes & !ATTR_DIRECTORY,
                        padding: 0,
                        name_offset,
                        data_offset: 0,
                        data_size: u32::try_from(file.data.len())
                            .map_err(|_| RarcError::ArchiveTooLarge(file.data.len()))?,
                        reserved: 0,
                    });
                }
            }
        }

        entries.push(directory_entry(name_hash(b"."), 0, node_index as u32));
        entries.push(directory_entry(name_hash(b".."), 2, parents[node_index]));
    }

    if options.sync_file_ids {
        next_file_id = file_id_for(entries.len())?;
    }

    // Lay out file data by load group
    let mut data = Vec::new();
    let mut group_sizes = [0u32; 3];
    for (slot, group) in LoadGroup::ALL.into_iter().enumerate() {
        let start = data.len();
        for &(entry_index, bytes, _) in files.iter().filter(|f| f.2 == group) {
            entries[entry_index].data_offset = to_u32(data.len())?;
            data.extend_from_slice(bytes);
            pad_to(&mut data, ALIGNMENT, 0);
        }
        group_sizes[slot] = to_u32(data.len() - start)?;
    }

    // Offsets are relative to the info block, which the node table follows
    let node_offset = INFO_SIZE;
    let entry_offset = align_up(node_offset + nodes.len() * NODE_SIZE, ALIGNMENT);
    let string_table_offset = align_up(entry_offset + entries.len() * ENTRY_SIZE, ALIGNMENT);
    let string_table_size = align_up(strings.bytes.len(), ALIGNMENT);
    let data_offset = string_table_offset + string_table_size;
    let file_size = HEADER_SIZE + data_offset + data.len();

    let header = RarcHeader {
        magic: RARC_MAGIC,
        file_size: u32::try_from(file_size).map_err(|_| RarcError::ArchiveTooLarge(file_size))?,
        header_size: HEADER_SIZE as u32,
        data_offset: to_u32(data_offset)?,
        data_length: to_u32(data.len())?,
        mram_size: group_sizes[0],
        aram_size: group_sizes[1],
        dvd_size: group_sizes[2],
    };
    let info = InfoBlock {
        node_count: to_u32(nodes.len())?,
        node_offset: to_u32(node_offset)?,
        entry_count: to_u32(entries.len())?,
        entry_offset: to_u32(entry_offset)?,
        string_table_size: to_u32(string_table_size)?,
        string_table_offset: to_u32(string_table_offset)?,
        next_file_id,
        sync_file_ids: u8::from(options.sync_file_ids),
        padding: [0; 5],
    };

    let mut output = Vec::with_capacity(file_size);
    let mut cursor = Cursor::new(&mut output);
    header.write(&mut cursor)?;
    info.write(&mut cursor)?;
    for node in &nodes {
        node.write(&mut cursor)?;
    }
    pad_to(&mut output, ALIGNMENT, 0);

    let mut cursor = Cursor::new(&mut output);
    cursor.set_position(cursor.get_ref().len() as u64);
    for entry in &entries {
        entry.write(&mut cursor)?;
    }
    pad_to(&mut output, ALIGNMENT, 0);

    output.extend_from_slice(&strings.bytes);
    pad_to(&mut output, ALIGNMENT, 0);
    output.extend_from_slice(&data);

    debug!(
        "Encoded RARC '{}': {} nodes, {} entries, {} bytes",
        root.name,
        nodes.len(),
        entries.len(),
        output.len()
    );

    Ok(output)
}

fn directory_entry(name_hash: u16, name_offset: u16, node: u32) -> EntryRecord {
    EntryRecord {
        file_id: NO_FILE_ID,
        name_hash,
        attributes: ATTR_DIRECTORY,
        padding: 0,
        name_offset,
        data_offset: node,
        data_size: 0x10,
        reserved: 0,
    }
}

fn file_id_for(entry_index: usize) -> RarcResult<u16> {
    u16::try_from(entry_index)
        .ok()
        .filter(|&id| id != NO_FILE_ID)
        .ok_or(RarcError::TooManyEntries(entry_index))
}

fn to_u32(value: usize) -> RarcResult<u32> {
    u32::try_from(value).map_err(|_| RarcError::ArchiveTooLarge(value))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rarc::header::{ATTR_FILE, DEFAULT_FILE_ATTRIBUTES};
    use crate::rarc::reader::decode;
    use crate::rarc::tree::RarcFile;
    use pretty_assertions::assert_eq;

    fn file(name: &str, data: &[u8], attributes: u8) -> RarcNode {
        RarcNode::File(RarcFile {
            name: name.to_string(),
            data: data.to_vec(),
            attributes,
        })
    }

    #[test]
    fn test_empty_archive_layout() {
        let root = RarcDirectory::new("root");
        let data = encode(&root, RarcWriteOptions::default()).unwrap();

        assert_eq!(&data[..4], b"RARC");
        assert_eq!(data.len() % ALIGNMENT, 0);
        assert_eq!(
            u32::from_be_bytes(data[4..8].try_into().unwrap()) as usize,
            data.len()
        );
        // Root node ident
        assert_eq!(&data[0x40..0x44], b"ROOT");
        // String table starts with "." and ".."
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.root, root);
    }

    #[test]
    fn test_groups_ordered_mram_first() {
        let mut root = RarcDirectory::new("root");
        root.children
            .push(file("aram.bin", &[0xAA; 3], ATTR_FILE | ATTR_PRELOAD_ARAM));
        root.children
            .push(file("mram.bin", &[0xBB; 5], DEFAULT_FILE_ATTRIBUTES));

        let data = encode(&root, RarcWriteOptions::default()).unwrap();
        let read_u32 = |at: usize| u32::from_be_bytes(data[at..at + 4].try_into().unwrap());

        assert_eq!(read_u32(0x14), 0x20); // mram size
        assert_eq!(read_u32(0x18), 0x20); // aram size

        let data_start = 0x20 + read_u32(0x0C) as usize;
        assert_eq!(&data[data_start..data_start + 5], &[0xBB; 5]);
        assert_eq!(&data[data_start + 0x20..data_start + 0x23], &[0xAA; 3]);

        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.root, root);
    }

    #[test]
    fn test_nested_round_trip_without_sync() {
        let mut inner = RarcDirectory::new("inner");
        inner.children.push(file("deep.txt", b"deep", DEFAULT_FILE_ATTRIBUTES));
        let mut jmp = RarcDirectory::new("jmp");
        jmp.children.push(RarcNode::Directory(inner));
        jmp.children.push(file("a.bcsv", b"table", DEFAULT_FILE_ATTRIBUTES));
        let mut root = RarcDirectory::new("stage");
        root.children.push(RarcNode::Directory(jmp));
        root.children.push(RarcNode::Directory(RarcDirectory::new("empty")));
        root.children.push(file("z.bin", &[], DEFAULT_FILE_ATTRIBUTES));

        let options = RarcWriteOptions::default().with_sync_file_ids(false);
        let data = encode(&root, options).unwrap();
        let decoded = decode(&data).unwrap();

        assert!(!decoded.sync_file_ids);
        assert_eq!(decoded.root, root);
    }

    #[test]
    fn test_string_table_deduplicates() {
        let mut table = StringTable::new();
        assert_eq!(table.insert(b"."), 0);
        assert_eq!(table.insert(b".."), 2);
        let first = table.insert(b"data");
        assert_eq!(table.insert(b"data"), first);
        assert_eq!(table.bytes, b".\0..\0data\0");
    }

    #[test]
    fn test_unencodable_name() {
        let mut root = RarcDirectory::new("root");
        root.children
            .push(file("\u{1F600}.bin", b"", DEFAULT_FILE_ATTRIBUTES));
        assert!(matches!(
            encode(&root, RarcWriteOptions::default()),
            Err(RarcError::UnencodableName(_))
        ));
    }
}
