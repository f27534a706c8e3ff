//! RARC decoding
//!
//! The whole tree is decoded eagerly so that every structural problem is
//! reported by [`decode`] rather than during later traversal.

use std::io::Cursor;

use binrw::BinRead;
use tracing::debug;

use super::error::{RarcError, RarcResult};
use super::header::{
    ENTRY_SIZE, EntryRecord, HEADER_SIZE, INFO_SIZE, InfoBlock, NODE_SIZE, NodeRecord, RARC_MAGIC,
    RarcHeader,
};
use super::tree::{RarcDirectory, RarcFile, RarcNode};
use crate::sjis;

/// Result of decoding an archive buffer
#[derive(Debug)]
pub(crate) struct Decoded {
    pub root: RarcDirectory,
    pub sync_file_ids: bool,
}

/// Child of a node before its subdirectories have been assembled
enum Pending {
    File(RarcFile),
    Directory(String, u32),
}

/// Decode an uncompressed RARC buffer
pub(crate) fn decode(data: &[u8]) -> RarcResult<Decoded> {
    if let Some(magic) = data.get(..4)
        && magic != RARC_MAGIC
    {
        let mut found = [0u8; 4];
        found.copy_from_slice(magic);
        return Err(RarcError::InvalidMagic(found));
    }
    if data.len() < HEADER_SIZE + INFO_SIZE {
        return Err(RarcError::Truncated {
            needed: (HEADER_SIZE + INFO_SIZE) as u64,
            available: data.len(),
        });
    }

    let mut cursor = Cursor::new(data);
    let header = RarcHeader::read(&mut cursor)?;
    if header.header_size as usize != HEADER_SIZE {
        return Err(RarcError::InvalidHeaderSize(header.header_size));
    }

    let info = InfoBlock::read(&mut cursor)?;
    let base = HEADER_SIZE as u64;

    let nodes_at = table_range(
        data,
        "node",
        base + u64::from(info.node_offset),
        info.node_count,
        NODE_SIZE,
    )?;
    let entries_at = table_range(
        data,
        "entry",
        base + u64::from(info.entry_offset),
        info.entry_count,
        ENTRY_SIZE,
    )?;
    let strings = section(
        data,
        "string table",
        base + u64::from(info.string_table_offset),
        u64::from(info.string_table_size),
    )?;
    let data_start = base + u64::from(header.data_offset);
    let file_data = section(data, "data", data_start, u64::from(header.data_length))?;

    if info.node_count == 0 {
        return Err(RarcError::MissingRootNode);
    }

    let read_node = |index: u32| -> RarcResult<NodeRecord> {
        let offset = nodes_at + u64::from(index) * NODE_SIZE as u64;
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset);
        Ok(NodeRecord::read(&mut cursor)?)
    };
    let read_entry = |index: u64| -> RarcResult<EntryRecord> {
        let offset = entries_at + index * ENTRY_SIZE as u64;
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset);
        Ok(EntryRecord::read(&mut cursor)?)
    };

    // Breadth-first discovery; each node is visited at most once
    let node_count = info.node_count as usize;
    let mut visited = vec![false; node_count];
    let mut pending: Vec<Vec<Pending>> = (0..node_count).map(|_| Vec::new()).collect();
    let mut order = vec![0u32];
    visited[0] = true;

    let mut cursor_index = 0;
    while let Some(&node_index) = order.get(cursor_index) {
        cursor_index += 1;
        let node = read_node(node_index)?;

        let first = u64::from(node.first_entry);
        if first + u64::from(node.entry_count) > u64::from(info.entry_count) {
            return Err(RarcError::InvalidEntryRange {
                node: node_index,
                first: node.first_entry,
                count: node.entry_count,
            });
        }

        for entry_index in first..first + u64::from(node.entry_count) {
            let entry = read_entry(entry_index)?;
            let name_bytes = read_name(strings, u32::from(entry.name_offset))?;

            if entry.is_directory() {
                if name_bytes == b"." || name_bytes == b".." {
                    continue;
                }

                let child = entry.data_offset;
                if child as usize >= node_count {
                    return Err(RarcError::InvalidNodeIndex(child));
                }
                if visited[child as usize] {
                    return Err(RarcError::DirectoryCycle(child));
                }
                visited[child as usize] = true;
                order.push(child);
                pending[node_index as usize]
                    .push(Pending::Directory(sjis::decode(name_bytes), child));
            } else {
                let start = u64::from(entry.data_offset);
                let end = start + u64::from(entry.data_size);
                if end > file_data.len() as u64 {
                    return Err(RarcError::OffsetOutOfBounds {
                        what: "file data",
                        offset: data_start + start,
                    });
                }

                pending[node_index as usize].push(Pending::File(RarcFile {
                    name: sjis::decode(name_bytes),
                    data: file_data[start as usize..end as usize].to_vec(),
                    attributes: entry.attributes,
                }));
            }
        }
    }

    // Children are always discovered after their parent, so assembling in
    // reverse discovery order finishes every subdirectory first
    let mut built: Vec<Option<RarcDirectory>> = (0..node_count).map(|_| None).collect();
    for &node_index in order.iter().rev() {
        let mut directory = RarcDirectory::default();
        for child in std::mem::take(&mut pending[node_index as usize]) {
            let node = match child {
                Pending::File(file) => RarcNode::File(file),
                Pending::Directory(name, index) => {
                    let mut dir = built[index as usize]
                        .take()
                        .ok_or(RarcError::InvalidNodeIndex(index))?;
                    dir.name = name;
                    RarcNode::Directory(dir)
                }
            };
            if directory.position(node.name()).is_some() {
                return Err(RarcError::DuplicateEntry {
                    node: node_index,
                    name: node.name().to_string(),
                });
            }
            directory.children.push(node);
        }
        built[node_index as usize] = Some(directory);
    }

    let mut root = built[0].take().ok_or(RarcError::MissingRootNode)?;
    let root_record = read_node(0)?;
    root.name = sjis::decode(read_name(strings, root_record.name_offset)?);

    if order.len() < node_count {
        debug!(
            "RARC has {} unreachable directory nodes",
            node_count - order.len()
        );
    }
    debug!(
        "Decoded RARC '{}': {} nodes, {} entries, {} files",
        root.name,
        info.node_count,
        info.entry_count,
        root.file_count()
    );

    Ok(Decoded {
        root,
        sync_file_ids: info.sync_file_ids != 0,
    })
}

/// Validate a table of `count` fixed-size records and return its offset
fn table_range(
    data: &[u8],
    what: &'static str,
    offset: u64,
    count: u32,
    record_size: usize,
) -> RarcResult<u64> {
    if offset > data.len() as u64 {
        return Err(RarcError::OffsetOutOfBounds { what, offset });
    }
    let size = u64::from(count) * record_size as u64;
    if offset + size > data.len() as u64 {
        return Err(RarcError::CountExceedsBuffer { what, count });
    }
    Ok(offset)
}

/// Borrow `size` bytes at `offset`, failing if they leave the buffer
fn section<'a>(data: &'a [u8], what: &'static str, offset: u64, size: u64) -> RarcResult<&'a [u8]> {
    let end = offset + size;
    if end > data.len() as u64 {
        return Err(RarcError::OffsetOutOfBounds { what, offset });
    }
    Ok(&data[offset as usize..end as usize])
}

/// Null-terminated name at `offset` in the string table
fn read_name(strings: &[u8], offset: u32) -> RarcResult<&[u8]> {
    let tail = strings
        .get(offset as usize..)
        .ok_or(RarcError::OffsetOutOfBounds {
            what: "name",
            offset: u64::from(offset),
        })?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(RarcError::UnterminatedName(offset))?;
    Ok(&tail[..len])
}
