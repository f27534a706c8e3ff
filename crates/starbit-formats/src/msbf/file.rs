//! MSBF flow graph

use std::io::Cursor;

use binrw::{BinRead, BinWrite, Endian};
use tracing::{debug, warn};

use super::error::{MsbfError, MsbfResult};
use super::node::{Flow, FlowEntry, FlowNode, FlowWarning, NODE_SIZE, NodeRecord};
use crate::lms::{
    LabelEntry, LabelTable, LmsError, LmsFile, LmsSection, MSBF_BUCKETS, put_u16, put_u32,
    read_u16,
};
use crate::{FormatError, GalaxyFormat};

/// MSBF file magic
pub const MSBF_MAGIC: [u8; 8] = *b"MsgFlwBn";

const FLOWS: [u8; 4] = *b"FLW2";
const ENTRIES: [u8; 4] = *b"FEN1";

/// Size of the FLW2 count header
const FLOW_HEADER_SIZE: usize = 8;

/// Largest value the char table stores
pub const MAX_CHAR_CODE: u8 = u8::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Flows,
    Entries,
    Other(LmsSection),
}

/// Decoded MSBF flow graph
///
/// Nodes refer to each other by index. Removing a node does not rewrite
/// those indices; [`validate`](Self::validate) reports edges left pointing
/// past the end of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsbfFile {
    endian: Endian,
    encoding: u8,
    version: u8,
    bucket_count: u32,
    slots: Vec<Slot>,
    nodes: Vec<FlowNode>,
    chars: Vec<u8>,
}

impl Default for MsbfFile {
    fn default() -> Self {
        Self::new()
    }
}

impl MsbfFile {
    /// Create an empty big-endian flow graph
    pub fn new() -> Self {
        let container = LmsFile::new(MSBF_MAGIC);
        Self {
            endian: container.endian,
            encoding: container.encoding,
            version: container.version,
            bucket_count: MSBF_BUCKETS,
            slots: vec![Slot::Flows, Slot::Entries],
            nodes: Vec::new(),
            chars: Vec::new(),
        }
    }

    /// Parse a flow graph
    pub fn parse(data: &[u8]) -> MsbfResult<Self> {
        let container = LmsFile::parse(data, &MSBF_MAGIC)?;
        let endian = container.endian;

        let mut slots = Vec::with_capacity(container.sections.len());
        let mut flows = None;
        let mut labels = None;
        for section in container.sections {
            match section.magic {
                FLOWS if flows.is_none() => {
                    flows = Some(decode_flows(&section.data, endian)?);
                    slots.push(Slot::Flows);
                }
                ENTRIES if labels.is_none() => {
                    labels = Some(LabelTable::parse(&section.data, endian)?);
                    slots.push(Slot::Entries);
                }
                _ => slots.push(Slot::Other(section)),
            }
        }

        let (mut nodes, chars) = flows.ok_or(LmsError::MissingSection(FLOWS))?;
        let bucket_count = labels.as_ref().map_or(MSBF_BUCKETS, |table| table.bucket_count);

        for LabelEntry { label, index } in labels.map(|table| table.entries).unwrap_or_default() {
            match nodes.get_mut(index as usize) {
                Some(FlowNode::Entry(entry)) if entry.label.is_empty() => entry.label = label,
                Some(FlowNode::Entry(entry)) => {
                    warn!(
                        "Entry node {index} has labels {:?} and {label:?}; keeping the first",
                        entry.label
                    );
                }
                _ => return Err(MsbfError::InvalidLabelTarget { label, index }),
            }
        }

        debug!(
            "Parsed MSBF: {} nodes, {} char codes, {} sections",
            nodes.len(),
            chars.len(),
            slots.len()
        );

        Ok(Self {
            endian,
            encoding: container.encoding,
            version: container.version,
            bucket_count,
            slots,
            nodes,
            chars,
        })
    }

    /// Build the flow graph
    pub fn build(&self) -> MsbfResult<Vec<u8>> {
        let mut container = LmsFile::new(MSBF_MAGIC);
        container.endian = self.endian;
        container.encoding = self.encoding;
        container.version = self.version;

        for slot in &self.slots {
            let section = match slot {
                Slot::Flows => LmsSection {
                    magic: FLOWS,
                    data: self.encode_flows()?,
                },
                Slot::Entries => LmsSection {
                    magic: ENTRIES,
                    data: self.label_table().build(self.endian)?,
                },
                Slot::Other(section) => section.clone(),
            };
            container.sections.push(section);
        }

        Ok(container.build()?)
    }

    /// Nodes in index order
    #[must_use]
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    /// Node at `index`
    pub fn node(&self, index: usize) -> Option<&FlowNode> {
        self.nodes.get(index)
    }

    /// Mutable node at `index`
    pub fn node_mut(&mut self, index: usize) -> Option<&mut FlowNode> {
        self.nodes.get_mut(index)
    }

    /// Index of the entry node labelled `label`
    pub fn find_entry(&self, label: &str) -> Option<usize> {
        self.nodes.iter().position(
            |node| matches!(node, FlowNode::Entry(entry) if !label.is_empty() && entry.label == label),
        )
    }

    /// Append a default node and return its index
    pub fn add_empty_node(&mut self, is_entry: bool) -> usize {
        let node = if is_entry {
            FlowNode::Entry(FlowEntry::default())
        } else {
            FlowNode::Flow(Flow::default())
        };
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Remove the node at `index`
    ///
    /// The remaining nodes keep their order. Edges into or past the removed
    /// node are left as they are.
    pub fn remove_node(&mut self, index: usize) -> MsbfResult<FlowNode> {
        if index >= self.nodes.len() {
            return Err(MsbfError::NodeOutOfRange {
                index,
                count: self.nodes.len(),
            });
        }
        Ok(self.nodes.remove(index))
    }

    /// Report edges that point past the end of the graph
    pub fn validate(&self) -> Vec<FlowWarning> {
        let mut warnings = Vec::new();
        for (node, flow) in self.nodes.iter().enumerate() {
            for target in flow.edges() {
                if usize::from(target) >= self.nodes.len() {
                    let warning = FlowWarning::DanglingEdge { node, target };
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }
        warnings
    }

    /// Char code table
    #[must_use]
    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    /// Insert a char code at `index`, clamping it to 255
    ///
    /// Returns the stored value.
    pub fn insert_char(&mut self, index: usize, code: u32) -> MsbfResult<u8> {
        if index > self.chars.len() {
            return Err(MsbfError::CharOutOfRange {
                index,
                count: self.chars.len(),
            });
        }
        let stored = clamp_char(code);
        self.chars.insert(index, stored);
        Ok(stored)
    }

    /// Append a char code, clamping it to 255
    pub fn push_char(&mut self, code: u32) -> u8 {
        let stored = clamp_char(code);
        self.chars.push(stored);
        stored
    }

    /// Replace the char code at `index`, clamping it to 255
    pub fn set_char(&mut self, index: usize, code: u32) -> MsbfResult<u8> {
        let count = self.chars.len();
        let slot = self
            .chars
            .get_mut(index)
            .ok_or(MsbfError::CharOutOfRange { index, count })?;
        *slot = clamp_char(code);
        Ok(*slot)
    }

    /// Remove the char code at `index`
    pub fn remove_char(&mut self, index: usize) -> MsbfResult<u8> {
        if index >= self.chars.len() {
            return Err(MsbfError::CharOutOfRange {
                index,
                count: self.chars.len(),
            });
        }
        Ok(self.chars.remove(index))
    }

    fn label_table(&self) -> LabelTable {
        LabelTable {
            bucket_count: self.bucket_count,
            entries: self
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(index, node)| match node {
                    FlowNode::Entry(entry) if !entry.label.is_empty() => Some(LabelEntry {
                        label: entry.label.clone(),
                        index: index as u32,
                    }),
                    _ => None,
                })
                .collect(),
        }
    }

    fn encode_flows(&self) -> MsbfResult<Vec<u8>> {
        let node_count = u16::try_from(self.nodes.len()).map_err(|_| MsbfError::TooMany {
            what: "node",
            count: self.nodes.len(),
        })?;
        let char_count = u16::try_from(self.chars.len()).map_err(|_| MsbfError::TooMany {
            what: "char code",
            count: self.chars.len(),
        })?;

        let mut output = Vec::with_capacity(
            FLOW_HEADER_SIZE + self.nodes.len() * NODE_SIZE + self.chars.len() * 2,
        );
        put_u16(&mut output, node_count, self.endian);
        put_u16(&mut output, char_count, self.endian);
        put_u32(&mut output, 0, self.endian);

        let mut cursor = Cursor::new(&mut output);
        cursor.set_position(FLOW_HEADER_SIZE as u64);
        for (index, node) in self.nodes.iter().enumerate() {
            let record = node.to_record();
            if !node.is_entry() && record.kind == super::node::ENTRY_KIND {
                return Err(MsbfError::ReservedFlowKind(index));
            }
            record.write_options(&mut cursor, self.endian, ())?;
        }

        for &code in &self.chars {
            put_u16(&mut output, u16::from(code), self.endian);
        }

        Ok(output)
    }
}

impl GalaxyFormat for MsbfFile {
    fn parse(data: &[u8]) -> Result<Self, FormatError> {
        Ok(Self::parse(data)?)
    }

    fn build(&self) -> Result<Vec<u8>, FormatError> {
        Ok(self.build()?)
    }
}

fn clamp_char(code: u32) -> u8 {
    let stored = code.min(u32::from(MAX_CHAR_CODE)) as u8;
    if code > u32::from(MAX_CHAR_CODE) {
        debug!("Clamped char code {code} to {stored}");
    }
    stored
}

/// Decode an FLW2 section into nodes and char codes
fn decode_flows(data: &[u8], endian: Endian) -> MsbfResult<(Vec<FlowNode>, Vec<u8>)> {
    let counts = read_u16(data, 0, endian).zip(read_u16(data, 2, endian));
    let Some((node_count, char_count)) = counts.filter(|_| data.len() >= FLOW_HEADER_SIZE) else {
        return Err(MsbfError::CountsExceedSection {
            nodes: 0,
            chars: 0,
            size: data.len(),
        });
    };

    let nodes_end = FLOW_HEADER_SIZE + usize::from(node_count) * NODE_SIZE;
    let chars_end = nodes_end + usize::from(char_count) * 2;
    if chars_end > data.len() {
        return Err(MsbfError::CountsExceedSection {
            nodes: node_count,
            chars: char_count,
            size: data.len(),
        });
    }

    let mut cursor = Cursor::new(data);
    cursor.set_position(FLOW_HEADER_SIZE as u64);
    let mut nodes = Vec::with_capacity(usize::from(node_count));
    for _ in 0..node_count {
        nodes.push(FlowNode::from_record(NodeRecord::read_options(
            &mut cursor,
            endian,
            (),
        )?));
    }

    let mut chars = Vec::with_capacity(usize::from(char_count));
    for index in 0..usize::from(char_count) {
        let value = read_u16(data, nodes_end + index * 2, endian).unwrap_or(u16::MAX);
        chars.push(clamp_char(u32::from(value)));
    }

    Ok((nodes, chars))
}
