//! Flow graph nodes

use std::fmt;

use binrw::{BinRead, BinWrite};

/// Kind byte of an entry node
pub const ENTRY_KIND: u8 = 4;

/// Parameter value meaning "no node"
pub const NO_NODE: u16 = 0xFFFF;

/// On-disk size of a node record
pub const NODE_SIZE: usize = 12;

/// Raw node record
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
pub struct NodeRecord {
    /// Node kind
    pub kind: u8,
    /// Kind-specific subtype
    pub subtype: u8,
    /// Parameters
    pub params: [u16; 5],
}

/// The six numeric values every node carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowAttributes {
    /// Kind-specific subtype
    pub subtype: u8,
    /// Parameters; `params[1]` is the next node
    pub params: [u16; 5],
}

impl Default for FlowAttributes {
    fn default() -> Self {
        Self {
            subtype: 0,
            params: [0, NO_NODE, 0, 0, 0],
        }
    }
}

impl FlowAttributes {
    /// Next node, if any
    #[must_use]
    pub const fn next(&self) -> Option<u16> {
        match self.params[1] {
            NO_NODE => None,
            next => Some(next),
        }
    }

    /// Point the node at `next`, or at nothing
    pub fn set_next(&mut self, next: Option<u16>) {
        self.params[1] = next.unwrap_or(NO_NODE);
    }
}

/// Kind of a non-entry node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowKind {
    /// Shows a message; `params[0]` is the message index
    #[default]
    Message,
    /// Two-way branch; `params[1]` and `params[2]` are the targets
    Branch,
    /// Fires a game event
    Event,
    /// Kind not known to this crate
    Other(u8),
}

impl FlowKind {
    /// Decode the kind byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Message,
            2 => Self::Branch,
            3 => Self::Event,
            other => Self::Other(other),
        }
    }

    /// Encode as the kind byte
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Message => 1,
            Self::Branch => 2,
            Self::Event => 3,
            Self::Other(value) => value,
        }
    }
}

/// Control node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Flow {
    /// What the node does
    pub kind: FlowKind,
    /// Numeric attributes
    pub attributes: FlowAttributes,
}

/// Entry point into the graph, named by a label
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlowEntry {
    /// Label, empty if the entry has none
    pub label: String,
    /// Numeric attributes; `params[0]` is the message index
    pub attributes: FlowAttributes,
}

impl FlowEntry {
    /// Index of the message this entry shows
    #[must_use]
    pub const fn message_index(&self) -> u16 {
        self.attributes.params[0]
    }
}

/// Node of a flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowNode {
    /// Control node
    Flow(Flow),
    /// Labelled entry node
    Entry(FlowEntry),
}

impl FlowNode {
    /// Check whether this is an entry node
    #[must_use]
    pub const fn is_entry(&self) -> bool {
        matches!(self, Self::Entry(_))
    }

    /// Numeric attributes
    #[must_use]
    pub const fn attributes(&self) -> &FlowAttributes {
        match self {
            Self::Flow(flow) => &flow.attributes,
            Self::Entry(entry) => &entry.attributes,
        }
    }

    /// Mutable numeric attributes
    pub fn attributes_mut(&mut self) -> &mut FlowAttributes {
        match self {
            Self::Flow(flow) => &mut flow.attributes,
            Self::Entry(entry) => &mut entry.attributes,
        }
    }

    /// Node indices this node can continue to
    pub fn edges(&self) -> impl Iterator<Item = u16> + '_ {
        let params = &self.attributes().params;
        let second = match self {
            Self::Flow(Flow {
                kind: FlowKind::Branch,
                ..
            }) => Some(params[2]),
            _ => None,
        };
        std::iter::once(params[1])
            .chain(second)
            .filter(|&target| target != NO_NODE)
    }

    pub(crate) fn from_record(record: NodeRecord) -> Self {
        let attributes = FlowAttributes {
            subtype: record.subtype,
            params: record.params,
        };
        if record.kind == ENTRY_KIND {
            Self::Entry(FlowEntry {
                label: String::new(),
                attributes,
            })
        } else {
            Self::Flow(Flow {
                kind: FlowKind::from_u8(record.kind),
                attributes,
            })
        }
    }

    pub(crate) fn to_record(&self) -> NodeRecord {
        let attributes = self.attributes();
        NodeRecord {
            kind: match self {
                Self::Flow(flow) => flow.kind.to_u8(),
                Self::Entry(_) => ENTRY_KIND,
            },
            subtype: attributes.subtype,
            params: attributes.params,
        }
    }
}

/// Problem found by [`MsbfFile::validate`](super::MsbfFile::validate)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowWarning {
    /// Edge points past the end of the node list
    DanglingEdge {
        /// Node holding the edge
        node: usize,
        /// Missing target
        target: u16,
    },
}

impl fmt::Display for FlowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingEdge { node, target } => {
                write!(f, "node {node} points at missing node {target}")
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::Endian;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_record_layout() {
        let data = [4, 7, 0, 1, 0, 2, 0, 3, 0, 4, 0, 5];
        let record = NodeRecord::read_options(&mut Cursor::new(&data), Endian::Big, ()).unwrap();
        assert_eq!(record.params, [1, 2, 3, 4, 5]);

        let node = FlowNode::from_record(record);
        assert!(node.is_entry());
        assert_eq!(node.attributes().subtype, 7);
        assert_eq!(node.to_record(), record);

        let mut little = Cursor::new(Vec::new());
        record.write_options(&mut little, Endian::Little, ()).unwrap();
        assert_eq!(little.into_inner()[2..4], [1, 0]);
    }

    #[test]
    fn test_kinds() {
        let branch = FlowNode::from_record(NodeRecord {
            kind: 2,
            subtype: 0,
            params: [0; 5],
        });
        assert!(matches!(
            branch,
            FlowNode::Flow(Flow {
                kind: FlowKind::Branch,
                ..
            })
        ));

        for value in [0u8, 1, 2, 3, 5, 200] {
            assert_eq!(FlowKind::from_u8(value).to_u8(), value);
        }
    }

    #[test]
    fn test_edges() {
        let mut branch = FlowNode::Flow(Flow {
            kind: FlowKind::Branch,
            attributes: FlowAttributes::default(),
        });
        assert_eq!(branch.edges().count(), 0);

        branch.attributes_mut().params[1] = 3;
        branch.attributes_mut().params[2] = 5;
        assert_eq!(branch.edges().collect::<Vec<_>>(), vec![3, 5]);

        let mut entry = FlowNode::Entry(FlowEntry::default());
        entry.attributes_mut().set_next(Some(2));
        entry.attributes_mut().params[2] = 9;
        assert_eq!(entry.edges().collect::<Vec<_>>(), vec![2]);
        assert_eq!(entry.attributes().next(), Some(2));
    }

    #[test]
    fn test_defaults() {
        let attributes = FlowAttributes::default();
        assert_eq!(attributes.next(), None);
        assert_eq!(FlowEntry::default().message_index(), 0);
        assert_eq!(
            FlowWarning::DanglingEdge { node: 1, target: 9 }.to_string(),
            "node 1 points at missing node 9"
        );
    }
}
