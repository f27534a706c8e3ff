//! MSBF message flow graphs
//!
//! A flow graph drives a conversation: entry nodes are looked up by label,
//! and each node continues to another by index until a node with no next
//! node is reached. A small table of 8-bit char codes rides along with
//! the nodes.
//!
//! # Sections
//!
//! ```text
//! FLW2  u16 node count | u16 char count | u32 0
//!       nodes, 12 bytes each: u8 kind | u8 subtype | u16 params[5]
//!       char codes, u16 each
//! FEN1  hash-bucketed labels -> entry node index
//! ```
//!
//! Kind 4 marks an entry node; every other kind is a control node.
//!
//! # Example
//!
//! ```
//! use starbit_formats::msbf::MsbfFile;
//!
//! let mut graph = MsbfFile::new();
//! graph.add_empty_node(true);
//! graph.add_empty_node(false);
//! assert_eq!(graph.insert_char(0, 1000).unwrap(), 255);
//!
//! graph.remove_node(0).unwrap();
//! assert_eq!(graph.nodes().len(), 1);
//! ```

mod error;
mod file;
mod node;

pub use error::{MsbfError, MsbfResult};
pub use file::{MAX_CHAR_CODE, MSBF_MAGIC, MsbfFile};
pub use node::{
    ENTRY_KIND, Flow, FlowAttributes, FlowEntry, FlowKind, FlowNode, FlowWarning, NO_NODE,
    NODE_SIZE, NodeRecord,
};
