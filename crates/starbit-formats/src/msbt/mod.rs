//! MSBT message tables
//!
//! An MSBT file holds the dialogue of one stage or object: a list of
//! UTF-16 messages, each with a 12-byte attribute record and usually a
//! label. Messages are addressed by index from flow graphs and by label
//! from placement data.
//!
//! # Sections
//!
//! ```text
//! LBL1  hash-bucketed labels -> message index
//! ATR1  u32 count | u32 record size (12) | records | string pool
//! TXT2  u32 count | u32 offsets[count] | null-terminated UTF-16 strings
//! ```
//!
//! Text is kept as raw code units so control sequences survive editing
//! unchanged. Sections this crate does not decode are written back as
//! they were read.
//!
//! # Example
//!
//! ```
//! use starbit_formats::msbt::{Message, MsbtFile};
//!
//! let mut file = MsbtFile::new();
//! file.add_message(Message::new("Intro", "Welcome to the observatory."));
//!
//! let parsed = MsbtFile::parse(&file.build().unwrap()).unwrap();
//! assert_eq!(parsed.find("Intro").unwrap().text.to_string(), "Welcome to the observatory.");
//! ```

mod attributes;
mod error;
mod file;
mod text;

pub use attributes::{ATTRIBUTE_SIZE, MessageAttributes, TriggerKind};
pub use error::{MalformedMessage, MsbtError, MsbtResult};
pub use file::{DecodeMode, DecodedMsbt, MSBT_MAGIC, Message, MsbtFile, SkippedMessage};
pub use text::{CONTROL_ESCAPE, MessageText, Segment, Segments};
