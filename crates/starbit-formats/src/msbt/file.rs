//! MSBT message table

use std::io::Cursor;

use binrw::{BinRead, BinWrite, Endian};
use tracing::{debug, warn};

use super::attributes::{ATTRIBUTE_SIZE, MessageAttributes};
use super::error::{MalformedMessage, MsbtError, MsbtResult};
use super::text::MessageText;
use crate::lms::{
    ENCODING_UTF16, LabelEntry, LabelTable, LmsError, LmsFile, LmsSection, MSBT_BUCKETS,
    put_u16, put_u32, read_u16, read_u32,
};
use crate::{FormatError, GalaxyFormat};

/// MSBT file magic
pub const MSBT_MAGIC: [u8; 8] = *b"MsgStdBn";

const LABELS: [u8; 4] = *b"LBL1";
const ATTRIBUTES: [u8; 4] = *b"ATR1";
const TEXT: [u8; 4] = *b"TXT2";

/// How malformed message text is handled while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Fail on the first malformed message
    #[default]
    Strict,
    /// Keep malformed messages as raw placeholders and report them
    SkipMalformed,
}

/// A message that [`DecodeMode::SkipMalformed`] could not decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMessage {
    /// Index of the message in the file
    pub index: usize,
    /// Label of the message, if it had one
    pub label: Option<String>,
    /// Why it could not be decoded
    pub reason: MalformedMessage,
}

/// Result of [`MsbtFile::parse_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMsbt {
    /// Decoded table
    pub file: MsbtFile,
    /// Messages kept as raw placeholders
    pub skipped: Vec<SkippedMessage>,
}

/// One labelled message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Label, empty if the message has none
    pub label: String,
    /// Attribute record
    pub attributes: MessageAttributes,
    /// Message text
    pub text: MessageText,
    /// Set when the text could not be decoded
    ///
    /// `text` then holds the raw units found between this message's offset
    /// and the next one, and is written back as they are.
    pub malformed: Option<MalformedMessage>,
}

impl Message {
    /// Create a message with default attributes
    pub fn new(label: impl Into<String>, text: impl Into<MessageText>) -> Self {
        Self {
            label: label.into(),
            attributes: MessageAttributes::default(),
            text: text.into(),
            malformed: None,
        }
    }

    /// Check whether the message is a raw placeholder for undecodable text
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }
}

/// Section positions, so unknown sections are written back in place
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Labels,
    Attributes,
    Text,
    Other(LmsSection),
}

/// Decoded MSBT message table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsbtFile {
    endian: Endian,
    version: u8,
    bucket_count: u32,
    attribute_size: u32,
    attribute_pool: Vec<u8>,
    slots: Vec<Slot>,
    messages: Vec<Message>,
}

impl Default for MsbtFile {
    fn default() -> Self {
        Self::new()
    }
}

impl MsbtFile {
    /// Create an empty big-endian message table
    pub fn new() -> Self {
        let container = LmsFile::new(MSBT_MAGIC);
        Self {
            endian: container.endian,
            version: container.version,
            bucket_count: MSBT_BUCKETS,
            attribute_size: ATTRIBUTE_SIZE,
            attribute_pool: Vec::new(),
            slots: vec![Slot::Labels, Slot::Attributes, Slot::Text],
            messages: Vec::new(),
        }
    }

    /// Parse a message table, failing on any malformed message
    pub fn parse(data: &[u8]) -> MsbtResult<Self> {
        Ok(Self::parse_with(data, DecodeMode::Strict)?.file)
    }

    /// Parse a message table with an explicit [`DecodeMode`]
    pub fn parse_with(data: &[u8], mode: DecodeMode) -> MsbtResult<DecodedMsbt> {
        let container = LmsFile::parse(data, &MSBT_MAGIC)?;
        if container.encoding != ENCODING_UTF16 {
            return Err(MsbtError::UnsupportedEncoding(container.encoding));
        }
        let endian = container.endian;

        let mut slots = Vec::with_capacity(container.sections.len());
        let mut labels = None;
        let mut attributes = None;
        let mut text = None;
        for section in container.sections {
            match section.magic {
                LABELS if labels.is_none() => {
                    labels = Some(LabelTable::parse(&section.data, endian)?);
                    slots.push(Slot::Labels);
                }
                ATTRIBUTES if attributes.is_none() => {
                    attributes = Some(section.data);
                    slots.push(Slot::Attributes);
                }
                TEXT if text.is_none() => {
                    text = Some(section.data);
                    slots.push(Slot::Text);
                }
                _ => slots.push(Slot::Other(section)),
            }
        }

        let text = text.ok_or(LmsError::MissingSection(TEXT))?;
        let texts = decode_texts(&text, endian)?;
        let count = texts.len();

        let (attribute_size, records, attribute_pool) = match attributes {
            Some(data) => decode_attributes(&data, endian, count)?,
            None => (ATTRIBUTE_SIZE, Vec::new(), Vec::new()),
        };

        let mut names: Vec<Option<String>> = vec![None; count];
        let bucket_count = labels.as_ref().map_or(MSBT_BUCKETS, |table| table.bucket_count);
        for LabelEntry { label, index } in labels.map(|table| table.entries).unwrap_or_default() {
            let slot = names
                .get_mut(index as usize)
                .ok_or_else(|| MsbtError::LabelIndexOutOfRange {
                    label: label.clone(),
                    index,
                })?;
            match slot {
                Some(existing) => {
                    warn!("Message {index} has labels {existing:?} and {label:?}; keeping the first");
                }
                None => *slot = Some(label),
            }
        }

        let mut messages = Vec::with_capacity(count);
        let mut skipped = Vec::new();
        for (index, (decoded, label)) in texts.into_iter().zip(names).enumerate() {
            let attributes = records.get(index).copied().unwrap_or_default();
            match decoded {
                Ok(text) => messages.push(Message {
                    label: label.unwrap_or_default(),
                    attributes,
                    text,
                    malformed: None,
                }),
                Err((reason, raw)) if mode == DecodeMode::SkipMalformed => {
                    warn!("Keeping message {index} ({label:?}) as raw text: {reason}");
                    skipped.push(SkippedMessage {
                        index,
                        label: label.clone(),
                        reason: reason.clone(),
                    });
                    messages.push(Message {
                        label: label.unwrap_or_default(),
                        attributes,
                        text: raw,
                        malformed: Some(reason),
                    });
                }
                Err((reason, _)) => return Err(MsbtError::MalformedMessage { index, reason }),
            }
        }

        debug!(
            "Parsed MSBT: {} messages, {} skipped, {} sections",
            messages.len(),
            skipped.len(),
            slots.len()
        );

        Ok(DecodedMsbt {
            file: Self {
                endian,
                version: container.version,
                bucket_count,
                attribute_size,
                attribute_pool,
                slots,
                messages,
            },
            skipped,
        })
    }

    /// Build the message table
    pub fn build(&self) -> MsbtResult<Vec<u8>> {
        let mut container = LmsFile::new(MSBT_MAGIC);
        container.endian = self.endian;
        container.version = self.version;

        for slot in &self.slots {
            let section = match slot {
                Slot::Labels => LmsSection {
                    magic: LABELS,
                    data: self.label_table().build(self.endian)?,
                },
                Slot::Attributes => LmsSection {
                    magic: ATTRIBUTES,
                    data: self.encode_attributes()?,
                },
                Slot::Text => LmsSection {
                    magic: TEXT,
                    data: self.encode_texts()?,
                },
                Slot::Other(section) => section.clone(),
            };
            container.sections.push(section);
        }

        Ok(container.build()?)
    }

    /// Byte order of the file
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Messages in index order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Mutable access to the messages
    pub fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }

    /// Message at `index`
    pub fn message(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// First message labelled `label`
    pub fn find(&self, label: &str) -> Option<&Message> {
        self.find_index(label).map(|index| &self.messages[index])
    }

    /// Index of the first message labelled `label`
    pub fn find_index(&self, label: &str) -> Option<usize> {
        self.messages
            .iter()
            .position(|message| !label.is_empty() && message.label == label)
    }

    /// Mutable access to the first message labelled `label`
    pub fn find_mut(&mut self, label: &str) -> Option<&mut Message> {
        let index = self.find_index(label)?;
        self.messages.get_mut(index)
    }

    /// Append a message and return its index
    pub fn add_message(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Remove the message at `index`
    ///
    /// Later messages shift down by one; flow graphs that refer to them
    /// by index are not updated.
    pub fn remove_message(&mut self, index: usize) -> MsbtResult<Message> {
        if index >= self.messages.len() {
            return Err(MsbtError::MessageOutOfRange {
                index,
                count: self.messages.len(),
            });
        }
        Ok(self.messages.remove(index))
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check whether the table has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn label_table(&self) -> LabelTable {
        LabelTable {
            bucket_count: self.bucket_count,
            entries: self
                .messages
                .iter()
                .enumerate()
                .filter(|(_, message)| !message.label.is_empty())
                .map(|(index, message)| LabelEntry {
                    label: message.label.clone(),
                    index: index as u32,
                })
                .collect(),
        }
    }

    fn encode_attributes(&self) -> MsbtResult<Vec<u8>> {
        let mut output = Vec::new();
        put_u32(&mut output, to_u32("attribute count", self.messages.len())?, self.endian);
        put_u32(&mut output, self.attribute_size, self.endian);

        if self.attribute_size == ATTRIBUTE_SIZE {
            let mut cursor = Cursor::new(&mut output);
            cursor.set_position(8);
            for message in &self.messages {
                message.attributes.write_options(&mut cursor, self.endian, ())?;
            }
        }

        output.extend_from_slice(&self.attribute_pool);
        Ok(output)
    }

    fn encode_texts(&self) -> MsbtResult<Vec<u8>> {
        let count = self.messages.len();
        let mut output = Vec::new();
        put_u32(&mut output, to_u32("message count", count)?, self.endian);

        let mut offset = 4 + count * 4;
        for message in &self.messages {
            put_u32(&mut output, to_u32("text offset", offset)?, self.endian);
            offset += (message.text.units().len() + 1) * 2;
        }

        for message in &self.messages {
            for &unit in message.text.units() {
                put_u16(&mut output, unit, self.endian);
            }
            put_u16(&mut output, 0, self.endian);
        }

        Ok(output)
    }
}

impl GalaxyFormat for MsbtFile {
    fn parse(data: &[u8]) -> Result<Self, FormatError> {
        Ok(Self::parse(data)?)
    }

    fn build(&self) -> Result<Vec<u8>, FormatError> {
        Ok(self.build()?)
    }
}

/// Decoded text, or the failure with the raw units of the message
type DecodedText = Result<MessageText, (MalformedMessage, MessageText)>;

/// Decode every message in a TXT2 section
fn decode_texts(data: &[u8], endian: Endian) -> MsbtResult<Vec<DecodedText>> {
    let count = read_u32(data, 0, endian).ok_or(MsbtError::CountExceedsSection {
        what: "message",
        count: 0,
    })?;
    if 4 + u64::from(count) * 4 > data.len() as u64 {
        return Err(MsbtError::CountExceedsSection {
            what: "message",
            count,
        });
    }

    let mut offsets = Vec::with_capacity(count as usize);
    for index in 0..count as usize {
        offsets.push(read_u32(data, 4 + index * 4, endian).unwrap_or(u32::MAX));
    }

    let units: Vec<u16> = (0..data.len() / 2)
        .filter_map(|unit| read_u16(data, unit * 2, endian))
        .collect();

    let mut starts: Vec<usize> = offsets
        .iter()
        .map(|&offset| offset as usize)
        .filter(|&start| start < data.len() && start % 2 == 0)
        .collect();
    starts.sort_unstable();
    starts.dedup();

    Ok(offsets
        .into_iter()
        .map(|offset| {
            let start = offset as usize;
            if start >= data.len() || start % 2 != 0 {
                return Err((
                    MalformedMessage::OffsetOutOfBounds(offset),
                    MessageText::default(),
                ));
            }
            MessageText::scan(&units[start / 2..])
                .map_err(|reason| (reason, raw_text(&units, start, &starts)))
        })
        .collect())
}

/// Units from `start` up to the next message start, minus one terminator
fn raw_text(units: &[u16], start: usize, starts: &[usize]) -> MessageText {
    let end = starts
        .iter()
        .find(|&&next| next > start)
        .map_or(units.len(), |&next| next / 2);
    let mut raw = &units[start / 2..end];
    if let [rest @ .., 0] = raw {
        raw = rest;
    }
    MessageText::from_units(raw.to_vec())
}

/// Decode an ATR1 section into (record size, records, trailing pool)
fn decode_attributes(
    data: &[u8],
    endian: Endian,
    messages: usize,
) -> MsbtResult<(u32, Vec<MessageAttributes>, Vec<u8>)> {
    let truncated = MsbtError::CountExceedsSection {
        what: "attribute",
        count: 0,
    };
    let count = read_u32(data, 0, endian).ok_or(truncated)?;
    let size = read_u32(data, 4, endian).ok_or(MsbtError::CountExceedsSection {
        what: "attribute",
        count,
    })?;

    if count as usize != messages {
        return Err(MsbtError::AttributeCountMismatch {
            attributes: count,
            messages: messages as u32,
        });
    }

    match size {
        0 => Ok((0, Vec::new(), data[8..].to_vec())),
        ATTRIBUTE_SIZE => {
            let end = 8 + u64::from(count) * u64::from(ATTRIBUTE_SIZE);
            if end > data.len() as u64 {
                return Err(MsbtError::CountExceedsSection {
                    what: "attribute",
                    count,
                });
            }

            let mut cursor = Cursor::new(data);
            cursor.set_position(8);
            let mut records = Vec::with_capacity(count as usize);
            for _ in 0..count {
                records.push(MessageAttributes::read_options(&mut cursor, endian, ())?);
            }
            Ok((size, records, data[end as usize..].to_vec()))
        }
        other => Err(MsbtError::UnsupportedAttributeSize(other)),
    }
}

fn to_u32(what: &'static str, value: usize) -> MsbtResult<u32> {
    u32::try_from(value).map_err(|_| MsbtError::TooLarge { what, value })
}
