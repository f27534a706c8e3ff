//! LMS file header and section list

use std::io::Cursor;

use binrw::{BinRead, BinWrite, Endian};

use super::error::{LmsError, LmsResult};
use crate::{align_up, pad_to};

/// Size of the file header
pub const HEADER_SIZE: usize = 0x20;

/// Size of a section header
pub const SECTION_HEADER_SIZE: usize = 0x10;

/// Alignment of every section
pub const SECTION_ALIGNMENT: usize = 0x10;

/// Byte used to pad sections
pub const SECTION_PADDING: u8 = 0xAB;

/// Text encoding byte for UTF-16
pub const ENCODING_UTF16: u8 = 1;

/// Format version written by the Galaxy tools
pub const DEFAULT_VERSION: u8 = 3;

/// File header; multi-byte fields follow the byte order mark
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct LmsHeader {
    /// File magic, "MsgStdBn" or "MsgFlwBn"
    pub magic: [u8; 8],
    /// Byte order mark, stored as raw bytes
    pub bom: [u8; 2],
    /// Reserved
    pub reserved: u16,
    /// Text encoding (0 UTF-8, 1 UTF-16, 2 UTF-32)
    pub encoding: u8,
    /// Format version
    pub version: u8,
    /// Number of sections
    pub section_count: u16,
    /// Reserved
    pub reserved2: u16,
    /// Total file size
    pub file_size: u32,
    /// Padding
    pub padding: [u8; 10],
}

/// Section header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct SectionHeader {
    /// Section magic, e.g. "LBL1"
    pub magic: [u8; 4],
    /// Size of the section data, excluding header and padding
    pub size: u32,
    /// Padding
    pub padding: [u8; 8],
}

/// Raw section contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmsSection {
    /// Section magic
    pub magic: [u8; 4],
    /// Section data without padding
    pub data: Vec<u8>,
}

/// Parsed LMS container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmsFile {
    /// File magic
    pub magic: [u8; 8],
    /// Byte order of every multi-byte field
    pub endian: Endian,
    /// Text encoding byte
    pub encoding: u8,
    /// Format version
    pub version: u8,
    /// Sections in file order
    pub sections: Vec<LmsSection>,
}

impl LmsFile {
    /// Create an empty big-endian UTF-16 container
    pub fn new(magic: [u8; 8]) -> Self {
        Self {
            magic,
            endian: Endian::Big,
            encoding: ENCODING_UTF16,
            version: DEFAULT_VERSION,
            sections: Vec::new(),
        }
    }

    /// Parse a container, requiring the file magic `expected`
    pub fn parse(data: &[u8], expected: &[u8; 8]) -> LmsResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(LmsError::Truncated {
                needed: HEADER_SIZE as u64,
                available: data.len(),
            });
        }

        let mut found = [0u8; 8];
        found.copy_from_slice(&data[..8]);
        if &found != expected {
            return Err(LmsError::InvalidMagic {
                expected: String::from_utf8_lossy(expected).into_owned(),
                found,
            });
        }

        let endian = match [data[8], data[9]] {
            [0xFE, 0xFF] => Endian::Big,
            [0xFF, 0xFE] => Endian::Little,
            other => return Err(LmsError::InvalidByteOrderMark(u16::from_be_bytes(other))),
        };

        let mut cursor = Cursor::new(data);
        let header = LmsHeader::read_options(&mut cursor, endian, ())?;

        // Some tools append padding past the declared size
        let end = (header.file_size as usize).min(data.len());
        let mut sections = Vec::with_capacity(usize::from(header.section_count).min(16));
        let mut offset = HEADER_SIZE;

        for _ in 0..header.section_count {
            if offset + SECTION_HEADER_SIZE > end {
                return Err(LmsError::Truncated {
                    needed: (offset + SECTION_HEADER_SIZE) as u64,
                    available: end,
                });
            }

            cursor.set_position(offset as u64);
            let section = SectionHeader::read_options(&mut cursor, endian, ())?;
            let start = offset + SECTION_HEADER_SIZE;
            let stop = start as u64 + u64::from(section.size);
            if stop > end as u64 {
                return Err(LmsError::SectionOutOfBounds {
                    magic: section.magic,
                    size: section.size,
                });
            }

            sections.push(LmsSection {
                magic: section.magic,
                data: data[start..stop as usize].to_vec(),
            });
            offset = align_up(stop as usize, SECTION_ALIGNMENT);
        }

        Ok(Self {
            magic: header.magic,
            endian,
            encoding: header.encoding,
            version: header.version,
            sections,
        })
    }

    /// Build the container
    pub fn build(&self) -> LmsResult<Vec<u8>> {
        let bom = match self.endian {
            Endian::Big => [0xFE, 0xFF],
            Endian::Little => [0xFF, 0xFE],
        };
        let section_count = u16::try_from(self.sections.len()).map_err(|_| LmsError::TooLarge {
            what: "section count",
            value: self.sections.len(),
        })?;

        let mut header = LmsHeader {
            magic: self.magic,
            bom,
            reserved: 0,
            encoding: self.encoding,
            version: self.version,
            section_count,
            reserved2: 0,
            file_size: 0,
            padding: [0; 10],
        };

        let mut output = Vec::new();
        header.write_options(&mut Cursor::new(&mut output), self.endian, ())?;

        for section in &self.sections {
            let size = u32::try_from(section.data.len()).map_err(|_| LmsError::TooLarge {
                what: "section size",
                value: section.data.len(),
            })?;

            let mut cursor = Cursor::new(&mut output);
            cursor.set_position(cursor.get_ref().len() as u64);
            SectionHeader {
                magic: section.magic,
                size,
                padding: [0; 8],
            }
            .write_options(&mut cursor, self.endian, ())?;

            output.extend_from_slice(&section.data);
            pad_to(&mut output, SECTION_ALIGNMENT, SECTION_PADDING);
        }

        header.file_size = u32::try_from(output.len()).map_err(|_| LmsError::TooLarge {
            what: "file size",
            value: output.len(),
        })?;
        header.write_options(&mut Cursor::new(&mut output), self.endian, ())?;

        Ok(output)
    }

    /// First section with the given magic
    pub fn section(&self, magic: &[u8; 4]) -> Option<&LmsSection> {
        self.sections.iter().find(|section| &section.magic == magic)
    }
}

/// Read a `u16` at `pos` in the given byte order
pub(crate) fn read_u16(data: &[u8], pos: usize, endian: Endian) -> Option<u16> {
    let bytes: [u8; 2] = data.get(pos..pos.checked_add(2)?)?.try_into().ok()?;
    Some(match endian {
        Endian::Big => u16::from_be_bytes(bytes),
        Endian::Little => u16::from_le_bytes(bytes),
    })
}

/// Read a `u32` at `pos` in the given byte order
pub(crate) fn read_u32(data: &[u8], pos: usize, endian: Endian) -> Option<u32> {
    let bytes: [u8; 4] = data.get(pos..pos.checked_add(4)?)?.try_into().ok()?;
    Some(match endian {
        Endian::Big => u32::from_be_bytes(bytes),
        Endian::Little => u32::from_le_bytes(bytes),
    })
}

/// Append a `u16` in the given byte order
pub(crate) fn put_u16(buffer: &mut Vec<u8>, value: u16, endian: Endian) {
    match endian {
        Endian::Big => buffer.extend_from_slice(&value.to_be_bytes()),
        Endian::Little => buffer.extend_from_slice(&value.to_le_bytes()),
    }
}

/// Append a `u32` in the given byte order
pub(crate) fn put_u32(buffer: &mut Vec<u8>, value: u32, endian: Endian) {
    match endian {
        Endian::Big => buffer.extend_from_slice(&value.to_be_bytes()),
        Endian::Little => buffer.extend_from_slice(&value.to_le_bytes()),
    }
}
