//! Yaz0 compression
//!
//! Yaz0 is the LZ77 variant wrapped around most archives on Galaxy discs.
//!
//! # Layout
//!
//! ```text
//! 0x00  "Yaz0"
//! 0x04  u32 decompressed size (big-endian)
//! 0x08  8 reserved bytes
//! 0x10  groups: 1 header byte followed by 8 chunks, MSB first
//! ```
//!
//! A set header bit copies one literal byte. A clear bit introduces a back
//! reference of two bytes `NR RR` (length `N + 2`, distance `RRR + 1`) or,
//! when `N` is zero, three bytes `0R RR NN` (length `NN + 0x12`).

mod error;

pub use error::{Yaz0Error, Yaz0Result};

use binrw::{BinRead, BinWrite};
use std::io::Cursor;

/// Yaz0 magic signature
pub const YAZ0_MAGIC: [u8; 4] = *b"Yaz0";

/// Size of the Yaz0 header in bytes
pub const HEADER_SIZE: usize = 0x10;

/// Maximum allowed decompression size (256 MB)
///
/// The largest Galaxy archives are a few megabytes; anything above this
/// limit is treated as a corrupt header.
pub const MAX_DECOMPRESSION_SIZE: u32 = 256 * 1024 * 1024;

/// Longest back reference distance
const WINDOW_SIZE: usize = 0x1000;

/// Shortest match worth encoding as a back reference
const MIN_MATCH: usize = 3;

/// Longest encodable match
const MAX_MATCH: usize = 0xFF + 0x12;

/// Bits of the 3-byte prefix hash used by the match finder
const HASH_BITS: u32 = 15;

/// Candidates examined per position
const MAX_CHAIN: usize = 256;

/// Empty hash chain slot
const NO_POSITION: usize = usize::MAX;

/// Yaz0 stream header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct Yaz0Header {
    /// Magic signature, always "Yaz0"
    pub magic: [u8; 4],
    /// Size of the data after decompression
    pub decompressed_size: u32,
    /// Reserved, zero in every known file
    pub reserved: [u8; 8],
}

impl Yaz0Header {
    /// Create a header for `decompressed_size` bytes of output
    pub fn new(decompressed_size: u32) -> Self {
        Self {
            magic: YAZ0_MAGIC,
            decompressed_size,
            reserved: [0; 8],
        }
    }
}

/// Check whether `data` starts with the Yaz0 magic
pub fn is_yaz0(data: &[u8]) -> bool {
    data.len() >= HEADER_SIZE && data[..4] == YAZ0_MAGIC
}

/// Decompress a Yaz0 stream
pub fn decompress(data: &[u8]) -> Yaz0Result<Vec<u8>> {
    if !is_yaz0(data) {
        let mut magic = [0u8; 4];
        let len = data.len().min(4);
        magic[..len].copy_from_slice(&data[..len]);
        return Err(Yaz0Error::InvalidMagic(magic));
    }

    let header = Yaz0Header::read(&mut Cursor::new(data))?;
    if header.decompressed_size > MAX_DECOMPRESSION_SIZE {
        return Err(Yaz0Error::SizeLimitExceeded(header.decompressed_size));
    }

    let expected = header.decompressed_size as usize;
    let mut output = Vec::with_capacity(expected);
    let mut src = HEADER_SIZE;

    let truncated = |offset: usize, produced: usize| Yaz0Error::Truncated {
        offset,
        produced,
        expected,
    };

    while output.len() < expected {
        let group = *data.get(src).ok_or_else(|| truncated(src, output.len()))?;
        src += 1;

        for bit in 0..8 {
            if output.len() >= expected {
                break;
            }

            if group & (0x80 >> bit) != 0 {
                let byte = *data.get(src).ok_or_else(|| truncated(src, output.len()))?;
                output.push(byte);
                src += 1;
                continue;
            }

            let pair = data
                .get(src..src + 2)
                .ok_or_else(|| truncated(src, output.len()))?;
            let (b1, b2) = (pair[0], pair[1]);
            src += 2;

            let distance = ((usize::from(b1 & 0x0F) << 8) | usize::from(b2)) + 1;
            let length = match b1 >> 4 {
                0 => {
                    let extra = *data.get(src).ok_or_else(|| truncated(src, output.len()))?;
                    src += 1;
                    usize::from(extra) + 0x12
                }
                n => usize::from(n) + 2,
            };

            if distance > output.len() {
                return Err(Yaz0Error::InvalidBackReference {
                    distance,
                    produced: output.len(),
                });
            }

            let length = length.min(expected - output.len());
            let start = output.len() - distance;
            // Byte by byte: the source may overlap the bytes being written
            for i in 0..length {
                let byte = output[start + i];
                output.push(byte);
            }
        }
    }

    Ok(output)
}

/// Compress data into a Yaz0 stream
///
/// Uses a greedy longest-match search over the 4 KB window, following
/// hash chains of 3-byte prefixes.
pub fn compress(data: &[u8]) -> Yaz0Result<Vec<u8>> {
    let size = u32::try_from(data.len()).map_err(|_| Yaz0Error::InputTooLarge(data.len()))?;

    let mut output = Vec::with_capacity(HEADER_SIZE + data.len() + data.len() / 8 + 1);
    Yaz0Header::new(size).write(&mut Cursor::new(&mut output))?;

    let mut finder = MatchFinder::new(data);
    let mut pos = 0;
    while pos < data.len() {
        let group_index = output.len();
        output.push(0);
        let mut group = 0u8;

        for bit in 0..8 {
            if pos >= data.len() {
                break;
            }

            let (distance, length) = finder.longest_match(pos);
            if length >= MIN_MATCH {
                let dist = distance - 1;
                if length >= 0x12 {
                    output.push((dist >> 8) as u8);
                    output.push((dist & 0xFF) as u8);
                    output.push((length - 0x12) as u8);
                } else {
                    output.push((((length - 2) << 4) | (dist >> 8)) as u8);
                    output.push((dist & 0xFF) as u8);
                }
                pos += length;
            } else {
                group |= 0x80 >> bit;
                output.push(data[pos]);
                pos += 1;
            }
        }

        output[group_index] = group;
    }

    Ok(output)
}

/// Hash chains over every position already passed by the encoder
struct MatchFinder<'a> {
    data: &'a [u8],
    head: Vec<usize>,
    prev: Vec<usize>,
    indexed: usize,
}

impl<'a> MatchFinder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            head: vec![NO_POSITION; 1 << HASH_BITS],
            prev: vec![NO_POSITION; WINDOW_SIZE],
            indexed: 0,
        }
    }

    fn hash(&self, pos: usize) -> usize {
        let prefix = u32::from(self.data[pos]) << 16
            | u32::from(self.data[pos + 1]) << 8
            | u32::from(self.data[pos + 2]);
        (prefix.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    /// Add every position before `end` to the chains
    fn index_until(&mut self, end: usize) {
        while self.indexed < end {
            let pos = self.indexed;
            if pos + MIN_MATCH <= self.data.len() {
                let hash = self.hash(pos);
                self.prev[pos % WINDOW_SIZE] = self.head[hash];
                self.head[hash] = pos;
            }
            self.indexed += 1;
        }
    }

    /// Find the longest match for `data[pos..]` inside the window
    ///
    /// Returns `(distance, length)`; length is 0 when nothing matches.
    fn longest_match(&mut self, pos: usize) -> (usize, usize) {
        self.index_until(pos);

        let max_length = MAX_MATCH.min(self.data.len() - pos);
        if max_length < MIN_MATCH {
            return (0, 0);
        }

        let window_start = pos.saturating_sub(WINDOW_SIZE);
        let target = &self.data[pos..pos + max_length];
        let mut candidate = self.head[self.hash(pos)];
        let mut best = (0, 0);

        for _ in 0..MAX_CHAIN {
            // Chain slots older than the window may have been reused
            if candidate == NO_POSITION || candidate < window_start {
                break;
            }

            let length = self.data[candidate..]
                .iter()
                .zip(target)
                .take_while(|(a, b)| a == b)
                .count();
            if length > best.1 {
                best = (pos - candidate, length);
                if length == max_length {
                    break;
                }
            }

            let next = self.prev[candidate % WINDOW_SIZE];
            if next >= candidate {
                break;
            }
            candidate = next;
        }

        best
    }
}
