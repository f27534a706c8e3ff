//! Hash-bucketed label tables (LBL1 and FEN1)

use binrw::Endian;

use super::container::{put_u32, read_u32};
use super::error::{LmsError, LmsResult};

/// Bucket count used by message tables
pub const MSBT_BUCKETS: u32 = 101;

/// Bucket count used by flow graphs
pub const MSBF_BUCKETS: u32 = 59;

/// Hash a label into one of `buckets` buckets
///
/// ```
/// use starbit_formats::lms::label_hash;
///
/// assert_eq!(label_hash("A", 101), 65);
/// assert_eq!(label_hash("AB", 101), (65 * 0x492 + 66) % 101);
/// ```
pub fn label_hash(label: &str, buckets: u32) -> u32 {
    let hash = label
        .bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(0x492).wrapping_add(u32::from(byte)));
    hash.checked_rem(buckets).unwrap_or(0)
}

/// One label and the index it names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    /// Label text
    pub label: String,
    /// Message or node index
    pub index: u32,
}

/// Decoded label section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    /// Number of hash buckets
    pub bucket_count: u32,
    /// Labels in on-disk order
    pub entries: Vec<LabelEntry>,
}

impl LabelTable {
    /// Create an empty table
    pub const fn new(bucket_count: u32) -> Self {
        Self {
            bucket_count,
            entries: Vec::new(),
        }
    }

    /// Parse the contents of a label section
    pub fn parse(data: &[u8], endian: Endian) -> LmsResult<Self> {
        let bucket_count = read_u32(data, 0, endian).ok_or(LmsError::LabelOutOfBounds(0))?;
        let buckets_end = 4 + u64::from(bucket_count) * 8;
        if buckets_end > data.len() as u64 {
            return Err(LmsError::LabelOutOfBounds(buckets_end));
        }

        let mut entries = Vec::new();
        for bucket in 0..bucket_count as usize {
            let slot = 4 + bucket * 8;
            let count = read_u32(data, slot, endian).ok_or(LmsError::LabelOutOfBounds(slot as u64))?;
            let offset = read_u32(data, slot + 4, endian)
                .ok_or(LmsError::LabelOutOfBounds(slot as u64 + 4))?;

            let mut pos = offset as usize;
            for _ in 0..count {
                let len = *data.get(pos).ok_or(LmsError::LabelOutOfBounds(pos as u64))? as usize;
                let text = data
                    .get(pos + 1..pos + 1 + len)
                    .ok_or(LmsError::LabelOutOfBounds(pos as u64))?;
                let label = std::str::from_utf8(text)
                    .map_err(|_| LmsError::InvalidLabel(pos as u64))?
                    .to_string();
                let index = read_u32(data, pos + 1 + len, endian)
                    .ok_or(LmsError::LabelOutOfBounds((pos + 1 + len) as u64))?;

                entries.push(LabelEntry { label, index });
                pos += 1 + len + 4;
            }
        }

        Ok(Self {
            bucket_count,
            entries,
        })
    }

    /// Build the section contents
    ///
    /// Labels are grouped by bucket; within a bucket they keep the order
    /// of [`entries`](Self::entries).
    pub fn build(&self, endian: Endian) -> LmsResult<Vec<u8>> {
        if self.bucket_count == 0 {
            if self.entries.is_empty() {
                let mut output = Vec::with_capacity(4);
                put_u32(&mut output, 0, endian);
                return Ok(output);
            }
            return Err(LmsError::NoBuckets(self.entries.len()));
        }

        let mut buckets: Vec<Vec<&LabelEntry>> = vec![Vec::new(); self.bucket_count as usize];
        for entry in &self.entries {
            if entry.label.len() > usize::from(u8::MAX) {
                return Err(LmsError::LabelTooLong(entry.label.clone()));
            }
            buckets[label_hash(&entry.label, self.bucket_count) as usize].push(entry);
        }

        let mut output = Vec::new();
        put_u32(&mut output, self.bucket_count, endian);

        let mut offset = 4 + buckets.len() * 8;
        for bucket in &buckets {
            put_u32(&mut output, bucket.len() as u32, endian);
            put_u32(&mut output, to_u32(offset)?, endian);
            offset += bucket
                .iter()
                .map(|entry| 1 + entry.label.len() + 4)
                .sum::<usize>();
        }

        for entry in buckets.iter().flatten() {
            output.push(entry.label.len() as u8);
            output.extend_from_slice(entry.label.as_bytes());
            put_u32(&mut output, entry.index, endian);
        }

        Ok(output)
    }

    /// Index named by the first occurrence of `label`
    pub fn index_of(&self, label: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.index)
    }
}

fn to_u32(value: usize) -> LmsResult<u32> {
    u32::try_from(value).map_err(|_| LmsError::TooLarge {
        what: "label table",
        value,
    })
}
