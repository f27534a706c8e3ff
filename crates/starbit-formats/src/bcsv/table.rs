//! BCSV table parsing, building, and editing

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use starbit_hash::FieldNameTable;
use tracing::debug;

use super::error::{BcsvError, BcsvResult};
use super::header::{
    BcsvHeader, FIELD_SIZE, FILE_ALIGNMENT, FieldDescriptor, HEADER_SIZE, PADDING_BYTE,
};
use super::pool::StringPool;
use super::types::{BcsvField, FieldKey, FieldType, FieldValue, INLINE_STRING_SIZE};
use crate::{FormatError, GalaxyFormat, align_up, pad_to, sjis};

/// One record of a table
///
/// Values are stored in schema order; look them up through
/// [`BcsvTable::field_value`].
#[derive(Debug, Clone)]
pub struct BcsvEntry {
    values: Vec<FieldValue>,
    /// Pool offset each string offset value was read from
    pool_hints: Vec<Option<u32>>,
}

impl PartialEq for BcsvEntry {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl BcsvEntry {
    fn new(values: Vec<FieldValue>) -> Self {
        let pool_hints = vec![None; values.len()];
        Self { values, pool_hints }
    }

    /// Values in schema order
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

/// Decoded BCSV table
#[derive(Debug, Clone, Default)]
pub struct BcsvTable {
    fields: Vec<BcsvField>,
    entries: Vec<BcsvEntry>,
    entry_size: u32,
    pool: StringPool,
    // Bytes between the field descriptors and the first record
    header_gap: Vec<u8>,
}

impl PartialEq for BcsvTable {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.entry_size == other.entry_size
            && self.entries == other.entries
    }
}

impl BcsvTable {
    /// Create a table without fields or entries
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table
    pub fn parse(data: &[u8]) -> BcsvResult<Self> {
        let truncated = |needed: u64| BcsvError::Truncated {
            needed,
            available: data.len(),
        };

        if data.len() < HEADER_SIZE {
            return Err(truncated(HEADER_SIZE as u64));
        }

        let mut cursor = Cursor::new(data);
        let header = BcsvHeader::read(&mut cursor)?;

        let fields_end = HEADER_SIZE as u64 + u64::from(header.field_count) * FIELD_SIZE as u64;
        if fields_end > data.len() as u64 {
            return Err(truncated(fields_end));
        }

        let mut fields = Vec::with_capacity(header.field_count as usize);
        let mut seen = HashSet::new();
        for _ in 0..header.field_count {
            let descriptor = FieldDescriptor::read(&mut cursor)?;
            let field = BcsvField {
                hash: descriptor.hash,
                mask: descriptor.mask,
                offset: descriptor.offset,
                shift: descriptor.shift,
                field_type: FieldType::from_u8(descriptor.field_type)?,
            };

            check_field_fits(&field, header.entry_size)?;
            if !seen.insert(field.hash) {
                return Err(BcsvError::DuplicateField(field.hash));
            }
            fields.push(field);
        }

        if header.entry_size == 0 && header.entry_count != 0 {
            return Err(BcsvError::ZeroSizedEntries(header.entry_count));
        }

        let records_start = u64::from(header.data_offset);
        let records_end =
            records_start + u64::from(header.entry_count) * u64::from(header.entry_size);
        if records_end > data.len() as u64 {
            return Err(truncated(records_end));
        }

        let header_gap = if records_start > fields_end {
            debug!(
                "BCSV records start {} bytes after the field descriptors",
                records_start - fields_end
            );
            data[fields_end as usize..records_start as usize].to_vec()
        } else {
            Vec::new()
        };

        // Trailing alignment padding is not part of the pool
        let pool_bytes = &data[records_end as usize..];
        let pool_len = pool_bytes
            .iter()
            .rposition(|&b| b != PADDING_BYTE)
            .map_or(0, |last| last + 1);
        let pool = StringPool::from_bytes(pool_bytes[..pool_len].to_vec());

        let entry_size = header.entry_size as usize;
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for index in 0..header.entry_count as usize {
            let start = records_start as usize + index * entry_size;
            let record = &data[start..start + entry_size];

            let mut values = Vec::with_capacity(fields.len());
            let mut pool_hints = Vec::with_capacity(fields.len());
            for field in &fields {
                let (value, hint) = decode_value(field, record, &pool)?;
                values.push(value);
                pool_hints.push(hint);
            }
            entries.push(BcsvEntry { values, pool_hints });
        }

        debug!(
            "Parsed BCSV: {} fields, {} entries, {} byte records, {} byte pool",
            fields.len(),
            entries.len(),
            header.entry_size,
            pool_len
        );

        Ok(Self {
            fields,
            entries,
            entry_size: header.entry_size,
            pool,
            header_gap,
        })
    }

    /// Build the table
    ///
    /// Strings already present in the pool keep their offsets; new strings
    /// are appended once each.
    pub fn build(&self) -> BcsvResult<Vec<u8>> {
        let mut pool = self.pool.clone();
        let entry_size = self.entry_size as usize;
        let data_offset = HEADER_SIZE + self.fields.len() * FIELD_SIZE + self.header_gap.len();

        let header = BcsvHeader {
            entry_count: to_u32(self.entries.len())?,
            field_count: to_u32(self.fields.len())?,
            data_offset: to_u32(data_offset)?,
            entry_size: self.entry_size,
        };

        let mut output = Vec::with_capacity(data_offset + self.entries.len() * entry_size);
        let mut cursor = Cursor::new(&mut output);
        header.write(&mut cursor)?;
        for field in &self.fields {
            FieldDescriptor {
                hash: field.hash,
                mask: field.mask,
                offset: field.offset,
                shift: field.shift,
                field_type: field.field_type.to_u8(),
            }
            .write(&mut cursor)?;
        }
        output.extend_from_slice(&self.header_gap);

        let mut record = vec![0u8; entry_size];
        for entry in &self.entries {
            record.fill(0);
            for ((field, value), hint) in self
                .fields
                .iter()
                .zip(&entry.values)
                .zip(&entry.pool_hints)
            {
                encode_value(field, value, *hint, &mut record, &mut pool)?;
            }
            output.extend_from_slice(&record);
        }

        output.extend_from_slice(pool.as_bytes());
        pad_to(&mut output, FILE_ALIGNMENT, PADDING_BYTE);
        Ok(output)
    }

    /// Schema in file order
    pub fn fields(&self) -> &[BcsvField] {
        &self.fields
    }

    /// Field matching `key`
    pub fn field<'k>(&self, key: impl Into<FieldKey<'k>>) -> Option<&BcsvField> {
        let hash = key.into().hash();
        self.fields.iter().find(|field| field.hash == hash)
    }

    /// Check whether the schema has a field matching `key`
    pub fn has_field<'k>(&self, key: impl Into<FieldKey<'k>>) -> bool {
        self.field(key).is_some()
    }

    /// Entries in file order
    pub fn entries(&self) -> &[BcsvEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of one record in bytes
    pub const fn entry_size(&self) -> u32 {
        self.entry_size
    }

    /// Value of the field matching `key` in `entry`
    pub fn field_value<'a, 'k>(
        &self,
        entry: &'a BcsvEntry,
        key: impl Into<FieldKey<'k>>,
    ) -> BcsvResult<&'a FieldValue> {
        let slot = self.slot(key.into())?;
        entry
            .values
            .get(slot)
            .ok_or(BcsvError::UnknownField(self.fields[slot].hash))
    }

    /// Value of the field matching `key` in entry `index`
    pub fn value<'k>(&self, index: usize, key: impl Into<FieldKey<'k>>) -> BcsvResult<&FieldValue> {
        self.field_value(self.entry(index)?, key)
    }

    /// Replace the value of the field matching `key` in entry `index`
    pub fn set_value<'k>(
        &mut self,
        index: usize,
        key: impl Into<FieldKey<'k>>,
        value: FieldValue,
    ) -> BcsvResult<()> {
        let slot = self.slot(key.into())?;
        self.entry(index)?;
        check_value(&self.fields[slot], &value)?;

        let entry = &mut self.entries[index];
        entry.values[slot] = value;
        entry.pool_hints[slot] = None;
        Ok(())
    }

    /// Append an entry holding each field's default value
    pub fn add_entry(&mut self) -> usize {
        let values = self
            .fields
            .iter()
            .map(|field| field.field_type.default_value())
            .collect();
        self.entries.push(BcsvEntry::new(values));
        self.entries.len() - 1
    }

    /// Remove entry `index`
    pub fn remove_entry(&mut self, index: usize) -> BcsvResult<BcsvEntry> {
        self.entry(index)?;
        Ok(self.entries.remove(index))
    }

    /// Append a field after the current end of the record
    ///
    /// Every existing entry receives the type's default value.
    pub fn add_field<'k>(
        &mut self,
        key: impl Into<FieldKey<'k>>,
        field_type: FieldType,
    ) -> BcsvResult<&BcsvField> {
        let hash = key.into().hash();
        if self.has_field(hash) {
            return Err(BcsvError::DuplicateField(hash));
        }

        let size = field_type.size();
        let offset = align_up(self.entry_size as usize, size.min(4));
        let field = BcsvField::new(
            hash,
            field_type,
            u16::try_from(offset).map_err(|_| BcsvError::TableTooLarge(offset))?,
        );
        self.entry_size = to_u32(align_up(offset + size, 4))?;

        for entry in &mut self.entries {
            entry.values.push(field_type.default_value());
            entry.pool_hints.push(None);
        }
        self.header_gap.clear();
        self.fields.push(field);
        Ok(&self.fields[self.fields.len() - 1])
    }

    /// Remove the field matching `key` and its values
    ///
    /// The record size is kept; the field's bytes are written as zero.
    pub fn remove_field<'k>(&mut self, key: impl Into<FieldKey<'k>>) -> BcsvResult<BcsvField> {
        let slot = self.slot(key.into())?;
        for entry in &mut self.entries {
            entry.values.remove(slot);
            entry.pool_hints.remove(slot);
        }
        self.header_gap.clear();
        Ok(self.fields.remove(slot))
    }

    /// Column titles, using `names` to recover field names
    pub fn column_names<'n>(&self, names: &'n FieldNameTable) -> Vec<Cow<'n, str>> {
        self.fields
            .iter()
            .map(|field| names.display_name(field.hash))
            .collect()
    }

    /// Drop strings no entry references any more
    ///
    /// The pool is rebuilt from the current entries in order, so offsets
    /// change on the next [`build`](Self::build).
    pub fn rebuild_string_pool(&mut self) {
        self.pool.clear();
        for entry in &mut self.entries {
            entry.pool_hints.fill(None);
        }
    }

    fn entry(&self, index: usize) -> BcsvResult<&BcsvEntry> {
        self.entries.get(index).ok_or(BcsvError::EntryOutOfRange {
            index,
            count: self.entries.len(),
        })
    }

    fn slot(&self, key: FieldKey<'_>) -> BcsvResult<usize> {
        let hash = key.hash();
        self.fields
            .iter()
            .position(|field| field.hash == hash)
            .ok_or(BcsvError::UnknownField(hash))
    }
}

impl GalaxyFormat for BcsvTable {
    fn parse(data: &[u8]) -> Result<Self, FormatError> {
        Ok(Self::parse(data)?)
    }

    fn build(&self) -> Result<Vec<u8>, FormatError> {
        Ok(Self::build(self)?)
    }
}

fn check_field_fits(field: &BcsvField, entry_size: u32) -> BcsvResult<()> {
    let end = usize::from(field.offset) + field.field_type.size();
    if end > entry_size as usize {
        return Err(BcsvError::FieldOutOfRecord {
            hash: field.hash,
            offset: field.offset,
            entry_size,
        });
    }
    Ok(())
}

/// Check a value's type and, for integers, that it survives masking
fn check_value(field: &BcsvField, value: &FieldValue) -> BcsvResult<()> {
    if !value.matches(field.field_type) {
        return Err(BcsvError::TypeMismatch {
            hash: field.hash,
            expected: field.field_type,
        });
    }

    if let Some(raw) = integer_bits(value)
        && !field.fits(raw)
    {
        return Err(BcsvError::ValueOutOfRange {
            hash: field.hash,
            value: value.as_i64().unwrap_or_default(),
        });
    }

    if let (FieldValue::String(text), FieldType::InlineString) = (value, field.field_type) {
        let encoded = encode_string(text)?;
        if encoded.len() > INLINE_STRING_SIZE {
            return Err(BcsvError::StringTooLong {
                hash: field.hash,
                len: encoded.len(),
            });
        }
    }

    Ok(())
}

/// Raw bits of an integer value before shifting into place
fn integer_bits(value: &FieldValue) -> Option<u32> {
    match value {
        FieldValue::Int(v) => Some(*v as u32),
        FieldValue::UnsignedInt(v) => Some(*v),
        FieldValue::Short(v) => Some(u32::from(*v as u16)),
        FieldValue::Byte(v) => Some(u32::from(*v)),
        FieldValue::String(_) | FieldValue::Float(_) => None,
    }
}

fn read_be(record: &[u8], offset: usize, width: usize) -> u32 {
    record[offset..offset + width]
        .iter()
        .fold(0, |acc, &b| (acc << 8) | u32::from(b))
}

fn write_be(record: &mut [u8], offset: usize, width: usize, value: u32) {
    let bytes = value.to_be_bytes();
    record[offset..offset + width].copy_from_slice(&bytes[4 - width..]);
}

fn decode_value(
    field: &BcsvField,
    record: &[u8],
    pool: &StringPool,
) -> BcsvResult<(FieldValue, Option<u32>)> {
    let offset = usize::from(field.offset);
    let value = match field.field_type {
        FieldType::Int => FieldValue::Int(field.extract(read_be(record, offset, 4)) as i32),
        FieldType::UnsignedInt => FieldValue::UnsignedInt(field.extract(read_be(record, offset, 4))),
        FieldType::Short => {
            FieldValue::Short(field.extract(read_be(record, offset, 2)) as u16 as i16)
        }
        FieldType::Byte => FieldValue::Byte(field.extract(read_be(record, offset, 1)) as u8),
        FieldType::Float => FieldValue::Float(f32::from_bits(read_be(record, offset, 4))),
        FieldType::InlineString => {
            let bytes = &record[offset..offset + INLINE_STRING_SIZE];
            let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            FieldValue::String(sjis::decode(&bytes[..len]))
        }
        FieldType::StringOffset => {
            let string_offset = read_be(record, offset, 4);
            let text = sjis::decode(pool.get(string_offset)?);
            return Ok((FieldValue::String(text), Some(string_offset)));
        }
    };
    Ok((value, None))
}

fn encode_value(
    field: &BcsvField,
    value: &FieldValue,
    hint: Option<u32>,
    record: &mut [u8],
    pool: &mut StringPool,
) -> BcsvResult<()> {
    check_value(field, value)?;
    let offset = usize::from(field.offset);

    match (field.field_type, value) {
        (FieldType::Float, FieldValue::Float(v)) => write_be(record, offset, 4, v.to_bits()),
        (FieldType::InlineString, FieldValue::String(text)) => {
            let encoded = encode_string(text)?;
            record[offset..offset + encoded.len()].copy_from_slice(&encoded);
        }
        (FieldType::StringOffset, FieldValue::String(text)) => {
            let encoded = encode_string(text)?;
            let string_offset = pool.intern(&encoded, hint)?;
            write_be(record, offset, 4, string_offset);
        }
        (field_type, value) => {
            // Integer types; check_value guarantees the variant matches
            let width = field_type.size();
            let bits = integer_bits(value).unwrap_or_default();
            let raw = read_be(record, offset, width);
            write_be(record, offset, width, field.pack(raw, bits));
        }
    }
    Ok(())
}

fn encode_string(text: &str) -> BcsvResult<Cow<'_, [u8]>> {
    sjis::encode(text).ok_or_else(|| BcsvError::UnencodableString(text.to_string()))
}

fn to_u32(value: usize) -> BcsvResult<u32> {
    u32::try_from(value).map_err(|_| BcsvError::TableTooLarge(value))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use starbit_hash::field_name_to_hash;

    /// Table with one int field `HitPointNum` and one entry holding 5
    fn hit_point_table() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes()); // entry count
        data.extend_from_slice(&1u32.to_be_bytes()); // field count
        data.extend_from_slice(&0x1Cu32.to_be_bytes()); // data offset
        data.extend_from_slice(&4u32.to_be_bytes()); // entry size
        data.extend_from_slice(&field_name_to_hash("HitPointNum").to_be_bytes());
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        data.extend_from_slice(&[0, 0, 0, 0]); // offset, shift, type
        data.extend_from_slice(&5i32.to_be_bytes());
        data
    }

    #[test]
    fn test_hit_point_scenario() {
        let data = hit_point_table();
        assert_eq!(data.len(), 32);

        let table = BcsvTable::parse(&data).unwrap();
        let entry = &table.entries()[0];
        assert_eq!(
            table.field_value(entry, "HitPointNum").unwrap(),
            &FieldValue::Int(5)
        );
        assert_eq!(
            table.field_value(entry, field_name_to_hash("HitPointNum")).unwrap(),
            &FieldValue::Int(5)
        );

        assert_eq!(table.build().unwrap(), data);
    }

    #[test]
    fn test_unknown_field() {
        let table = BcsvTable::parse(&hit_point_table()).unwrap();
        let entry = &table.entries()[0];
        let missing = field_name_to_hash("l_id");
        assert!(matches!(
            table.field_value(entry, "l_id"),
            Err(BcsvError::UnknownField(hash)) if hash == missing
        ));
    }

    fn placement_table() -> BcsvTable {
        let mut table = BcsvTable::new();
        table.add_field("name", FieldType::StringOffset).unwrap();
        table.add_field("l_id", FieldType::Int).unwrap();
        table.add_field("pos_x", FieldType::Float).unwrap();
        table.add_field("ShapeModelNo", FieldType::Short).unwrap();
        table.add_field("CastId", FieldType::Byte).unwrap();
        table.add_field("Obj_arg0", FieldType::UnsignedInt).unwrap();
        table.add_field("DemoName", FieldType::InlineString).unwrap();

        for (i, name) in ["Kuribo", "Coin", "Kuribo"].into_iter().enumerate() {
            let row = table.add_entry();
            table
                .set_value(row, "name", FieldValue::String(name.to_string()))
                .unwrap();
            table.set_value(row, "l_id", FieldValue::Int(i as i32)).unwrap();
            table
                .set_value(row, "pos_x", FieldValue::Float(-1250.5))
                .unwrap();
            table.set_value(row, "ShapeModelNo", FieldValue::Short(-1)).unwrap();
            table.set_value(row, "CastId", FieldValue::Byte(200)).unwrap();
            table
                .set_value(row, "Obj_arg0", FieldValue::UnsignedInt(0xFFFF_FFFF))
                .unwrap();
            table
                .set_value(row, "DemoName", FieldValue::String("オープニング".to_string()))
                .unwrap();
        }
        table
    }

    #[test]
    fn test_layout_of_added_fields() {
        let table = placement_table();
        let offsets: Vec<u16> = table.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 12, 16, 20, 24]);
        assert_eq!(table.entry_size(), 56);
    }

    #[test]
    fn test_round_trip_all_types() {
        let table = placement_table();
        crate::assert_round_trip!(table);

        let data = table.build().unwrap();
        assert_eq!(data.len() % FILE_ALIGNMENT, 0);

        // Both "Kuribo" rows share one pool string
        let pool_start = HEADER_SIZE + 7 * FIELD_SIZE + 3 * 56;
        assert!(data[pool_start..].starts_with(b"Kuribo\0Coin\0"));
        assert!(data[pool_start + 12..].iter().all(|&b| b == PADDING_BYTE));
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let data = placement_table().build().unwrap();
        crate::test_utils::test_byte_round_trip::<BcsvTable>(&data).unwrap();
    }

    #[test]
    fn test_records_after_padding_gap_kept_in_place() {
        let mut data = placement_table().build().unwrap();
        let fields_end = HEADER_SIZE + 7 * FIELD_SIZE;
        let data_offset = u32::try_from(fields_end + FILE_ALIGNMENT).unwrap();
        data[8..12].copy_from_slice(&data_offset.to_be_bytes());
        data.splice(fields_end..fields_end, [0u8; FILE_ALIGNMENT]);

        let mut table = BcsvTable::parse(&data).unwrap();
        assert_eq!(table, BcsvTable::parse(&placement_table().build().unwrap()).unwrap());
        assert_eq!(table.build().unwrap(), data);

        // A schema change packs the records right after the descriptors again
        table.add_field("CameraSetId", FieldType::Int).unwrap();
        let rebuilt = table.build().unwrap();
        let packed = HEADER_SIZE + 8 * FIELD_SIZE;
        assert_eq!(rebuilt[8..12], u32::try_from(packed).unwrap().to_be_bytes());
        assert_eq!(BcsvTable::parse(&rebuilt).unwrap(), table);
    }

    #[test]
    fn test_existing_pool_offsets_kept() {
        let data = placement_table().build().unwrap();
        let mut table = BcsvTable::parse(&data).unwrap();
        table
            .set_value(1, "name", FieldValue::String("Kinopio".to_string()))
            .unwrap();

        let rebuilt = table.build().unwrap();
        let pool_start = HEADER_SIZE + 7 * FIELD_SIZE + 3 * 56;
        // The unused "Coin" stays and the new string is appended
        assert!(rebuilt[pool_start..].starts_with(b"Kuribo\0Coin\0Kinopio\0"));

        table.rebuild_string_pool();
        let compacted = table.build().unwrap();
        assert!(compacted[pool_start..].starts_with(b"Kuribo\0Kinopio\0@"));
        assert_eq!(BcsvTable::parse(&compacted).unwrap(), table);
    }

    #[test]
    fn test_bitfield_fields_share_bytes() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&0x28u32.to_be_bytes());
        data.extend_from_slice(&4u32.to_be_bytes());
        // Low byte and second byte of the same word
        data.extend_from_slice(&0x1111_1111u32.to_be_bytes());
        data.extend_from_slice(&0x0000_00FFu32.to_be_bytes());
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(&0x2222_2222u32.to_be_bytes());
        data.extend_from_slice(&0x0000_FF00u32.to_be_bytes());
        data.extend_from_slice(&[0, 0, 8, 0]);
        data.extend_from_slice(&0x0000_3412u32.to_be_bytes());
        data.resize(0x40, PADDING_BYTE);

        let mut table = BcsvTable::parse(&data).unwrap();
        assert_eq!(table.value(0, 0x1111_1111_u32).unwrap(), &FieldValue::Int(0x12));
        assert_eq!(table.value(0, 0x2222_2222_u32).unwrap(), &FieldValue::Int(0x34));
        assert_eq!(table.build().unwrap(), data);

        assert!(matches!(
            table.set_value(0, 0x2222_2222_u32, FieldValue::Int(0x100)),
            Err(BcsvError::ValueOutOfRange { value: 0x100, .. })
        ));
        table
            .set_value(0, 0x2222_2222_u32, FieldValue::Int(0xAB))
            .unwrap();
        let rebuilt = table.build().unwrap();
        assert_eq!(&rebuilt[0x28..0x2C], &[0x00, 0x00, 0xAB, 0x12]);
    }

    #[test]
    fn test_float_bits_preserved() {
        let mut table = BcsvTable::new();
        table.add_field("pos_y", FieldType::Float).unwrap();
        let row = table.add_entry();
        let odd = f32::from_bits(0x3DCC_CCCD); // 0.1
        table.set_value(row, "pos_y", FieldValue::Float(odd)).unwrap();

        let data = table.build().unwrap();
        assert_eq!(&data[0x1C..0x20], &[0x3D, 0xCC, 0xCC, 0xCD]);
        assert_eq!(table.value(0, "pos_y").unwrap().display(), "0.100");
    }

    #[test]
    fn test_type_mismatch_and_ranges() {
        let mut table = placement_table();
        assert!(matches!(
            table.set_value(0, "l_id", FieldValue::Float(1.0)),
            Err(BcsvError::TypeMismatch {
                expected: FieldType::Int,
                ..
            })
        ));
        assert!(matches!(
            table.set_value(9, "l_id", FieldValue::Int(1)),
            Err(BcsvError::EntryOutOfRange { index: 9, count: 3 })
        ));
        assert!(matches!(
            table.set_value(0, "DemoName", FieldValue::String("x".repeat(33))),
            Err(BcsvError::StringTooLong { len: 33, .. })
        ));
        assert!(matches!(
            table.add_field("name", FieldType::Int),
            Err(BcsvError::DuplicateField(_))
        ));
    }

    #[test]
    fn test_remove_field_and_entry() {
        let mut table = placement_table();
        let removed = table.remove_field("pos_x").unwrap();
        assert_eq!(removed.field_type, FieldType::Float);
        assert!(!table.has_field("pos_x"));
        assert_eq!(table.entries()[0].values().len(), 6);

        table.remove_entry(0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.value(0, "name").unwrap(),
            &FieldValue::String("Coin".to_string())
        );

        crate::assert_round_trip!(table);
    }

    #[test]
    fn test_column_names() {
        let mut names = FieldNameTable::empty();
        names.add("l_id");
        let table = placement_table();
        let columns = table.column_names(&names);
        assert_eq!(columns[1], "l_id");
        assert_eq!(
            columns[0],
            format!("[{:08X}]", field_name_to_hash("name"))
        );
    }

    #[test]
    fn test_corrupt_tables_rejected() {
        let data = hit_point_table();

        crate::assert_invalid_data_rejected!(BcsvTable, &data[..8]);

        let mut bad_count = data.clone();
        bad_count[0..4].copy_from_slice(&100u32.to_be_bytes());
        assert!(matches!(
            BcsvTable::parse(&bad_count),
            Err(BcsvError::Truncated { .. })
        ));

        let mut bad_type = data.clone();
        bad_type[0x1B] = 9;
        assert!(matches!(
            BcsvTable::parse(&bad_type),
            Err(BcsvError::UnknownFieldType(9))
        ));

        let mut bad_offset = data.clone();
        bad_offset[0x19] = 4;
        assert!(matches!(
            BcsvTable::parse(&bad_offset),
            Err(BcsvError::FieldOutOfRecord { offset: 4, .. })
        ));

        // String offset field pointing past the pool
        let mut bad_string = data;
        bad_string[0x1B] = 6;
        assert!(matches!(
            BcsvTable::parse(&bad_string),
            Err(BcsvError::StringOffsetOutOfPool { offset: 5, .. })
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn values_survive_build(
                rows in prop::collection::vec(
                    (any::<i32>(), any::<u32>(), any::<i16>(), any::<u8>(), "[a-zA-Z0-9_]{0,12}"),
                    0..16,
                )
            ) {
                let mut table = BcsvTable::new();
                table.add_field("l_id", FieldType::Int).unwrap();
                table.add_field("Obj_arg0", FieldType::UnsignedInt).unwrap();
                table.add_field("ShapeModelNo", FieldType::Short).unwrap();
                table.add_field("CastId", FieldType::Byte).unwrap();
                table.add_field("name", FieldType::StringOffset).unwrap();

                for (int, uint, short, byte, name) in rows {
                    let row = table.add_entry();
                    table.set_value(row, "l_id", FieldValue::Int(int)).unwrap();
                    table.set_value(row, "Obj_arg0", FieldValue::UnsignedInt(uint)).unwrap();
                    table.set_value(row, "ShapeModelNo", FieldValue::Short(short)).unwrap();
                    table.set_value(row, "CastId", FieldValue::Byte(byte)).unwrap();
                    table.set_value(row, "name", FieldValue::String(name)).unwrap();
                }

                let data = table.build().unwrap();
                let parsed = BcsvTable::parse(&data).unwrap();
                prop_assert_eq!(&parsed, &table);
                prop_assert_eq!(parsed.build().unwrap(), data);
            }
        }
    }
}
