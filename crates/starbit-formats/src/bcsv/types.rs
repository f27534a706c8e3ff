//! BCSV field types, values, and keys

use std::fmt;

use super::error::{BcsvError, BcsvResult};

/// Length of an inline string field
pub const INLINE_STRING_SIZE: usize = 32;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Signed 32-bit integer
    Int,
    /// 32-byte inline Shift-JIS string
    InlineString,
    /// 32-bit IEEE-754 float
    Float,
    /// Unsigned 32-bit integer
    UnsignedInt,
    /// Signed 16-bit integer
    Short,
    /// Unsigned 8-bit integer
    Byte,
    /// 32-bit offset into the string pool
    StringOffset,
}

impl FieldType {
    /// Decode the type byte of a field descriptor
    pub fn from_u8(value: u8) -> BcsvResult<Self> {
        match value {
            0 => Ok(Self::Int),
            1 => Ok(Self::InlineString),
            2 => Ok(Self::Float),
            3 => Ok(Self::UnsignedInt),
            4 => Ok(Self::Short),
            5 => Ok(Self::Byte),
            6 => Ok(Self::StringOffset),
            other => Err(BcsvError::UnknownFieldType(other)),
        }
    }

    /// Type byte written to the field descriptor
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Int => 0,
            Self::InlineString => 1,
            Self::Float => 2,
            Self::UnsignedInt => 3,
            Self::Short => 4,
            Self::Byte => 5,
            Self::StringOffset => 6,
        }
    }

    /// Bytes occupied in a record
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Int | Self::Float | Self::UnsignedInt | Self::StringOffset => 4,
            Self::InlineString => INLINE_STRING_SIZE,
            Self::Short => 2,
            Self::Byte => 1,
        }
    }

    /// Mask covering the whole value
    #[must_use]
    pub const fn full_mask(self) -> u32 {
        match self {
            Self::Short => 0xFFFF,
            Self::Byte => 0xFF,
            _ => 0xFFFF_FFFF,
        }
    }

    /// Whether values of this type go through mask and shift
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::UnsignedInt | Self::Short | Self::Byte)
    }

    /// Value a new entry gets for a field of this type
    #[must_use]
    pub fn default_value(self) -> FieldValue {
        match self {
            Self::Int => FieldValue::Int(0),
            Self::InlineString | Self::StringOffset => FieldValue::String(String::new()),
            Self::Float => FieldValue::Float(0.0),
            Self::UnsignedInt => FieldValue::UnsignedInt(0),
            Self::Short => FieldValue::Short(0),
            Self::Byte => FieldValue::Byte(0),
        }
    }
}

/// Decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Signed 32-bit integer
    Int(i32),
    /// Inline or pooled string
    String(String),
    /// Raw 32-bit float
    Float(f32),
    /// Unsigned 32-bit integer
    UnsignedInt(u32),
    /// Signed 16-bit integer
    Short(i16),
    /// Unsigned byte
    Byte(u8),
}

impl FieldValue {
    /// Check whether this value can be stored in a field of `field_type`
    #[must_use]
    pub const fn matches(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Self::Int(_), FieldType::Int)
                | (
                    Self::String(_),
                    FieldType::InlineString | FieldType::StringOffset
                )
                | (Self::Float(_), FieldType::Float)
                | (Self::UnsignedInt(_), FieldType::UnsignedInt)
                | (Self::Short(_), FieldType::Short)
                | (Self::Byte(_), FieldType::Byte)
        )
    }

    /// Integer value widened to `i64`, `None` for strings and floats
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::UnsignedInt(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::Byte(v) => Some(i64::from(*v)),
            Self::String(_) | Self::Float(_) => None,
        }
    }

    /// String contents, `None` for numeric values
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text shown to the user
    ///
    /// Floats are truncated, not rounded, to three decimals. This is only a
    /// presentation; the stored value keeps its exact bits.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Float(v) => {
                let truncated = (f64::from(*v) * 1000.0).trunc() / 1000.0;
                format!("{truncated:.3}")
            }
            Self::Int(v) => v.to_string(),
            Self::UnsignedInt(v) => v.to_string(),
            Self::Short(v) => v.to_string(),
            Self::Byte(v) => v.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Field schema entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BcsvField {
    /// JMap hash of the field name
    pub hash: u32,
    /// Bit mask, applied in place before shifting
    pub mask: u32,
    /// Byte offset within the record
    pub offset: u16,
    /// Right shift applied after masking
    pub shift: u8,
    /// Declared type
    pub field_type: FieldType,
}

impl BcsvField {
    /// Field covering a whole value of `field_type` at `offset`
    pub fn new(hash: u32, field_type: FieldType, offset: u16) -> Self {
        Self {
            hash,
            mask: field_type.full_mask(),
            offset,
            shift: 0,
            field_type,
        }
    }

    /// Extract this field's bits from a raw value
    #[must_use]
    pub fn extract(&self, raw: u32) -> u32 {
        (raw & self.mask)
            .checked_shr(u32::from(self.shift))
            .unwrap_or(0)
    }

    /// Merge `value` into the bits of `raw` covered by this field
    #[must_use]
    pub fn pack(&self, raw: u32, value: u32) -> u32 {
        let shifted = value.checked_shl(u32::from(self.shift)).unwrap_or(0);
        (raw & !self.mask) | (shifted & self.mask)
    }

    /// Whether `value` survives packing unchanged
    #[must_use]
    pub fn fits(&self, value: u32) -> bool {
        self.extract(self.pack(0, value)) == value
    }
}

/// Field lookup key: a name that is hashed, or a precomputed hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey<'a> {
    /// Plain field name
    Name(&'a str),
    /// JMap hash
    Hash(u32),
}

impl FieldKey<'_> {
    /// Hash used for the schema lookup
    #[must_use]
    pub fn hash(&self) -> u32 {
        match self {
            Self::Name(name) => starbit_hash::field_name_to_hash(name),
            Self::Hash(hash) => *hash,
        }
    }
}

impl<'a> From<&'a str> for FieldKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for FieldKey<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl From<u32> for FieldKey<'_> {
    fn from(hash: u32) -> Self {
        Self::Hash(hash)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_bytes() {
        for byte in 0..=6 {
            assert_eq!(FieldType::from_u8(byte).unwrap().to_u8(), byte);
        }
        assert!(matches!(
            FieldType::from_u8(7),
            Err(BcsvError::UnknownFieldType(7))
        ));
    }

    #[test]
    fn test_masked_extract_and_pack() {
        let field = BcsvField {
            hash: 0,
            mask: 0x0000_FF00,
            offset: 0,
            shift: 8,
            field_type: FieldType::Int,
        };

        assert_eq!(field.extract(0x1234_5678), 0x56);
        assert_eq!(field.pack(0x1234_5678, 0xAB), 0x1234_AB78);
        assert!(field.fits(0xFF));
        assert!(!field.fits(0x100));
    }

    #[test]
    fn test_shift_past_width() {
        let field = BcsvField {
            hash: 0,
            mask: u32::MAX,
            offset: 0,
            shift: 40,
            field_type: FieldType::Int,
        };
        assert_eq!(field.extract(u32::MAX), 0);
        assert_eq!(field.pack(0, 1), 0);
    }

    #[test]
    fn test_float_display_truncates() {
        assert_eq!(FieldValue::Float(1.0).display(), "1.000");
        assert_eq!(FieldValue::Float(2.9999).display(), "2.999");
        assert_eq!(FieldValue::Float(-0.5006).display(), "-0.500");
        assert_eq!(FieldValue::Int(-3).to_string(), "-3");
        assert_eq!(FieldValue::String("Kuribo".into()).display(), "Kuribo");
    }

    #[test]
    fn test_field_key_hash() {
        let by_name = FieldKey::from("HitPointNum");
        let by_hash = FieldKey::from(0x6116_9069_u32);
        assert_eq!(by_name.hash(), by_hash.hash());
    }

    #[test]
    fn test_value_type_matching() {
        assert!(FieldValue::String(String::new()).matches(FieldType::StringOffset));
        assert!(FieldValue::String(String::new()).matches(FieldType::InlineString));
        assert!(!FieldValue::Int(0).matches(FieldType::UnsignedInt));
        assert_eq!(FieldValue::Short(-2).as_i64(), Some(-2));
        assert_eq!(FieldValue::Float(1.5).as_i64(), None);
    }
}
