//! String pool following the records

use super::error::{BcsvError, BcsvResult};

/// Null-terminated Shift-JIS strings referenced by string offset fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StringPool {
    bytes: Vec<u8>,
}

impl StringPool {
    /// Wrap pool bytes read from a file
    pub(crate) const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn clear(&mut self) {
        self.bytes.clear();
    }

    /// String starting at `offset`, without its terminator
    pub(crate) fn get(&self, offset: u32) -> BcsvResult<&[u8]> {
        let tail = self
            .bytes
            .get(offset as usize..)
            .filter(|tail| !tail.is_empty())
            .ok_or(BcsvError::StringOffsetOutOfPool {
                offset,
                pool_size: self.bytes.len(),
            })?;
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(BcsvError::UnterminatedString(offset))?;
        Ok(&tail[..len])
    }

    /// Offset of `text`, reusing `hint` or an existing copy before appending
    pub(crate) fn intern(&mut self, text: &[u8], hint: Option<u32>) -> BcsvResult<u32> {
        if let Some(offset) = hint
            && self.get(offset).is_ok_and(|existing| existing == text)
        {
            return Ok(offset);
        }

        if let Some(offset) = self.find(text) {
            return Ok(offset);
        }

        let offset = u32::try_from(self.bytes.len())
            .map_err(|_| BcsvError::TableTooLarge(self.bytes.len()))?;
        self.bytes.extend_from_slice(text);
        self.bytes.push(0);
        Ok(offset)
    }

    /// First offset at which `text` followed by a terminator starts
    fn find(&self, text: &[u8]) -> Option<u32> {
        let needed = text.len() + 1;
        self.bytes
            .windows(needed)
            .position(|window| window[..text.len()] == *text && window[text.len()] == 0)
            .and_then(|offset| u32::try_from(offset).ok())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_get() {
        let pool = StringPool::from_bytes(b"Kuribo\0Coin\0".to_vec());
        assert_eq!(pool.get(0).unwrap(), b"Kuribo");
        assert_eq!(pool.get(7).unwrap(), b"Coin");
        // Offsets into the middle of a string are valid
        assert_eq!(pool.get(4).unwrap(), b"bo");
        assert!(matches!(
            pool.get(12),
            Err(BcsvError::StringOffsetOutOfPool { offset: 12, .. })
        ));
        assert!(matches!(
            StringPool::from_bytes(b"abc".to_vec()).get(0),
            Err(BcsvError::UnterminatedString(0))
        ));
    }

    #[test]
    fn test_intern_deduplicates() {
        let mut pool = StringPool::from_bytes(b"Kuribo\0".to_vec());
        assert_eq!(pool.intern(b"Kuribo", None).unwrap(), 0);
        assert_eq!(pool.intern(b"bo", None).unwrap(), 4);

        let coin = pool.intern(b"Coin", None).unwrap();
        assert_eq!(coin, 7);
        assert_eq!(pool.intern(b"Coin", None).unwrap(), coin);
        assert_eq!(pool.as_bytes(), b"Kuribo\0Coin\0");
    }

    #[test]
    fn test_intern_prefers_hint() {
        let mut pool = StringPool::from_bytes(b"A\0A\0".to_vec());
        assert_eq!(pool.intern(b"A", Some(2)).unwrap(), 2);
        assert_eq!(pool.intern(b"A", None).unwrap(), 0);
        // A stale hint falls back to searching
        assert_eq!(pool.intern(b"A", Some(100)).unwrap(), 0);
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::default();
        assert_eq!(pool.intern(b"", None).unwrap(), 0);
        assert_eq!(pool.as_bytes(), b"\0");
        assert_eq!(pool.get(0).unwrap(), b"");
    }
}
