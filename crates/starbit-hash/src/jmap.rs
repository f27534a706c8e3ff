//! JMap field name hash
//!
//! Each BCSV column is identified by this hash of its name. The game hashes
//! the Shift-JIS bytes of the name as C `char` (signed 8-bit), multiplying
//! the running value by 31 for every byte.

use encoding_rs::SHIFT_JIS;

/// Multiplier applied for each byte of the name
const MULTIPLIER: u32 = 31;

/// Compute the JMap hash of a field name
///
/// Pure and total: every string hashes, collisions are possible and are
/// left to name tables to disambiguate.
///
/// # Examples
///
/// ```
/// use starbit_hash::jmap::hash;
///
/// assert_eq!(hash(""), 0);
/// assert_eq!(hash("a"), 0x61);
/// assert_eq!(hash("HitPointNum"), 0x6116_9069);
/// ```
pub fn hash(name: &str) -> u32 {
    if name.is_ascii() {
        return hash_bytes(name.as_bytes());
    }

    let (encoded, _, _) = SHIFT_JIS.encode(name);
    hash_bytes(&encoded)
}

/// Compute the JMap hash over raw name bytes
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| {
        // Sign extension matches the game's `char` arithmetic
        acc.wrapping_mul(MULTIPLIER)
            .wrapping_add(i32::from(b as i8) as u32)
    })
}

/// Alias used by tooling that computes hashes for arbitrary field names
pub fn field_name_to_hash(name: &str) -> u32 {
    hash(name)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hashes() {
        assert_eq!(hash("name"), 0x0033_7A8B);
        assert_eq!(hash("l_id"), 0x0032_89CE);
        assert_eq!(hash("pos_x"), 0x065E_794D);
        assert_eq!(hash("ScenarioNo"), 0xED08_B591);
        assert_eq!(hash("HitPointNum"), 0x6116_9069);
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(hash(""), 0);
    }

    #[test]
    fn test_shift_jis_names_use_signed_bytes() {
        assert_eq!(hash("テスト"), 0x3009_E97B);
    }

    #[test]
    fn test_alias_matches() {
        for name in ["name", "Obj_arg0", "ShapeModelNo", ""] {
            assert_eq!(field_name_to_hash(name), hash(name));
        }
    }

    #[test]
    fn test_bytes_match_str() {
        assert_eq!(hash_bytes(b"ScenarioNo"), hash("ScenarioNo"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hash_is_deterministic(name in ".{0,64}") {
                prop_assert_eq!(hash(&name), hash(&name));
            }

            #[test]
            fn ascii_hash_folds_bytes(name in "[ -~]{0,32}") {
                let expected = name
                    .bytes()
                    .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
                prop_assert_eq!(hash(&name), expected);
            }
        }
    }
}
