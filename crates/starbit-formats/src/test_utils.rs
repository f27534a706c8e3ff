//! Test utilities for format round-trip testing
//!
//! Shared helpers used by the format test modules.

use crate::{FormatError, GalaxyFormat};
use std::fmt::Debug;

/// Build a value, parse it back, and require the result to be equal
pub fn test_round_trip<T>(original: &T) -> Result<(), FormatError>
where
    T: GalaxyFormat + PartialEq + Debug,
{
    let data = original.build()?;
    let parsed = T::parse(&data)?;

    if original != &parsed {
        return Err(format!(
            "Round-trip verification failed:\nOriginal: {:?}\nParsed: {:?}",
            original, parsed
        )
        .into());
    }

    Ok(())
}

/// Parse binary data, rebuild it, and require identical bytes
pub fn test_byte_round_trip<T>(data: &[u8]) -> Result<(), FormatError>
where
    T: GalaxyFormat,
{
    T::verify_round_trip(data)
}

/// Require parsing of `invalid_data` to fail
pub fn test_invalid_data_rejected<T>(invalid_data: &[u8]) -> Result<(), FormatError>
where
    T: GalaxyFormat,
{
    match T::parse(invalid_data) {
        Ok(_) => Err("Expected parsing to fail for invalid data, but it succeeded".into()),
        Err(_) => Ok(()),
    }
}

/// Assert that a format value survives build then parse
#[macro_export]
macro_rules! assert_round_trip {
    ($value:expr) => {
        $crate::test_utils::test_round_trip(&$value).expect("Round-trip should succeed")
    };
}

/// Assert that invalid data is rejected by a format parser
#[macro_export]
macro_rules! assert_invalid_data_rejected {
    ($type:ty, $data:expr) => {
        $crate::test_utils::test_invalid_data_rejected::<$type>($data)
            .expect("Invalid data should be rejected")
    };
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Word {
        value: u32,
    }

    impl GalaxyFormat for Word {
        fn parse(data: &[u8]) -> Result<Self, FormatError> {
            let bytes: [u8; 4] = data.try_into().map_err(|_| "Invalid data length")?;
            Ok(Word {
                value: u32::from_be_bytes(bytes),
            })
        }

        fn build(&self) -> Result<Vec<u8>, FormatError> {
            Ok(self.value.to_be_bytes().to_vec())
        }
    }

    #[test]
    fn test_round_trip_utility() {
        test_round_trip(&Word { value: 42 }).expect("Round-trip should succeed");
    }

    #[test]
    fn test_byte_round_trip_utility() {
        test_byte_round_trip::<Word>(&[0, 0, 0, 7]).expect("Byte round-trip should succeed");
    }

    #[test]
    fn test_invalid_data_rejected_utility() {
        test_invalid_data_rejected::<Word>(&[1, 2]).expect("Should reject invalid data");
    }
}
