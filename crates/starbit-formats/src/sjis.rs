//! Shift-JIS helpers shared by RARC names and BCSV strings

use encoding_rs::SHIFT_JIS;
use std::borrow::Cow;

/// Decode Shift-JIS bytes, replacing invalid sequences
pub(crate) fn decode(bytes: &[u8]) -> String {
    if bytes.is_ascii() {
        // ASCII is a subset of Shift-JIS apart from 0x5C/0x7E, which the
        // games treat as ASCII as well
        return String::from_utf8_lossy(bytes).into_owned();
    }

    let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!("Invalid Shift-JIS sequence replaced while decoding {:02X?}", bytes);
    }
    text.into_owned()
}

/// Encode text as Shift-JIS, or `None` if it contains unmappable characters
pub(crate) fn encode(text: &str) -> Option<Cow<'_, [u8]>> {
    if text.is_ascii() {
        return Some(Cow::Borrowed(text.as_bytes()));
    }

    let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
    if had_errors { None } else { Some(bytes) }
}
