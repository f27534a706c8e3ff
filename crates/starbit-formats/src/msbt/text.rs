//! Message text with embedded control sequences

use std::fmt;

use super::error::MalformedMessage;

/// Code unit that starts a control sequence
pub const CONTROL_ESCAPE: u16 = 0x000E;

/// Raw UTF-16 message text
///
/// The text is stored exactly as it appears in the file (minus the null
/// terminator). Control sequences such as colour changes, pauses, and
/// icons are kept verbatim; [`segments`](Self::segments) tokenizes them
/// without assigning any meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct MessageText {
    units: Vec<u16>,
}

/// One piece of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Run of ordinary code units
    Text(&'a [u16]),
    /// Control sequence: `0x000E group tag size params`
    Control {
        /// Tag group
        group: u16,
        /// Tag within the group
        tag: u16,
        /// Parameter units
        params: &'a [u16],
    },
}

impl MessageText {
    /// Wrap raw code units
    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// Raw code units without the terminator
    #[must_use]
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Check whether the message is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Split into plain text runs and control sequences
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            units: &self.units,
            pos: 0,
        }
    }

    /// Plain text with control sequences rendered as `[group:tag]`
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        let mut output = String::new();
        for segment in self.segments() {
            match segment {
                Segment::Text(units) => output.push_str(&String::from_utf16_lossy(units)),
                Segment::Control { group, tag, .. } => {
                    output.push_str(&format!("[{group}:{tag}]"));
                }
            }
        }
        output
    }

    /// Decode a message from `units`, stopping at its terminator
    ///
    /// Control sequence parameters are skipped while looking for the
    /// terminator, since they may contain zero units.
    pub(crate) fn scan(units: &[u16]) -> Result<Self, MalformedMessage> {
        let mut pos = 0;
        while let Some(&unit) = units.get(pos) {
            match unit {
                0 => return Ok(Self::from_units(units[..pos].to_vec())),
                CONTROL_ESCAPE => pos = control_end(units, pos)?,
                _ => pos += 1,
            }
        }
        Err(MalformedMessage::Unterminated)
    }
}

impl From<&str> for MessageText {
    fn from(text: &str) -> Self {
        Self::from_units(text.encode_utf16().collect())
    }
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Iterator returned by [`MessageText::segments`]
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    units: &'a [u16],
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        let units = self.units;
        if start >= units.len() {
            return None;
        }

        if units[start] == CONTROL_ESCAPE {
            if let Ok(end) = control_end(units, start) {
                self.pos = end;
                return Some(Segment::Control {
                    group: units[start + 1],
                    tag: units[start + 2],
                    params: &units[start + 4..end],
                });
            }
            // A broken trailing sequence is reported as text
            self.pos = units.len();
            return Some(Segment::Text(&units[start..]));
        }

        let end = units[start..]
            .iter()
            .position(|&unit| unit == CONTROL_ESCAPE)
            .map_or(units.len(), |offset| start + offset);
        self.pos = end;
        Some(Segment::Text(&units[start..end]))
    }
}

/// Index just past the control sequence starting at `pos`
fn control_end(units: &[u16], pos: usize) -> Result<usize, MalformedMessage> {
    let size = *units
        .get(pos + 3)
        .ok_or(MalformedMessage::TruncatedControl(pos))?;
    if size % 2 != 0 {
        return Err(MalformedMessage::OddControlSize {
            position: pos,
            size,
        });
    }

    let end = pos + 4 + usize::from(size / 2);
    if end > units.len() {
        return Err(MalformedMessage::TruncatedControl(pos));
    }
    Ok(end)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn units(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_scan_plain() {
        let mut data = units("Hello");
        data.push(0);
        data.extend(units("ignored"));

        let text = MessageText::scan(&data).unwrap();
        assert_eq!(text.to_string(), "Hello");
        assert_eq!(text.units().len(), 5);
    }

    #[test]
    fn test_scan_skips_control_params() {
        // Control sequence whose parameter is a zero unit
        let mut data = units("A");
        data.extend([CONTROL_ESCAPE, 1, 0, 2, 0]);
        data.extend(units("B"));
        data.push(0);

        let text = MessageText::scan(&data).unwrap();
        assert_eq!(text.units().len(), 7);
        assert_eq!(text.to_string_lossy(), "A[1:0]B");

        let segments: Vec<_> = text.segments().collect();
        assert_eq!(
            segments,
            vec![
                Segment::Text(&data[..1]),
                Segment::Control {
                    group: 1,
                    tag: 0,
                    params: &[0],
                },
                Segment::Text(&data[6..7]),
            ]
        );
    }

    #[test]
    fn test_scan_errors() {
        assert_eq!(
            MessageText::scan(&units("open")),
            Err(MalformedMessage::Unterminated)
        );
        assert_eq!(
            MessageText::scan(&[CONTROL_ESCAPE, 0]),
            Err(MalformedMessage::TruncatedControl(0))
        );
        assert_eq!(
            MessageText::scan(&[CONTROL_ESCAPE, 0, 0, 3, 0, 0, 0]),
            Err(MalformedMessage::OddControlSize {
                position: 0,
                size: 3
            })
        );
        assert_eq!(
            MessageText::scan(&[CONTROL_ESCAPE, 0, 0, 8, 0]),
            Err(MalformedMessage::TruncatedControl(0))
        );
    }

    #[test]
    fn test_broken_control_renders_as_text() {
        let text = MessageText::from_units(vec![u16::from(b'x'), CONTROL_ESCAPE, 1]);
        let segments: Vec<_> = text.segments().collect();
        assert_eq!(segments.len(), 2);
        assert!(matches!(segments[1], Segment::Text(units) if units.len() == 2));
    }

    #[test]
    fn test_from_str() {
        let text = MessageText::from("ようこそ");
        assert_eq!(text.units().len(), 4);
        assert_eq!(text.to_string(), "ようこそ");
        assert!(MessageText::default().is_empty());
    }
}
