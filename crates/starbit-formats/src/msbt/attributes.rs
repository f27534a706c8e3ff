//! Per-message attribute records (ATR1)

use binrw::{BinRead, BinWrite};

/// Size of one attribute record
pub const ATTRIBUTE_SIZE: u32 = 12;

/// How a message is triggered in game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriggerKind {
    /// Shown when the player talks to the speaker
    #[default]
    Talk,
    /// Shouted when the player comes near
    Shout,
    /// Shown automatically
    Auto,
    /// Not tied to a speaker
    Global,
    /// Value not known to this crate
    Unknown(u8),
}

impl TriggerKind {
    /// Decode the attribute byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Talk,
            1 => Self::Shout,
            2 => Self::Auto,
            3 => Self::Global,
            other => Self::Unknown(other),
        }
    }

    /// Encode as the attribute byte
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Talk => 0,
            Self::Shout => 1,
            Self::Auto => 2,
            Self::Global => 3,
            Self::Unknown(value) => value,
        }
    }
}

/// Attributes stored alongside each message
///
/// The 16- and 32-bit fields follow the file's byte order, so the record
/// is read with [`BinRead::read_options`] and the container's endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
pub struct MessageAttributes {
    /// Voice or sound effect played with the message
    pub sound_id: u8,
    /// Camera behaviour while the message is shown
    pub camera_type: u8,
    /// How the message is triggered
    #[br(map = TriggerKind::from_u8)]
    #[bw(map = |kind: &TriggerKind| kind.to_u8())]
    pub trigger: TriggerKind,
    /// Message window style
    pub window_type: u8,
    /// Camera id used with `camera_type`
    pub camera_id: u16,
    /// Area the message is restricted to
    pub area_id: u8,
    /// Unidentified byte, kept as read
    pub unknown: u8,
    /// Trailing word, usually an offset into the attribute string pool
    pub extra: u32,
}
