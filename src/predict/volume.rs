//! Mapping from three predicted digits to a playback volume.

use crate::classifier::Digit;
use crate::SLOT_COUNT;

/// Highest volume value; anything above is clamped to it.
pub const MAX_VOLUME: u16 = 100;

/// Playback volume in [0, 100].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Volume {
    value: u16,
}

impl Volume {
    /// Silence, shown before any prediction and after a reset.
    pub const ZERO: Volume = Volume { value: 0 };

    /// Reads the digits in slot order as a base-10 number, clamped to 100.
    pub fn from_digits(digits: [Digit; SLOT_COUNT]) -> Self {
        let number = digits
            .iter()
            .fold(0u16, |acc, d| acc * 10 + d.value() as u16);
        Self {
            value: number.min(MAX_VOLUME),
        }
    }

    /// Clamped integer percentage.
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Display form, zero-padded to three characters ("007").
    pub fn display_text(&self) -> String {
        format!("{:03}", self.value)
    }

    /// Height of the fill indicator, in percent.
    pub fn fill_percent(&self) -> u16 {
        self.value
    }

    /// Playback gain in [0.0, 1.0].
    pub fn gain(&self) -> f32 {
        self.value as f32 / 100.0
    }
}
