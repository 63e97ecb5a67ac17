//! Decoded AG-980 status model
//!
//! A [`StatusFrame`] is an immutable snapshot of everything the receiver
//! reports in reply to a status request. It is produced by
//! [`decode_status`](crate::frame::decode_status) and never mutated
//! afterwards; a new request produces a new frame.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Length of the front panel display text carried in a status frame
pub const DISPLAY_TEXT_LEN: usize = 10;

/// Highest raw volume value the receiver reports (+14 dB)
pub const MAX_VOLUME: u8 = 90;

/// Raw volume value corresponding to 0 dB
const VOLUME_ZERO_DB: i16 = 76;

/// Status byte flags (byte 13 of the status frame)
pub mod status_bits {
    /// Main zone powered
    pub const POWER: u8 = 0x01;
    /// Receiver is requesting attention from the controller
    pub const COMMAND_REQUEST: u8 = 0x02;
    /// Zone 2 powered
    pub const ZONE2_POWER: u8 = 0x04;
    /// Main zone muted
    pub const MUTE: u8 = 0x08;
    /// Zone 2 muted
    pub const ZONE2_MUTE: u8 = 0x10;
    /// Sleep timer active
    pub const SLEEP_MODE: u8 = 0x20;
    /// Cinema EQ enabled
    pub const CINEMA_EQ: u8 = 0x40;
    /// Tone controls bypassed
    pub const TONE_DIRECT: u8 = 0x80;
}

/// Input sources selectable on the AG-980
///
/// Code 1 is reserved by the receiver and has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum InputSource {
    /// FM tuner
    Fm = 0x00,
    /// Tuner (last band)
    Tuner = 0x02,
    /// AM tuner
    TunerAm = 0x03,
    /// CD
    Cd = 0x04,
    /// Auxiliary
    Aux = 0x05,
    /// Phono
    Phono = 0x06,
    /// DVD
    Dvd = 0x07,
    /// Tape
    Tape = 0x08,
}

impl InputSource {
    /// Every defined input, in code order
    pub const ALL: [InputSource; 8] = [
        InputSource::Fm,
        InputSource::Tuner,
        InputSource::TunerAm,
        InputSource::Cd,
        InputSource::Aux,
        InputSource::Phono,
        InputSource::Dvd,
        InputSource::Tape,
    ];

    /// Wire code of this input
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up an input by its wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Fm),
            0x02 => Some(Self::Tuner),
            0x03 => Some(Self::TunerAm),
            0x04 => Some(Self::Cd),
            0x05 => Some(Self::Aux),
            0x06 => Some(Self::Phono),
            0x07 => Some(Self::Dvd),
            0x08 => Some(Self::Tape),
            _ => None,
        }
    }

    /// Returns a human-readable name for the input
    pub fn name(self) -> &'static str {
        match self {
            Self::Fm => "FM",
            Self::Tuner => "TUNER",
            Self::TunerAm => "TUNER_AM",
            Self::Cd => "CD",
            Self::Aux => "AUX",
            Self::Phono => "PHONO",
            Self::Dvd => "DVD",
            Self::Tape => "TAPE",
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputSource {
    type Err = String;

    /// Accepts a name (`cd`, `tuner-am`, `TUNER_AM`) or a numeric code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");

        if let Some(source) = Self::ALL.iter().find(|src| src.name() == normalized) {
            return Ok(*source);
        }

        let code = normalized
            .parse::<u8>()
            .map_err(|_| format!("unknown input source: {s}"))?;
        Self::from_code(code).ok_or_else(|| format!("undefined input code: {code}"))
    }
}

/// Raw volume reading: 0 is -76 dB, 90 is +14 dB, 1 dB per step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Volume(pub u8);

impl Volume {
    /// Raw device value
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Level in decibels
    pub fn db(self) -> i16 {
        i16::from(self.0) - VOLUME_ZERO_DB
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:+} dB)", self.0, self.db())
    }
}

/// The status flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFlags(pub u8);

impl StatusFlags {
    fn bit(self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    /// Returns a copy with `mask` set or cleared
    pub fn with(self, mask: u8, on: bool) -> Self {
        if on {
            Self(self.0 | mask)
        } else {
            Self(self.0 & !mask)
        }
    }

    pub fn power(self) -> bool {
        self.bit(status_bits::POWER)
    }

    /// Set by the receiver while it wants the controller to act on a request
    pub fn command_request(self) -> bool {
        self.bit(status_bits::COMMAND_REQUEST)
    }

    pub fn zone2_power(self) -> bool {
        self.bit(status_bits::ZONE2_POWER)
    }

    pub fn mute(self) -> bool {
        self.bit(status_bits::MUTE)
    }

    pub fn zone2_mute(self) -> bool {
        self.bit(status_bits::ZONE2_MUTE)
    }

    /// Sleep timer running
    pub fn sleep_mode(self) -> bool {
        self.bit(status_bits::SLEEP_MODE)
    }

    pub fn cinema_eq(self) -> bool {
        self.bit(status_bits::CINEMA_EQ)
    }

    pub fn tone_direct(self) -> bool {
        self.bit(status_bits::TONE_DIRECT)
    }
}

/// A decoded status frame
///
/// Input selectors are stored raw. The receiver may report a code that has
/// no [`InputSource`] variant; that only becomes an error when the input is
/// actually asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFrame {
    /// System identifier (informational)
    pub system_id: u16,
    /// Front panel display text, one byte per character
    pub display: [u8; DISPLAY_TEXT_LEN],
    /// Status flag byte
    pub flags: StatusFlags,
    /// Raw main zone input selector
    pub input_code: u8,
    /// Raw zone 2 input selector
    pub zone2_input_code: u8,
    /// Main zone volume
    pub volume: Volume,
    /// Zone 2 volume
    pub zone2_volume: Volume,
    /// Byte 18, not interpreted but covered by the checksum
    pub reserved: u8,
}

impl StatusFrame {
    /// Display text with each byte mapped to the character of the same value
    pub fn text(&self) -> String {
        self.display.iter().map(|&b| char::from(b)).collect()
    }

    /// Main zone input
    pub fn input(&self) -> Result<InputSource, ProtocolError> {
        decode_input("input", self.input_code)
    }

    /// Zone 2 input
    pub fn zone2_input(&self) -> Result<InputSource, ProtocolError> {
        decode_input("zone 2 input", self.zone2_input_code)
    }

    /// Main zone power, from flag bit 0
    pub fn power(&self) -> bool {
        self.flags.power()
    }

    /// Zone 2 power
    pub fn zone2_power(&self) -> bool {
        self.flags.zone2_power()
    }

    /// Main zone mute
    pub fn muted(&self) -> bool {
        self.flags.mute()
    }

    /// Zone 2 mute
    pub fn zone2_muted(&self) -> bool {
        self.flags.zone2_mute()
    }

    /// Tone direct, bypassing the tone controls
    pub fn tone_direct(&self) -> bool {
        self.flags.tone_direct()
    }

    /// Get a summary of the current state
    pub fn summary(&self) -> String {
        let input = |code: u8| {
            InputSource::from_code(code)
                .map(|src| src.name().to_string())
                .unwrap_or_else(|| format!("0x{code:02X}"))
        };

        format!(
            "[{}] main: {} {} vol {}{} | zone 2: {} {} vol {}{}{}",
            self.text(),
            if self.power() { "on" } else { "standby" },
            input(self.input_code),
            self.volume,
            if self.muted() { " [MUTE]" } else { "" },
            if self.zone2_power() { "on" } else { "off" },
            input(self.zone2_input_code),
            self.zone2_volume,
            if self.zone2_muted() { " [MUTE]" } else { "" },
            if self.tone_direct() { " [TONE DIRECT]" } else { "" },
        )
    }
}

fn decode_input(field: &'static str, value: u8) -> Result<InputSource, ProtocolError> {
    InputSource::from_code(value).ok_or(ProtocolError::InvalidEnumValue { field, value })
}
