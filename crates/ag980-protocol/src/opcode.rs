//! AG-980 command opcodes
//!
//! Fixed opcodes are modelled by [`Opcode`]. Input selection opcodes are
//! derived from the [`InputSource`] code, see [`input_select`] and
//! [`zone2_input_select`].
//!
//! Zone 2 input selection shares its code range with the zone 2 volume and
//! mute opcodes (`FM + 0x41 == 0x41`). The receiver resolves this, not us.

use crate::status::InputSource;

/// Offset added to an [`InputSource`] code to select the main zone input
pub const INPUT_SELECT_BASE: u8 = 0x03;

/// Offset added to an [`InputSource`] code to select the zone 2 input
pub const ZONE2_INPUT_SELECT_BASE: u8 = 0x41;

/// Fixed AG-980 command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    /// Main zone power on
    PowerOn = 0x01,
    /// Main zone power off
    PowerOff = 0x02,
    /// Main volume up one step
    VolumeUp = 0x0F,
    /// Main volume down one step
    VolumeDown = 0x10,
    /// Main mute toggle
    MuteToggle = 0x11,
    /// Tone direct toggle
    ToneDirectToggle = 0x15,
    /// Zone 2 power toggle
    Zone2PowerToggle = 0x3F,
    /// Zone 2 volume up one step
    Zone2VolumeUp = 0x41,
    /// Zone 2 volume down one step
    Zone2VolumeDown = 0x42,
    /// Zone 2 mute toggle
    Zone2MuteToggle = 0x43,
    /// Request a 20-byte status frame
    StatusRequest = 0x53,
}

impl Opcode {
    /// Wire value of this opcode
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable name, used in logs
    pub fn name(self) -> &'static str {
        match self {
            Opcode::PowerOn => "power on",
            Opcode::PowerOff => "power off",
            Opcode::VolumeUp => "volume up",
            Opcode::VolumeDown => "volume down",
            Opcode::MuteToggle => "mute toggle",
            Opcode::ToneDirectToggle => "tone direct toggle",
            Opcode::Zone2PowerToggle => "zone 2 power toggle",
            Opcode::Zone2VolumeUp => "zone 2 volume up",
            Opcode::Zone2VolumeDown => "zone 2 volume down",
            Opcode::Zone2MuteToggle => "zone 2 mute toggle",
            Opcode::StatusRequest => "status request",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::PowerOn),
            0x02 => Ok(Self::PowerOff),
            0x0F => Ok(Self::VolumeUp),
            0x10 => Ok(Self::VolumeDown),
            0x11 => Ok(Self::MuteToggle),
            0x15 => Ok(Self::ToneDirectToggle),
            0x3F => Ok(Self::Zone2PowerToggle),
            0x41 => Ok(Self::Zone2VolumeUp),
            0x42 => Ok(Self::Zone2VolumeDown),
            0x43 => Ok(Self::Zone2MuteToggle),
            0x53 => Ok(Self::StatusRequest),
            other => Err(other),
        }
    }
}

/// Opcode selecting `source` as the main zone input
pub fn input_select(source: InputSource) -> u8 {
    source.code() + INPUT_SELECT_BASE
}

/// Opcode selecting `source` as the zone 2 input
pub fn zone2_input_select(source: InputSource) -> u8 {
    source.code() + ZONE2_INPUT_SELECT_BASE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_is_one_byte() {
        assert_eq!(std::mem::size_of::<Opcode>(), 1);
        assert_eq!(Opcode::StatusRequest as u8, 0x53);
    }

    #[test]
    fn test_opcode_roundtrip() {
        let all = [
            Opcode::PowerOn,
            Opcode::PowerOff,
            Opcode::VolumeUp,
            Opcode::VolumeDown,
            Opcode::MuteToggle,
            Opcode::ToneDirectToggle,
            Opcode::Zone2PowerToggle,
            Opcode::Zone2VolumeUp,
            Opcode::Zone2VolumeDown,
            Opcode::Zone2MuteToggle,
            Opcode::StatusRequest,
        ];

        for op in all {
            assert_eq!(Opcode::try_from(op.code()), Ok(op));
        }
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(Opcode::try_from(0x07), Err(0x07));
    }

    #[test]
    fn test_input_select_codes() {
        assert_eq!(input_select(InputSource::Cd), 0x07);
        assert_eq!(input_select(InputSource::Fm), 0x03);
        assert_eq!(input_select(InputSource::Tape), 0x0B);
        assert_eq!(zone2_input_select(InputSource::Cd), 0x45);
        assert_eq!(zone2_input_select(InputSource::Tape), 0x49);
    }
}
