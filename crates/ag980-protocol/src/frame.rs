//! AG-980 frame encoding and decoding
//!
//! # Command Frame
//! ```text
//! 81 73 [OP] [SUM]
//! ```
//!
//! - `81 73`: fixed header
//! - `OP`: opcode
//! - `SUM`: low byte of `0x81 + 0x73 + OP`
//!
//! # Status Frame
//! ```text
//! [ID lo] [ID hi] [CNT] [TEXT x10] [FLAGS] [IN] [Z2 IN] [VOL] [Z2 VOL] [RSV] [SUM]
//! ```
//!
//! - `ID`: little-endian system id
//! - `CNT`: payload count, always 16
//! - `SUM`: low byte of the sum of bytes 2 through 18 inclusive

use tracing::{debug, trace};

use crate::error::ProtocolError;
use crate::status::{StatusFlags, StatusFrame, Volume, DISPLAY_TEXT_LEN};

/// Command frame header
pub const COMMAND_HEADER: [u8; 2] = [0x81, 0x73];

/// Length of an encoded command frame
pub const COMMAND_FRAME_LEN: usize = 4;

/// Length of a status frame
pub const STATUS_FRAME_LEN: usize = 20;

/// Payload count declared by every valid status frame
pub const EXPECTED_COUNT: u8 = 16;

const COUNT_OFFSET: usize = 2;
const TEXT_OFFSET: usize = 3;
const FLAGS_OFFSET: usize = TEXT_OFFSET + DISPLAY_TEXT_LEN;
const INPUT_OFFSET: usize = 14;
const ZONE2_INPUT_OFFSET: usize = 15;
const VOLUME_OFFSET: usize = 16;
const ZONE2_VOLUME_OFFSET: usize = 17;
const RESERVED_OFFSET: usize = 18;
const CHECKSUM_OFFSET: usize = STATUS_FRAME_LEN - 1;

/// Low byte of the arithmetic sum of `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Checksum over the count-through-reserved range of a status frame
pub fn status_checksum(frame: &[u8; STATUS_FRAME_LEN]) -> u8 {
    checksum(&frame[COUNT_OFFSET..CHECKSUM_OFFSET])
}

/// Build the 4-byte command frame for `opcode`
pub fn encode_command(opcode: u8) -> [u8; COMMAND_FRAME_LEN] {
    let [h0, h1] = COMMAND_HEADER;
    [h0, h1, opcode, checksum(&[h0, h1, opcode])]
}

/// Validate a received command frame and return its opcode
///
/// Returns `None` if the header, length or checksum is wrong.
pub fn parse_command(bytes: &[u8]) -> Option<u8> {
    match bytes {
        [h0, h1, opcode, sum]
            if [*h0, *h1] == COMMAND_HEADER && checksum(&bytes[..3]) == *sum =>
        {
            Some(*opcode)
        }
        _ => None,
    }
}

/// Validate and decode a status frame
///
/// Anything past [`STATUS_FRAME_LEN`] bytes is ignored. Nothing is decoded
/// unless the length, count and checksum all check out.
pub fn decode_status(raw: &[u8]) -> Result<StatusFrame, ProtocolError> {
    trace!("read {} bytes: {:02X?}", raw.len(), raw);

    let Some(raw) = raw
        .get(..STATUS_FRAME_LEN)
        .and_then(|head| <&[u8; STATUS_FRAME_LEN]>::try_from(head).ok())
    else {
        return Err(ProtocolError::ShortFrame {
            actual: raw.len(),
            expected: STATUS_FRAME_LEN,
        });
    };

    let count = raw[COUNT_OFFSET];
    if count != EXPECTED_COUNT {
        return Err(ProtocolError::UnexpectedCount {
            actual: count,
            expected: EXPECTED_COUNT,
        });
    }

    let actual = raw[CHECKSUM_OFFSET];
    let expected = status_checksum(raw);
    if actual != expected {
        return Err(ProtocolError::ChecksumMismatch { actual, expected });
    }

    let mut display = [0u8; DISPLAY_TEXT_LEN];
    display.copy_from_slice(&raw[TEXT_OFFSET..FLAGS_OFFSET]);

    let frame = StatusFrame {
        system_id: u16::from_le_bytes([raw[0], raw[1]]),
        display,
        flags: StatusFlags(raw[FLAGS_OFFSET]),
        input_code: raw[INPUT_OFFSET],
        zone2_input_code: raw[ZONE2_INPUT_OFFSET],
        volume: Volume(raw[VOLUME_OFFSET]),
        zone2_volume: Volume(raw[ZONE2_VOLUME_OFFSET]),
        reserved: raw[RESERVED_OFFSET],
    };

    debug!("system id: 0x{:04X}, status: {}", frame.system_id, frame.summary());
    Ok(frame)
}

/// Encode a status frame, filling in the count and checksum
pub fn encode_status(frame: &StatusFrame) -> [u8; STATUS_FRAME_LEN] {
    let mut bytes = [0u8; STATUS_FRAME_LEN];
    bytes[..COUNT_OFFSET].copy_from_slice(&frame.system_id.to_le_bytes());
    bytes[COUNT_OFFSET] = EXPECTED_COUNT;
    bytes[TEXT_OFFSET..FLAGS_OFFSET].copy_from_slice(&frame.display);
    bytes[FLAGS_OFFSET] = frame.flags.0;
    bytes[INPUT_OFFSET] = frame.input_code;
    bytes[ZONE2_INPUT_OFFSET] = frame.zone2_input_code;
    bytes[VOLUME_OFFSET] = frame.volume.0;
    bytes[ZONE2_VOLUME_OFFSET] = frame.zone2_volume.0;
    bytes[RESERVED_OFFSET] = frame.reserved;
    bytes[CHECKSUM_OFFSET] = status_checksum(&bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::InputSource;
    use proptest::prelude::*;

    /// System id 0x1234, main powered on TUNER at 45, zone 2 on AUX at 45
    fn scenario_frame() -> [u8; STATUS_FRAME_LEN] {
        let mut raw = [
            0x34, 0x12, 16, b'T', b'U', b'N', b'E', b'R', b' ', b'8', b'8', b'.', b'1', 0x01,
            0x02, 0x05, 45, 45, 0x00, 0x00,
        ];
        raw[19] = checksum(&raw[2..19]);
        raw
    }

    #[test]
    fn test_encode_status_request() {
        assert_eq!(encode_command(0x53), [0x81, 0x73, 0x53, 0x47]);
    }

    #[test]
    fn test_encode_power_on() {
        // 0x81 + 0x73 + 0x01 = 0xF5
        assert_eq!(encode_command(0x01), [0x81, 0x73, 0x01, 0xF5]);
    }

    #[test]
    fn test_encode_wraps_checksum() {
        // 0xF4 + 0x0F = 0x103
        assert_eq!(encode_command(0x0F)[3], 0x03);
        assert_eq!(encode_command(0xFF)[3], 0xF3);
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(&encode_command(0x11)), Some(0x11));
        assert_eq!(parse_command(&[0x81, 0x73, 0x11, 0x00]), None);
        assert_eq!(parse_command(&[0x80, 0x73, 0x11, 0x04]), None);
        assert_eq!(parse_command(&[0x81, 0x73, 0x11]), None);
    }

    #[test]
    fn test_decode_scenario() {
        let frame = decode_status(&scenario_frame()).unwrap();

        assert_eq!(frame.system_id, 0x1234);
        assert_eq!(frame.text(), "TUNER 88.1");
        assert!(frame.power());
        assert!(!frame.flags.command_request());
        assert!(!frame.zone2_power());
        assert_eq!(frame.input(), Ok(InputSource::Tuner));
        assert_eq!(frame.zone2_input(), Ok(InputSource::Aux));
        assert_eq!(frame.volume, Volume(45));
        assert_eq!(frame.zone2_volume, Volume(45));
    }

    #[test]
    fn test_status_checksum_skips_id_and_trailer() {
        let mut raw = scenario_frame();
        let sum = status_checksum(&raw);

        raw[0] = 0xFF;
        raw[1] = 0xEE;
        raw[19] = 0x00;
        assert_eq!(status_checksum(&raw), sum);

        raw[18] = raw[18].wrapping_add(1);
        assert_eq!(status_checksum(&raw), sum.wrapping_add(1));
    }

    #[test]
    fn test_decode_one_byte_short() {
        let raw = scenario_frame();
        assert_eq!(
            decode_status(&raw[..STATUS_FRAME_LEN - 1]),
            Err(ProtocolError::ShortFrame {
                actual: 19,
                expected: 20
            })
        );
    }

    #[test]
    fn test_decode_wrong_count() {
        let mut raw = scenario_frame();
        raw[2] = 15;
        raw[19] = checksum(&raw[2..19]);

        assert_eq!(
            decode_status(&raw),
            Err(ProtocolError::UnexpectedCount {
                actual: 15,
                expected: 16
            })
        );
    }

    #[test]
    fn test_decode_corrupted_checksum() {
        let mut raw = scenario_frame();
        let good = raw[19];
        raw[19] ^= 0x01;

        assert_eq!(
            decode_status(&raw),
            Err(ProtocolError::ChecksumMismatch {
                actual: good ^ 0x01,
                expected: good
            })
        );
    }

    #[test]
    fn test_decode_corrupted_payload() {
        let mut raw = scenario_frame();
        raw[16] = 46;

        assert!(matches!(
            decode_status(&raw),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_system_id_not_checksummed() {
        let mut raw = scenario_frame();
        raw[0] = 0xFF;

        let frame = decode_status(&raw).unwrap();
        assert_eq!(frame.system_id, 0x12FF);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(
            decode_status(&[]),
            Err(ProtocolError::ShortFrame {
                actual: 0,
                expected: STATUS_FRAME_LEN
            })
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut raw = scenario_frame().to_vec();
        raw.extend_from_slice(&[0xAA, 0xBB]);

        assert!(decode_status(&raw).is_ok());
    }

    #[test]
    fn test_encode_status_matches_scenario() {
        let frame = decode_status(&scenario_frame()).unwrap();
        assert_eq!(encode_status(&frame), scenario_frame());
    }

    proptest! {
        #[test]
        fn command_checksum_is_low_byte_of_sum(opcode: u8) {
            let bytes = encode_command(opcode);
            prop_assert_eq!(bytes.len(), COMMAND_FRAME_LEN);
            prop_assert_eq!(&bytes[..3], &[0x81, 0x73, opcode][..]);
            prop_assert_eq!(bytes[3], ((0x81u32 + 0x73 + opcode as u32) & 0xFF) as u8);
        }

        #[test]
        fn decoded_fields_reproduce_checksum(raw in prop::array::uniform20(any::<u8>())) {
            let mut raw = raw;
            raw[2] = EXPECTED_COUNT;
            raw[19] = status_checksum(&raw);

            let frame = decode_status(&raw).unwrap();

            let mut fields = vec![EXPECTED_COUNT];
            fields.extend_from_slice(&frame.display);
            fields.extend_from_slice(&[
                frame.flags.0,
                frame.input_code,
                frame.zone2_input_code,
                frame.volume.0,
                frame.zone2_volume.0,
                frame.reserved,
            ]);
            prop_assert_eq!(checksum(&fields), raw[19]);
        }

        #[test]
        fn wrong_count_always_rejected(
            raw in prop::array::uniform20(any::<u8>()),
            count in any::<u8>().prop_filter("count must differ", |c| *c != EXPECTED_COUNT)
        ) {
            let mut raw = raw;
            raw[2] = count;
            match decode_status(&raw) {
                Err(ProtocolError::UnexpectedCount { actual, expected }) => {
                    prop_assert_eq!(actual, count);
                    prop_assert_eq!(expected, EXPECTED_COUNT);
                }
                other => prop_assert!(false, "unexpected result: {:?}", other),
            }
        }

        #[test]
        fn wrong_checksum_always_rejected(
            raw in prop::array::uniform20(any::<u8>()),
            delta in 1u8..=255
        ) {
            let mut raw = raw;
            raw[2] = EXPECTED_COUNT;
            raw[19] = status_checksum(&raw).wrapping_add(delta);
            let is_checksum_mismatch = matches!(
                decode_status(&raw),
                Err(ProtocolError::ChecksumMismatch { .. })
            );
            prop_assert!(is_checksum_mismatch);
        }

        #[test]
        fn short_input_always_rejected(raw in prop::collection::vec(any::<u8>(), 0..STATUS_FRAME_LEN)) {
            prop_assert_eq!(
                decode_status(&raw),
                Err(ProtocolError::ShortFrame { actual: raw.len(), expected: STATUS_FRAME_LEN })
            );
        }
    }
}
