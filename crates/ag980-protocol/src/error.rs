//! Error types for AG-980 frame decoding

use thiserror::Error;

/// Errors raised while validating or interpreting a status frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The declared payload count is not the fixed status payload size
    #[error("unexpected byte count in status frame: got {actual}, expected {expected}")]
    UnexpectedCount { actual: u8, expected: u8 },

    /// Trailing checksum byte disagrees with the sum over the payload
    #[error("checksum mismatch in status frame: got 0x{actual:02X}, expected 0x{expected:02X}")]
    ChecksumMismatch { actual: u8, expected: u8 },

    /// Fewer bytes arrived than the fixed layout requires
    #[error("short status frame: got {actual} bytes, expected {expected}")]
    ShortFrame { actual: usize, expected: usize },

    /// A decoded selector byte is not a defined value
    #[error("invalid {field} value: 0x{value:02X}")]
    InvalidEnumValue { field: &'static str, value: u8 },
}
