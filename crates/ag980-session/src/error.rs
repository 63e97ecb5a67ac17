//! Error types for the device session

use ag980_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while talking to the receiver
#[derive(Debug, Error)]
pub enum SessionError {
    /// Status frame rejected or a decoded value undefined
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Caller supplied a value outside the protocol's range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error on the byte channel
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl SessionError {
    /// The protocol error, if this is one
    pub fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            SessionError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
