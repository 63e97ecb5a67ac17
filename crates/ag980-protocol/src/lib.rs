//! AG-980 Protocol Library
//!
//! This crate provides framing and decoding for the RS-232C control
//! protocol of the TEAC AG-980 stereo receiver.
//!
//! - **Command frames**: 4 bytes, `81 73 <opcode> <checksum>`
//! - **Status frames**: 20 bytes, returned in reply to the status request
//!   opcode (`0x53`), carrying power/mute flags, input selectors, volumes
//!   and the front panel display text for both the main zone and zone 2
//!
//! # Architecture
//!
//! - [`frame`]: command encoding and status frame validation/decoding
//! - [`status`]: the decoded status model ([`StatusFrame`], [`InputSource`], [`Volume`])
//! - [`opcode`]: the opcode table
//! - [`transport`]: the [`ByteChannel`] abstraction the session layer talks through
//!
//! # Example
//!
//! ```rust
//! use ag980_protocol::{frame, Opcode};
//!
//! let bytes = frame::encode_command(Opcode::StatusRequest.code());
//! assert_eq!(bytes, [0x81, 0x73, 0x53, 0x47]);
//! ```

pub mod error;
pub mod frame;
pub mod opcode;
pub mod status;
pub mod transport;

pub use error::ProtocolError;
pub use frame::{decode_status, encode_command, encode_status, STATUS_FRAME_LEN};
pub use opcode::Opcode;
pub use status::{InputSource, StatusFlags, StatusFrame, Volume};
pub use transport::ByteChannel;
