//! AG-980 Simulation Library
//!
//! This crate provides a simulated receiver for exercising the control
//! protocol without a serial cable:
//!
//! - **VirtualReceiver**: a [`ByteChannel`](ag980_protocol::ByteChannel)
//!   that accepts command frames, updates its state the way the hardware
//!   does, and answers status requests with protocol-accurate frames
//!
//! # Example
//!
//! ```rust
//! use ag980_protocol::{decode_status, encode_command, ByteChannel, Opcode};
//! use ag980_sim::VirtualReceiver;
//!
//! let mut receiver = VirtualReceiver::new();
//! receiver.write(&encode_command(Opcode::PowerOn.code())).unwrap();
//! receiver.write(&encode_command(Opcode::StatusRequest.code())).unwrap();
//!
//! let reply = receiver.read(20).unwrap();
//! assert!(decode_status(&reply).unwrap().power());
//! ```

pub mod receiver;

pub use receiver::{ReplyFault, VirtualReceiver, VirtualReceiverConfig};
