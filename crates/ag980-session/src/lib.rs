//! AG-980 Device Session
//!
//! This crate drives a TEAC AG-980 receiver over a [`ByteChannel`]:
//!
//! - **DeviceSession**: explicit `refresh`/`get_*`/`set_*` operations, each a
//!   single serialized request/response transaction
//! - **SerialChannel**: the RS-232C link, built on the `serialport` crate
//! - **SerialConfig**: port settings, loadable from JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use ag980_protocol::InputSource;
//! use ag980_session::{DeviceSession, SerialConfig};
//!
//! let session = DeviceSession::open(&SerialConfig::for_port("/dev/ttyUSB0")).unwrap();
//! session.set_power(true).unwrap();
//! session.set_input(InputSource::Cd).unwrap();
//! println!("volume: {}", session.get_volume().unwrap());
//! ```
//!
//! [`ByteChannel`]: ag980_protocol::ByteChannel

pub mod config;
pub mod error;
pub mod serial;
pub mod session;

pub use config::{FlowControlSetting, SerialConfig};
pub use error::{Result, SessionError};
pub use serial::SerialChannel;
pub use session::{DeviceSession, DeviceState};
