//! Serial link configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Flow control applied to the serial port
///
/// The receiver documents both XON/XOFF and RTS/CTS. The serial driver
/// applies one mode at a time; DTR is asserted regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlSetting {
    None,
    Software,
    #[default]
    Hardware,
}

impl From<FlowControlSetting> for serialport::FlowControl {
    fn from(setting: FlowControlSetting) -> Self {
        match setting {
            FlowControlSetting::None => serialport::FlowControl::None,
            FlowControlSetting::Software => serialport::FlowControl::Software,
            FlowControlSetting::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Serial port settings for the receiver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Flow control mode
    pub flow_control: FlowControlSetting,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 9600,
            timeout_ms: 2000,
            flow_control: FlowControlSetting::Hardware,
        }
    }
}

impl SerialConfig {
    /// Default settings for the given port
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    /// Read timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
