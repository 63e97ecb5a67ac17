//! Command-line arguments

use std::path::PathBuf;

use ag980_protocol::InputSource;
use ag980_session::SerialConfig;
use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "ag980")]
#[command(about = "Control a TEAC AG-980 receiver via RS-232C")]
pub struct Cli {
    /// Serial port the receiver is connected to
    #[arg(short, long)]
    pub port: Option<String>,

    /// JSON file with serial settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Baud rate override
    #[arg(long)]
    pub baud: Option<u32>,

    /// Read timeout override in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Talk to a simulated receiver instead of a serial port
    #[arg(long, conflicts_with_all = ["port", "config"])]
    pub simulate: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Omitting the value reads the attribute, giving it sets it
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the full status
    Status,
    /// Main zone power
    Power { state: Option<Switch> },
    /// Zone 2 power
    Zone2Power { state: Option<Switch> },
    /// Main zone mute
    Mute { state: Option<Switch> },
    /// Zone 2 mute
    Zone2Mute { state: Option<Switch> },
    /// Tone direct
    ToneDirect { state: Option<Switch> },
    /// Main zone volume
    Volume {
        direction: Option<Direction>,
        /// Number of steps (1 dB each)
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// Zone 2 volume, one step at a time
    Zone2Volume { direction: Option<Direction> },
    /// Main zone input (name or code)
    Input { source: Option<InputSource> },
    /// Zone 2 input (name or code)
    Zone2Input { source: Option<InputSource> },
    /// Front panel display text
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

impl Cli {
    /// Serial settings from the config file, with command-line overrides applied
    pub fn serial_config(&self) -> anyhow::Result<SerialConfig> {
        let mut config = match &self.config {
            Some(path) => SerialConfig::load(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => SerialConfig::default(),
        };

        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }

        if config.port.is_empty() {
            bail!("no serial port given (use --port, --config or --simulate)");
        }
        Ok(config)
    }
}
