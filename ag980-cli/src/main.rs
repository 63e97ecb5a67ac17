//! AG-980 Command-Line Controller
//!
//! Opens a session with a TEAC AG-980 receiver (or a simulated one) and
//! performs a single read or write.

mod cli;

use std::process::ExitCode;

use ag980_protocol::ByteChannel;
use ag980_session::DeviceSession;
use ag980_sim::VirtualReceiver;
use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, Direction};
use tracing::info_span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 4] = ["ag980", "ag980_protocol", "ag980_session", "ag980_sim"];

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let default_filter = CRATES
        .iter()
        .map(|name| format!("{name}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.simulate {
        tracing::info!("Using simulated receiver");
        let session = DeviceSession::new(VirtualReceiver::new())
            .with_span(info_span!("receiver", port = "simulated"));
        return execute(&session, &cli.command);
    }

    let config = cli.serial_config()?;
    let session = DeviceSession::open(&config)
        .with_context(|| format!("failed to open {}", config.port))?;
    execute(&session, &cli.command)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn execute<C: ByteChannel>(session: &DeviceSession<C>, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Status => {
            let state = session.refresh()?;
            println!("{}", state.summary());
            println!("system id: 0x{:04X}", state.system_id);
            println!(
                "sleep: {}, cinema eq: {}, command request: {}",
                on_off(state.flags.sleep_mode()),
                on_off(state.flags.cinema_eq()),
                on_off(state.flags.command_request())
            );
        }
        Command::Power { state: None } => println!("{}", on_off(session.get_power()?)),
        Command::Power { state: Some(s) } => session.set_power(s.is_on())?,
        Command::Zone2Power { state: None } => println!("{}", on_off(session.get_zone2_power()?)),
        Command::Zone2Power { state: Some(s) } => session.set_zone2_power(s.is_on())?,
        Command::Mute { state: None } => println!("{}", on_off(session.get_muted()?)),
        Command::Mute { state: Some(s) } => session.set_muted(s.is_on())?,
        Command::Zone2Mute { state: None } => println!("{}", on_off(session.get_zone2_muted()?)),
        Command::Zone2Mute { state: Some(s) } => session.set_zone2_muted(s.is_on())?,
        Command::ToneDirect { state: None } => println!("{}", on_off(session.get_tone_direct()?)),
        Command::ToneDirect { state: Some(s) } => session.set_tone_direct(s.is_on())?,
        Command::Volume {
            direction: None, ..
        } => println!("{}", session.get_volume()?),
        Command::Volume {
            direction: Some(Direction::Up),
            steps,
        } => session.volume_up(*steps)?,
        Command::Volume {
            direction: Some(Direction::Down),
            steps,
        } => session.volume_down(*steps)?,
        Command::Zone2Volume { direction: None } => println!("{}", session.get_zone2_volume()?),
        Command::Zone2Volume {
            direction: Some(Direction::Up),
        } => session.zone2_volume_up()?,
        Command::Zone2Volume {
            direction: Some(Direction::Down),
        } => session.zone2_volume_down()?,
        Command::Input { source: None } => println!("{}", session.get_input()?),
        Command::Input { source: Some(src) } => session.set_input(*src)?,
        Command::Zone2Input { source: None } => println!("{}", session.get_zone2_input()?),
        Command::Zone2Input { source: Some(src) } => session.set_zone2_input(*src)?,
        Command::Text => println!("{}", session.get_text()?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Switch;
    use ag980_protocol::InputSource;

    #[test]
    fn test_execute_against_simulator() {
        let receiver = VirtualReceiver::new();
        let session = DeviceSession::new(receiver.clone());

        execute(&session, &Command::Power { state: Some(Switch::On) }).unwrap();
        execute(
            &session,
            &Command::Input {
                source: Some(InputSource::Dvd),
            },
        )
        .unwrap();
        execute(
            &session,
            &Command::Volume {
                direction: Some(Direction::Up),
                steps: 2,
            },
        )
        .unwrap();
        execute(&session, &Command::Status).unwrap();

        assert!(receiver.power());
        assert_eq!(receiver.input_code(), InputSource::Dvd.code());
        assert_eq!(receiver.volume(), 42);
    }
}
