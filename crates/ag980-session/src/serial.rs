//! Serial port byte channel

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use ag980_protocol::ByteChannel;
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, trace};

use crate::config::SerialConfig;
use crate::error::Result;

/// Serial connection to the receiver
pub struct SerialChannel {
    /// Serial port
    port: Box<dyn SerialPort>,
    /// Total time a single `read` may block
    timeout: Duration,
}

impl SerialChannel {
    /// Open the port described by `config`
    pub fn open(config: &SerialConfig) -> Result<Self> {
        debug!(
            "Opening {} at {} baud ({:?} flow control)",
            config.port, config.baud_rate, config.flow_control
        );

        let mut port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(config.flow_control.into())
            .timeout(config.timeout())
            .open()?;

        port.write_data_terminal_ready(true)?;

        Ok(Self {
            port,
            timeout: config.timeout(),
        })
    }

    /// Name of the underlying port, if known
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl ByteChannel for SerialChannel {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        trace!("write {:02X?}", data);
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let deadline = Instant::now() + self.timeout;

        let port = &mut self.port;
        let filled = fill_before(deadline, &mut buf, |chunk, remaining| {
            port.set_timeout(remaining)?;
            port.read(chunk)
        });
        self.port.set_timeout(self.timeout)?;
        let filled = filled?;

        buf.truncate(filled);
        if filled < n {
            debug!("read timed out with {} of {} bytes", filled, n);
        }
        Ok(buf)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        let waiting = self.port.bytes_to_read().unwrap_or(0);
        if waiting > 0 {
            debug!("discarding {} stale bytes", waiting);
        }
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// Fill `buf` from `read_some` until it is full or `deadline` passes
///
/// `read_some` is handed the time left, so no single read can run past the
/// deadline. Returns the number of bytes filled.
fn fill_before(
    deadline: Instant,
    buf: &mut [u8],
    mut read_some: impl FnMut(&mut [u8], Duration) -> io::Result<usize>,
) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match read_some(&mut buf[filled..], remaining) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
