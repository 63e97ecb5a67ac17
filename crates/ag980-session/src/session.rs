//! Device session
//!
//! [`DeviceSession`] owns the byte channel and the last decoded status.
//! Every operation is one transaction under the session lock: an optional
//! status refresh followed by zero or more command frames. Readers always
//! refresh first. Setters for toggled attributes compare the freshly read
//! state with the desired state and only send a toggle when they differ.
//!
//! The protocol carries no request identifiers, so the lock is held for the
//! whole transaction and replies can never interleave.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ag980_protocol::opcode::{input_select, zone2_input_select};
use ag980_protocol::{
    decode_status, encode_command, ByteChannel, InputSource, Opcode, StatusFrame, Volume,
    STATUS_FRAME_LEN,
};
use tracing::{debug, info_span, warn, Span};

use crate::config::SerialConfig;
use crate::error::{Result, SessionError};
use crate::serial::SerialChannel;

/// Snapshot of the receiver as of the last successful refresh
pub type DeviceState = StatusFrame;

struct Inner<C> {
    channel: C,
    state: Option<DeviceState>,
}

impl<C: ByteChannel> Inner<C> {
    fn send(&mut self, opcode: u8) -> Result<()> {
        match Opcode::try_from(opcode) {
            Ok(op) => debug!("Sending 0x{:02X} ({})", opcode, op.name()),
            Err(_) => debug!("Sending 0x{:02X}", opcode),
        }
        self.channel.write(&encode_command(opcode))?;
        Ok(())
    }

    /// Request, read and decode a status frame
    ///
    /// The stored state is only replaced once the frame has fully validated.
    fn refresh(&mut self) -> Result<&DeviceState> {
        self.channel.discard_input()?;
        self.send(Opcode::StatusRequest.code())?;
        let raw = self.channel.read(STATUS_FRAME_LEN)?;
        let status = decode_status(&raw)?;

        if status.flags.command_request() {
            warn!("Receiver raised command request");
        }

        Ok(&*self.state.insert(status))
    }

    /// Refresh, then toggle if `current` disagrees with `desired`
    fn sync_toggle(
        &mut self,
        desired: bool,
        current: fn(&DeviceState) -> bool,
        toggle: Opcode,
    ) -> Result<()> {
        if current(self.refresh()?) == desired {
            debug!("{} skipped, already {}", toggle.name(), desired);
            return Ok(());
        }
        self.send(toggle.code())
    }
}

/// A synchronous control session with one receiver
pub struct DeviceSession<C> {
    inner: Mutex<Inner<C>>,
    span: Span,
}

impl DeviceSession<SerialChannel> {
    /// Open the serial port described by `config` and start a session on it
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let channel = SerialChannel::open(config)?;
        Ok(Self::new(channel).with_span(info_span!("receiver", port = %config.port)))
    }
}

impl<C: ByteChannel> DeviceSession<C> {
    /// Create a session over `channel`
    pub fn new(channel: C) -> Self {
        Self {
            inner: Mutex::new(Inner {
                channel,
                state: None,
            }),
            span: info_span!("receiver"),
        }
    }

    /// Scope all of this session's log events to `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Give back the channel
    pub fn into_inner(self) -> C {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .channel
    }

    fn lock(&self) -> MutexGuard<'_, Inner<C>> {
        // State is only ever replaced whole, so a poisoned lock holds nothing torn
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transaction<T>(&self, f: impl FnOnce(&mut Inner<C>) -> Result<T>) -> Result<T> {
        let _entered = self.span.enter();
        let mut inner = self.lock();
        f(&mut inner)
    }

    fn read<T>(&self, f: impl FnOnce(&DeviceState) -> T) -> Result<T> {
        self.transaction(|inner| inner.refresh().map(f))
    }

    fn pulse(&self, op: Opcode, count: u32) -> Result<()> {
        self.transaction(|inner| {
            for _ in 0..count {
                inner.send(op.code())?;
            }
            Ok(())
        })
    }

    /// Request a fresh status frame and return it
    ///
    /// On failure the previous state is kept.
    pub fn refresh(&self) -> Result<DeviceState> {
        self.transaction(|inner| inner.refresh().cloned())
    }

    /// Last successfully decoded state, without talking to the receiver
    pub fn state(&self) -> Option<DeviceState> {
        self.lock().state.clone()
    }

    /// Main zone power
    ///
    /// Every `get_*` call performs its own status round trip; use
    /// [`refresh`](Self::refresh) to read several attributes from one frame.
    pub fn get_power(&self) -> Result<bool> {
        self.read(DeviceState::power)
    }

    /// Switch the main zone on or off
    ///
    /// Uses the discrete on/off opcodes, and only when the state differs.
    pub fn set_power(&self, on: bool) -> Result<()> {
        self.transaction(|inner| {
            let powered = inner.refresh()?.power();
            match (on, powered) {
                (true, false) => inner.send(Opcode::PowerOn.code()),
                (false, true) => inner.send(Opcode::PowerOff.code()),
                _ => {
                    debug!("Power already {}", if on { "on" } else { "off" });
                    Ok(())
                }
            }
        })
    }

    /// Zone 2 power, read fresh
    pub fn get_zone2_power(&self) -> Result<bool> {
        self.read(DeviceState::zone2_power)
    }

    /// Switch zone 2 on or off, toggling only when the state differs
    pub fn set_zone2_power(&self, on: bool) -> Result<()> {
        self.transaction(|inner| {
            inner.sync_toggle(on, DeviceState::zone2_power, Opcode::Zone2PowerToggle)
        })
    }

    /// Step the main volume up `steps` times
    ///
    /// No status is read and no limit is applied; the receiver clamps.
    pub fn volume_up(&self, steps: u32) -> Result<()> {
        self.pulse(Opcode::VolumeUp, steps)
    }

    /// Step the main volume down `steps` times
    pub fn volume_down(&self, steps: u32) -> Result<()> {
        self.pulse(Opcode::VolumeDown, steps)
    }

    /// Step the zone 2 volume up once, without reading status
    pub fn zone2_volume_up(&self) -> Result<()> {
        self.pulse(Opcode::Zone2VolumeUp, 1)
    }

    /// Step the zone 2 volume down once, without reading status
    pub fn zone2_volume_down(&self) -> Result<()> {
        self.pulse(Opcode::Zone2VolumeDown, 1)
    }

    pub fn get_muted(&self) -> Result<bool> {
        self.read(DeviceState::muted)
    }

    /// Mute or unmute the main zone, toggling only when the state differs
    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.transaction(|inner| inner.sync_toggle(muted, DeviceState::muted, Opcode::MuteToggle))
    }

    pub fn get_zone2_muted(&self) -> Result<bool> {
        self.read(DeviceState::zone2_muted)
    }

    /// Mute or unmute zone 2, toggling only when the state differs
    pub fn set_zone2_muted(&self, muted: bool) -> Result<()> {
        self.transaction(|inner| {
            inner.sync_toggle(muted, DeviceState::zone2_muted, Opcode::Zone2MuteToggle)
        })
    }

    /// Raw main zone volume, 0 to 90
    pub fn get_volume(&self) -> Result<Volume> {
        self.read(|state| state.volume)
    }

    pub fn get_zone2_volume(&self) -> Result<Volume> {
        self.read(|state| state.zone2_volume)
    }

    /// Front panel display text
    pub fn get_text(&self) -> Result<String> {
        self.read(DeviceState::text)
    }

    /// Main zone input
    ///
    /// Fails with [`ProtocolError::InvalidEnumValue`](ag980_protocol::ProtocolError::InvalidEnumValue)
    /// when the receiver reports an undefined code. The frame is still stored.
    pub fn get_input(&self) -> Result<InputSource> {
        self.transaction(|inner| Ok(inner.refresh()?.input()?))
    }

    pub fn get_zone2_input(&self) -> Result<InputSource> {
        self.transaction(|inner| Ok(inner.refresh()?.zone2_input()?))
    }

    /// Select the main zone input
    ///
    /// Sent unconditionally; the current input is not read first.
    pub fn set_input(&self, source: InputSource) -> Result<()> {
        self.transaction(|inner| inner.send(input_select(source)))
    }

    /// Select the zone 2 input, unconditionally
    pub fn set_zone2_input(&self, source: InputSource) -> Result<()> {
        self.transaction(|inner| inner.send(zone2_input_select(source)))
    }

    /// Select the main zone input by raw code
    pub fn set_input_code(&self, code: u8) -> Result<()> {
        self.set_input(validate_input(code)?)
    }

    /// Select the zone 2 input by raw code
    pub fn set_zone2_input_code(&self, code: u8) -> Result<()> {
        self.set_zone2_input(validate_input(code)?)
    }

    pub fn get_tone_direct(&self) -> Result<bool> {
        self.read(DeviceState::tone_direct)
    }

    /// Bring tone direct to `on`
    ///
    /// The receiver only offers a toggle, so a concurrent front panel change
    /// between the read and the toggle will leave it in the wrong state.
    pub fn set_tone_direct(&self, on: bool) -> Result<()> {
        self.transaction(|inner| {
            inner.sync_toggle(on, DeviceState::tone_direct, Opcode::ToneDirectToggle)
        })
    }

    /// Whether the sleep timer is running
    pub fn get_sleep_mode(&self) -> Result<bool> {
        self.read(|state| state.flags.sleep_mode())
    }

    pub fn get_cinema_eq(&self) -> Result<bool> {
        self.read(|state| state.flags.cinema_eq())
    }

    /// Whether the receiver is raising its command request flag
    pub fn get_command_request(&self) -> Result<bool> {
        self.read(|state| state.flags.command_request())
    }

    /// Informational system identifier from bytes 0 and 1
    pub fn get_system_id(&self) -> Result<u16> {
        self.read(|state| state.system_id)
    }
}

fn validate_input(code: u8) -> Result<InputSource> {
    InputSource::from_code(code)
        .ok_or_else(|| SessionError::InvalidArgument(format!("undefined input code {code}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag980_protocol::frame::{encode_status, COMMAND_FRAME_LEN};
    use ag980_protocol::{ProtocolError, StatusFlags};
    use std::collections::VecDeque;
    use std::io;

    /// Channel replaying canned replies, one per read
    #[derive(Default)]
    struct ScriptedChannel {
        replies: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl ScriptedChannel {
        fn reply(mut self, bytes: Vec<u8>) -> Self {
            self.replies.push_back(Ok(bytes));
            self
        }

        fn fail(mut self, kind: io::ErrorKind) -> Self {
            self.replies.push_back(Err(io::Error::from(kind)));
            self
        }

        fn opcodes(&self) -> Vec<u8> {
            self.written
                .chunks(COMMAND_FRAME_LEN)
                .map(|frame| frame[2])
                .collect()
        }
    }

    impl ByteChannel for ScriptedChannel {
        fn write(&mut self, data: &[u8]) -> io::Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, _n: usize) -> io::Result<Vec<u8>> {
            self.replies.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Channel whose status replies can straggle in past the read timeout
    #[derive(Default)]
    struct LateChannel {
        backlog: VecDeque<u8>,
        /// Bytes the next read may deliver before timing out
        cutoff: Option<usize>,
    }

    impl ByteChannel for LateChannel {
        fn write(&mut self, data: &[u8]) -> io::Result<()> {
            if data == &encode_command(Opcode::StatusRequest.code())[..] {
                self.backlog.extend(status_bytes(0x01));
            }
            Ok(())
        }

        fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
            let limit = self.cutoff.take().unwrap_or(n);
            let take = n.min(limit).min(self.backlog.len());
            Ok(self.backlog.drain(..take).collect())
        }

        fn discard_input(&mut self) -> io::Result<()> {
            self.backlog.clear();
            Ok(())
        }
    }

    fn status_bytes(flags: u8) -> Vec<u8> {
        encode_status(&StatusFrame {
            system_id: 0x0980,
            display: *b"CD        ",
            flags: StatusFlags(flags),
            input_code: 0x04,
            zone2_input_code: 0x00,
            volume: Volume(50),
            zone2_volume: Volume(20),
            reserved: 0,
        })
        .to_vec()
    }

    #[test]
    fn test_state_empty_before_refresh() {
        let session = DeviceSession::new(ScriptedChannel::default());
        assert!(session.state().is_none());
    }

    #[test]
    fn test_refresh_sends_status_request() {
        let session = DeviceSession::new(ScriptedChannel::default().reply(status_bytes(0x01)));
        let state = session.refresh().unwrap();
        assert!(state.power());
        assert_eq!(session.state(), Some(state));
        assert_eq!(session.into_inner().written, vec![0x81, 0x73, 0x53, 0x47]);
    }

    #[test]
    fn test_timeout_is_short_frame() {
        let session = DeviceSession::new(ScriptedChannel::default().reply(vec![0x80, 0x09, 16]));
        let err = session.get_power().unwrap_err();
        assert_eq!(
            err.protocol(),
            Some(&ProtocolError::ShortFrame {
                actual: 3,
                expected: STATUS_FRAME_LEN
            })
        );
    }

    #[test]
    fn test_io_error_propagates() {
        let session = DeviceSession::new(
            ScriptedChannel::default().fail(io::ErrorKind::BrokenPipe),
        );
        assert!(matches!(session.set_power(true), Err(SessionError::Io(_))));
        assert_eq!(session.into_inner().opcodes(), vec![0x53]);
    }

    #[test]
    fn test_late_reply_does_not_shift_next_frame() {
        let session = DeviceSession::new(LateChannel {
            cutoff: Some(12),
            ..LateChannel::default()
        });

        let err = session.refresh().unwrap_err();
        assert_eq!(
            err.protocol(),
            Some(&ProtocolError::ShortFrame {
                actual: 12,
                expected: STATUS_FRAME_LEN
            })
        );

        for _ in 0..3 {
            assert!(session.refresh().unwrap().power());
        }
        assert!(session.into_inner().backlog.is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_previous_state() {
        let mut corrupted = status_bytes(0x00);
        corrupted[19] ^= 0x80;

        let session = DeviceSession::new(
            ScriptedChannel::default()
                .reply(status_bytes(0x01))
                .reply(corrupted),
        );

        let first = session.refresh().unwrap();
        assert!(session.set_muted(true).is_err());
        assert_eq!(session.state(), Some(first));
        assert_eq!(session.into_inner().opcodes(), vec![0x53, 0x53]);
    }

    #[test]
    fn test_undefined_input_code_rejected() {
        let session = DeviceSession::new(ScriptedChannel::default());
        assert!(matches!(
            session.set_input_code(1),
            Err(SessionError::InvalidArgument(_))
        ));
        assert!(matches!(
            session.set_zone2_input_code(9),
            Err(SessionError::InvalidArgument(_))
        ));
        assert!(session.into_inner().written.is_empty());
    }
}
