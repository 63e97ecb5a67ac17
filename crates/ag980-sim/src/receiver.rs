//! Virtual receiver simulation
//!
//! Provides a simulated AG-980 that consumes command frames and produces
//! status frames. Clones share the same underlying receiver, so a test can
//! hand one clone to a session and inspect the other.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ag980_protocol::frame::{self, COMMAND_FRAME_LEN};
use ag980_protocol::opcode::{INPUT_SELECT_BASE, ZONE2_INPUT_SELECT_BASE};
use ag980_protocol::status::{status_bits, DISPLAY_TEXT_LEN, MAX_VOLUME};
use ag980_protocol::{ByteChannel, InputSource, Opcode, StatusFlags, StatusFrame, Volume};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// A one-shot fault applied to the next status reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyFault {
    /// Flip the low bit of the trailing checksum byte
    CorruptChecksum,
    /// Declare this payload count instead of 16 (checksum stays valid)
    WrongCount(u8),
    /// Send only the first N bytes
    Truncate(usize),
    /// Do not reply at all
    Silent,
}

/// Configuration for creating a virtual receiver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualReceiverConfig {
    /// System id reported in status frames
    pub system_id: u16,
    /// Front panel text, padded or cut to 10 characters
    pub display: String,
    /// Initial main zone power
    pub power: bool,
    /// Initial main zone input
    pub input: InputSource,
    /// Initial main zone volume (raw)
    pub volume: u8,
    /// Initial zone 2 input
    pub zone2_input: InputSource,
    /// Initial zone 2 volume (raw)
    pub zone2_volume: u8,
}

impl Default for VirtualReceiverConfig {
    fn default() -> Self {
        Self {
            system_id: 0x0980,
            display: "AG-980".to_string(),
            power: false,
            input: InputSource::Cd,
            volume: 40,
            zone2_input: InputSource::Fm,
            zone2_volume: 30,
        }
    }
}

#[derive(Debug)]
struct ReceiverState {
    system_id: u16,
    display: [u8; DISPLAY_TEXT_LEN],
    flags: StatusFlags,
    input_code: u8,
    zone2_input_code: u8,
    volume: u8,
    zone2_volume: u8,
    /// Partial command bytes not yet forming a frame
    rx_buffer: Vec<u8>,
    /// Bytes waiting to be read by the controller
    pending_output: VecDeque<u8>,
    /// Every opcode accepted, in order
    received: Vec<u8>,
    fault: Option<ReplyFault>,
}

/// A simulated AG-980 receiver
#[derive(Debug, Clone)]
pub struct VirtualReceiver {
    state: Arc<Mutex<ReceiverState>>,
}

impl VirtualReceiver {
    /// Create a receiver in standby with default settings
    pub fn new() -> Self {
        Self::from_config(VirtualReceiverConfig::default())
    }

    /// Create a receiver from configuration
    pub fn from_config(config: VirtualReceiverConfig) -> Self {
        let flags = StatusFlags::default().with(status_bits::POWER, config.power);
        let state = ReceiverState {
            system_id: config.system_id,
            display: pad_display(&config.display),
            flags,
            input_code: config.input.code(),
            zone2_input_code: config.zone2_input.code(),
            volume: config.volume.min(MAX_VOLUME),
            zone2_volume: config.zone2_volume.min(MAX_VOLUME),
            rx_buffer: Vec::with_capacity(COMMAND_FRAME_LEN),
            pending_output: VecDeque::new(),
            received: Vec::new(),
            fault: None,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReceiverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status as the receiver would report it
    pub fn status(&self) -> StatusFrame {
        self.lock().status_frame()
    }

    pub fn power(&self) -> bool {
        self.lock().flags.power()
    }

    pub fn muted(&self) -> bool {
        self.lock().flags.mute()
    }

    pub fn volume(&self) -> u8 {
        self.lock().volume
    }

    pub fn zone2_volume(&self) -> u8 {
        self.lock().zone2_volume
    }

    /// Raw main zone input code
    pub fn input_code(&self) -> u8 {
        self.lock().input_code
    }

    /// Raw zone 2 input code
    pub fn zone2_input_code(&self) -> u8 {
        self.lock().zone2_input_code
    }

    /// Set a status flag directly, as if changed from the front panel
    pub fn set_flag(&self, mask: u8, on: bool) {
        let mut state = self.lock();
        state.flags = state.flags.with(mask, on);
    }

    /// Set the main zone input code, including codes the protocol does not define
    pub fn set_input_code(&self, code: u8) {
        self.lock().input_code = code;
    }

    /// Set the zone 2 input code, including codes the protocol does not define
    pub fn set_zone2_input_code(&self, code: u8) {
        self.lock().zone2_input_code = code;
    }

    /// Set the front panel text
    pub fn set_display(&self, text: &str) {
        self.lock().display = pad_display(text);
    }

    /// Apply `fault` to the next status reply only
    pub fn inject_fault(&self, fault: ReplyFault) {
        self.lock().fault = Some(fault);
    }

    /// Opcodes accepted so far, in order
    pub fn received(&self) -> Vec<u8> {
        self.lock().received.clone()
    }

    /// Accepted opcodes other than status requests
    pub fn received_commands(&self) -> Vec<u8> {
        self.lock()
            .received
            .iter()
            .copied()
            .filter(|&op| op != Opcode::StatusRequest.code())
            .collect()
    }

    /// Forget the record of accepted opcodes
    pub fn clear_received(&self) {
        self.lock().received.clear();
    }

    /// Get a summary of current state
    pub fn state_summary(&self) -> String {
        self.status().summary()
    }
}

impl Default for VirtualReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverState {
    fn status_frame(&self) -> StatusFrame {
        StatusFrame {
            system_id: self.system_id,
            display: self.display,
            flags: self.flags,
            input_code: self.input_code,
            zone2_input_code: self.zone2_input_code,
            volume: Volume(self.volume),
            zone2_volume: Volume(self.zone2_volume),
            reserved: 0,
        }
    }

    fn toggle(&mut self, mask: u8) {
        let on = self.flags.0 & mask == 0;
        self.flags = self.flags.with(mask, on);
    }

    /// Apply one accepted opcode
    ///
    /// Zone 2 input codes that collide with fixed opcodes (FM and TUNER)
    /// are treated as the fixed opcode.
    fn apply(&mut self, opcode: u8) {
        self.received.push(opcode);

        if let Ok(op) = Opcode::try_from(opcode) {
            debug!("virtual receiver: {}", op.name());
            match op {
                Opcode::PowerOn => self.flags = self.flags.with(status_bits::POWER, true),
                Opcode::PowerOff => self.flags = self.flags.with(status_bits::POWER, false),
                Opcode::VolumeUp => self.volume = (self.volume + 1).min(MAX_VOLUME),
                Opcode::VolumeDown => self.volume = self.volume.saturating_sub(1),
                Opcode::MuteToggle => self.toggle(status_bits::MUTE),
                Opcode::ToneDirectToggle => self.toggle(status_bits::TONE_DIRECT),
                Opcode::Zone2PowerToggle => self.toggle(status_bits::ZONE2_POWER),
                Opcode::Zone2VolumeUp => {
                    self.zone2_volume = (self.zone2_volume + 1).min(MAX_VOLUME)
                }
                Opcode::Zone2VolumeDown => self.zone2_volume = self.zone2_volume.saturating_sub(1),
                Opcode::Zone2MuteToggle => self.toggle(status_bits::ZONE2_MUTE),
                Opcode::StatusRequest => self.queue_status(),
            }
            return;
        }

        let main = opcode
            .checked_sub(INPUT_SELECT_BASE)
            .and_then(InputSource::from_code);
        let zone2 = opcode
            .checked_sub(ZONE2_INPUT_SELECT_BASE)
            .and_then(InputSource::from_code);

        match (main, zone2) {
            (Some(src), _) => {
                debug!("virtual receiver: input {}", src);
                self.input_code = src.code();
            }
            (None, Some(src)) => {
                debug!("virtual receiver: zone 2 input {}", src);
                self.zone2_input_code = src.code();
            }
            (None, None) => warn!("virtual receiver: ignoring opcode 0x{:02X}", opcode),
        }
    }

    fn queue_status(&mut self) {
        let mut reply = frame::encode_status(&self.status_frame());
        let mut len = reply.len();
        let last = len - 1;

        match self.fault.take() {
            None => {}
            Some(ReplyFault::CorruptChecksum) => reply[last] ^= 0x01,
            Some(ReplyFault::WrongCount(count)) => {
                reply[2] = count;
                reply[last] = frame::status_checksum(&reply);
            }
            Some(ReplyFault::Truncate(keep)) => len = keep.min(len),
            Some(ReplyFault::Silent) => len = 0,
        }

        let reply = &reply[..len];
        trace!("virtual receiver reply: {:02X?}", reply);
        self.pending_output.extend(reply.iter().copied());
    }
}

impl ByteChannel for VirtualReceiver {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        state.rx_buffer.extend_from_slice(data);

        while state.rx_buffer.len() >= COMMAND_FRAME_LEN {
            match frame::parse_command(&state.rx_buffer[..COMMAND_FRAME_LEN]) {
                Some(opcode) => {
                    state.rx_buffer.drain(..COMMAND_FRAME_LEN);
                    state.apply(opcode);
                }
                None => {
                    let byte = state.rx_buffer.remove(0);
                    warn!("virtual receiver: discarding unframed byte 0x{:02X}", byte);
                }
            }
        }

        Ok(())
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut state = self.lock();
        let take = n.min(state.pending_output.len());
        Ok(state.pending_output.drain(..take).collect())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        if !state.pending_output.is_empty() {
            debug!(
                "virtual receiver: dropping {} unread bytes",
                state.pending_output.len()
            );
            state.pending_output.clear();
        }
        Ok(())
    }
}

fn pad_display(text: &str) -> [u8; DISPLAY_TEXT_LEN] {
    let mut display = [b' '; DISPLAY_TEXT_LEN];
    for (slot, ch) in display.iter_mut().zip(text.chars()) {
        *slot = u8::try_from(ch).unwrap_or(b'?');
    }
    display
}
