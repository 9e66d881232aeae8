//! In-memory AX206 device emulator for tests.
//!
//! # Why an emulator rather than a plain recorder?
//!
//! A command exchange is stateful: after a command envelope the device may
//! expect a payload, may have a response queued, and always has a status
//! envelope queued.  `MockEndpoints` decodes every envelope the host writes
//! and queues the reads a real panel would produce, so the transport, the
//! driver and the intro animation can all be exercised unchanged.
//!
//! Every write is recorded.  Tests inspect the recording through
//! [`MockEndpoints::recorded_commands`], [`MockEndpoints::frame_writes`] and
//! friends.
//!
//! # Usage in tests
//!
//! ```ignore
//! let device = MockEndpoints::new(320, 240);
//! let mut driver = DisplayDriver::attach(device.clone());
//!
//! driver.bring_up(&NegotiationPolicy::default());
//!
//! assert_eq!(device.dimension_queries(), 1);
//! ```
//!
//! `MockEndpoints` is cheap to clone; clones share the same device state so a
//! test can keep one handle while the driver owns another.
//!
//! # Failure injection
//!
//! - `set_fail_writes(true)` makes every OUT transfer time out.
//! - `set_fail_status_reads(true)` makes every status read time out.
//! - `set_status_override(Some(bytes))` returns `bytes` instead of a valid
//!   status envelope.
//! - `set_write_limit(Some(n))` accepts at most `n` bytes per OUT transfer.
//! - `push_dimension_response(bytes)` scripts the next dimension query answer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dpf_core::protocol::commands::DeviceCommand;
use dpf_core::protocol::envelope::{CommandEnvelope, Direction, StatusEnvelope};

use crate::application::transport::{BulkEndpoints, EndpointError};

/// A frame payload received by the emulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameWrite {
    /// Frame width derived from the blit command's `x1 + 1`.
    pub width: u16,
    /// Frame height derived from the blit command's `y1 + 1`.
    pub height: u16,
    /// The payload bytes exactly as written.
    pub data: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    width: u16,
    height: u16,
    dimension_responses: VecDeque<Vec<u8>>,
    awaiting_payload: Option<CommandEnvelope>,
    pending_response: Option<Vec<u8>>,
    status_pending: Option<u32>,
    raw_writes: Vec<Vec<u8>>,
    commands: Vec<(Instant, CommandEnvelope)>,
    frames: Vec<FrameWrite>,
    fail_writes: bool,
    fail_status_reads: bool,
    status_override: Option<Vec<u8>>,
    write_limit: Option<usize>,
}

impl MockState {
    fn on_envelope(&mut self, envelope: CommandEnvelope) {
        self.commands.push((Instant::now(), envelope.clone()));
        match envelope.direction {
            Direction::DeviceToHost => {
                let response = match DeviceCommand::from_body(envelope.command_body()) {
                    Some(DeviceCommand::QueryDimensions) => {
                        self.dimension_responses.pop_front().unwrap_or_else(|| {
                            let [w_lo, w_hi] = self.width.to_le_bytes();
                            let [h_lo, h_hi] = self.height.to_le_bytes();
                            vec![w_lo, w_hi, h_lo, h_hi, 0]
                        })
                    }
                    _ => vec![0u8; envelope.data_length as usize],
                };
                self.pending_response = Some(response);
                self.status_pending = Some(envelope.tag);
            }
            Direction::HostToDevice if envelope.data_length > 0 => {
                self.awaiting_payload = Some(envelope);
            }
            Direction::HostToDevice => {
                self.status_pending = Some(envelope.tag);
            }
        }
    }

    fn on_payload(&mut self, envelope: CommandEnvelope, data: &[u8]) {
        if let Some(DeviceCommand::WriteFrame { x1, y1 }) =
            DeviceCommand::from_body(envelope.command_body())
        {
            self.frames.push(FrameWrite {
                width: x1.wrapping_add(1),
                height: y1.wrapping_add(1),
                data: data.to_vec(),
            });
        }
        self.status_pending = Some(envelope.tag);
    }
}

/// A cloneable, shared-state emulation of the panel's two bulk endpoints.
#[derive(Clone, Default)]
pub struct MockEndpoints {
    state: Arc<Mutex<MockState>>,
}

impl MockEndpoints {
    /// Creates a device that reports `width × height` when queried.
    pub fn new(width: u16, height: u16) -> Self {
        let state = MockState {
            width,
            height,
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Failure injection ─────────────────────────────────────────────────────

    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn set_fail_status_reads(&self, fail: bool) {
        self.state().fail_status_reads = fail;
    }

    pub fn set_status_override(&self, bytes: Option<Vec<u8>>) {
        self.state().status_override = bytes;
    }

    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.state().write_limit = limit;
    }

    /// Scripts the answer to the next dimension query.
    ///
    /// Scripted answers are consumed in order; once exhausted the device
    /// reports its configured dimensions again.
    pub fn push_dimension_response(&self, bytes: Vec<u8>) {
        self.state().dimension_responses.push_back(bytes);
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// Every OUT transfer, in order, including envelopes.
    pub fn raw_writes(&self) -> Vec<Vec<u8>> {
        self.state().raw_writes.clone()
    }

    /// Every recognised command, in order.
    pub fn recorded_commands(&self) -> Vec<DeviceCommand> {
        self.state()
            .commands
            .iter()
            .filter_map(|(_, env)| DeviceCommand::from_body(env.command_body()))
            .collect()
    }

    /// Every frame payload received, in order.
    pub fn frame_writes(&self) -> Vec<FrameWrite> {
        self.state().frames.clone()
    }

    /// Hardware levels of every backlight command received, in order.
    pub fn backlight_levels(&self) -> Vec<u8> {
        self.recorded_commands()
            .into_iter()
            .filter_map(|cmd| match cmd {
                DeviceCommand::SetBacklight(level) => Some(level.get()),
                _ => None,
            })
            .collect()
    }

    /// Number of dimension queries received.
    pub fn dimension_queries(&self) -> usize {
        self.recorded_commands()
            .iter()
            .filter(|cmd| matches!(cmd, DeviceCommand::QueryDimensions))
            .count()
    }

    /// Gaps between consecutive dimension queries.
    pub fn dimension_query_intervals(&self) -> Vec<Duration> {
        let times: Vec<Instant> = self
            .state()
            .commands
            .iter()
            .filter(|(_, env)| {
                matches!(
                    DeviceCommand::from_body(env.command_body()),
                    Some(DeviceCommand::QueryDimensions)
                )
            })
            .map(|(at, _)| *at)
            .collect();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl BulkEndpoints for MockEndpoints {
    fn write_out(&mut self, data: &[u8], _timeout: Duration) -> Result<usize, EndpointError> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(EndpointError::Timeout);
        }
        state.raw_writes.push(data.to_vec());
        let accepted = state.write_limit.map_or(data.len(), |limit| data.len().min(limit));

        if let Some(envelope) = state.awaiting_payload.take() {
            state.on_payload(envelope, data);
        } else if let Ok(envelope) = CommandEnvelope::decode(data) {
            state.on_envelope(envelope);
        }
        Ok(accepted)
    }

    fn read_in(&mut self, len: usize, _timeout: Duration) -> Result<Vec<u8>, EndpointError> {
        let mut state = self.state();
        if let Some(mut response) = state.pending_response.take() {
            response.truncate(len);
            return Ok(response);
        }
        let Some(tag) = state.status_pending.take() else {
            return Err(EndpointError::Timeout);
        };
        if state.fail_status_reads {
            return Err(EndpointError::Timeout);
        }
        if let Some(bytes) = state.status_override.clone() {
            return Ok(bytes);
        }
        let status = StatusEnvelope {
            tag,
            residue: 0,
            status: 0,
        };
        Ok(status.encode().to_vec())
    }
}
