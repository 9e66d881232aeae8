//! DeviceTransport: the command/data/status exchange over two bulk endpoints.
//!
//! # How one command travels over the bus (for beginners)
//!
//! The AX206 firmware borrows the framing of USB mass storage ("bulk-only
//! transport").  Every command is a three-stage exchange:
//!
//! ```text
//!  host                                         device
//!   │── 31-byte command envelope (OUT 0x01) ──────▶│   1 s timeout
//!   │── payload bytes (OUT 0x01)  ─────────┐       │   3 s timeout
//!   │◀─ response bytes (IN 0x81)  ─────────┘ one of│   4 s timeout
//!   │◀─ 13-byte status envelope (IN 0x81) ─────────│   5 s timeout
//! ```
//!
//! The first two stages must succeed or the whole command fails with a
//! [`TransportError`].  The status stage is treated as advisory: when it times
//! out or returns something that is not a valid status envelope, the work that
//! already reached the device is kept.  A host→device command then reports
//! status `0` and a device→host command returns the bytes it already read.
//!
//! This layer never retries.  Retrying is a policy decision that belongs to
//! the caller (only dimension negotiation does it).
//!
//! The raw endpoints are abstracted behind [`BulkEndpoints`] so the exchange
//! can be tested against an in-memory device.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use dpf_core::protocol::envelope::{
    CommandEnvelope, Direction, EnvelopeError, StatusEnvelope, STATUS_ENVELOPE_LEN,
};

// ── Timeouts ──────────────────────────────────────────────────────────────────

/// Timeout for writing the command envelope.
pub const ENVELOPE_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Timeout for writing a host→device payload.
pub const PAYLOAD_OUT_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Timeout for reading a device→host payload.
pub const PAYLOAD_IN_TIMEOUT: Duration = Duration::from_millis(4_000);

/// Timeout for reading the status envelope.
pub const STATUS_TIMEOUT: Duration = Duration::from_millis(5_000);

// ── Errors ────────────────────────────────────────────────────────────────────

/// A failure reported by a single bulk transfer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("transfer timed out")]
    Timeout,
    #[error("device disconnected")]
    NoDevice,
    #[error("usb error: {0}")]
    Usb(String),
}

/// The stage of a command exchange at which a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    CommandEnvelope,
    PayloadOut,
    PayloadIn,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferStage::CommandEnvelope => "command envelope write",
            TransferStage::PayloadOut => "payload write",
            TransferStage::PayloadIn => "payload read",
        };
        f.write_str(name)
    }
}

/// Error type for a failed command exchange.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A bulk transfer in a mandatory stage failed.
    #[error("{stage} failed: {source}")]
    Transfer {
        stage: TransferStage,
        #[source]
        source: EndpointError,
    },

    /// The device accepted fewer bytes than were written.
    #[error("{stage} was short: {written} of {expected} bytes")]
    ShortWrite {
        stage: TransferStage,
        written: usize,
        expected: usize,
    },

    /// The command body could not be wrapped in an envelope.
    #[error("invalid command envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}

/// Error type for opening the device.
#[derive(Debug, Error)]
pub enum OpenError {
    /// No device with the expected identity is attached.
    #[error("display {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// The device was found but could not be claimed.
    #[error("could not claim display: {0}")]
    Usb(String),
}

// ── Endpoint seam ─────────────────────────────────────────────────────────────

/// The pair of bulk endpoints a command exchange runs over.
///
/// Implemented by the real USB device in the infrastructure layer and by an
/// in-memory device emulator for tests.
pub trait BulkEndpoints: Send {
    /// Writes `data` to the OUT endpoint, returning the number of bytes accepted.
    fn write_out(&mut self, data: &[u8], timeout: Duration) -> Result<usize, EndpointError>;

    /// Reads up to `len` bytes from the IN endpoint.
    fn read_in(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, EndpointError>;
}

impl<E: BulkEndpoints + ?Sized> BulkEndpoints for Box<E> {
    fn write_out(&mut self, data: &[u8], timeout: Duration) -> Result<usize, EndpointError> {
        (**self).write_out(data, timeout)
    }

    fn read_in(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, EndpointError> {
        (**self).read_in(len, timeout)
    }
}

// ── Command exchange ──────────────────────────────────────────────────────────

/// The data phase of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPhase<'a> {
    /// No payload; the command is host→device.
    None,
    /// Write this payload to the device.
    Out(&'a [u8]),
    /// Read this many bytes back from the device.
    In(u32),
}

impl DataPhase<'_> {
    /// Direction flag announced in the command envelope.
    pub fn direction(&self) -> Direction {
        match self {
            DataPhase::None | DataPhase::Out(_) => Direction::HostToDevice,
            DataPhase::In(_) => Direction::DeviceToHost,
        }
    }

    /// Payload length announced in the command envelope.
    pub fn length(&self) -> u32 {
        match self {
            DataPhase::None => 0,
            DataPhase::Out(data) => data.len() as u32,
            DataPhase::In(len) => *len,
        }
    }
}

/// The result of a successful command exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    /// Host→device command: the status byte (`0` when the status stage was
    /// unusable).
    Status(u8),
    /// Device→host command: the bytes read in the data phase.
    Data(Vec<u8>),
}

impl CommandResponse {
    /// Returns the response bytes, or an empty slice for a status response.
    pub fn data(&self) -> &[u8] {
        match self {
            CommandResponse::Status(_) => &[],
            CommandResponse::Data(bytes) => bytes,
        }
    }
}

/// Runs command exchanges over a pair of bulk endpoints.
///
/// Owns the endpoints exclusively; a transport is never shared between
/// threads.
pub struct DeviceTransport<E: BulkEndpoints> {
    endpoints: E,
}

impl<E: BulkEndpoints> DeviceTransport<E> {
    pub fn new(endpoints: E) -> Self {
        Self { endpoints }
    }

    /// Returns a reference to the underlying endpoints.
    pub fn endpoints(&self) -> &E {
        &self.endpoints
    }

    /// Sends one command and runs its data and status stages.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the command body exceeds 16 bytes or
    /// when the envelope write or the data phase fails.  Status-stage
    /// failures are never reported as errors.
    pub fn send_command(
        &mut self,
        command: &[u8],
        phase: DataPhase<'_>,
    ) -> Result<CommandResponse, TransportError> {
        let envelope = CommandEnvelope::new(command, phase.direction(), phase.length())?;
        self.write_all(&envelope.encode(), TransferStage::CommandEnvelope, ENVELOPE_TIMEOUT)?;

        let response = match phase {
            DataPhase::None => None,
            DataPhase::Out(payload) => {
                if !payload.is_empty() {
                    self.write_all(payload, TransferStage::PayloadOut, PAYLOAD_OUT_TIMEOUT)?;
                }
                None
            }
            DataPhase::In(len) => Some(
                self.endpoints
                    .read_in(len as usize, PAYLOAD_IN_TIMEOUT)
                    .map_err(|source| TransportError::Transfer {
                        stage: TransferStage::PayloadIn,
                        source,
                    })?,
            ),
        };

        let status = self.read_status();
        Ok(match response {
            Some(bytes) => CommandResponse::Data(bytes),
            None => CommandResponse::Status(status.map_or(0, |s| s.status)),
        })
    }

    fn write_all(
        &mut self,
        data: &[u8],
        stage: TransferStage,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let written = self
            .endpoints
            .write_out(data, timeout)
            .map_err(|source| TransportError::Transfer { stage, source })?;
        if written != data.len() {
            return Err(TransportError::ShortWrite {
                stage,
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    /// Reads the status envelope, returning `None` when it is unusable.
    fn read_status(&mut self) -> Option<StatusEnvelope> {
        let raw = match self.endpoints.read_in(STATUS_ENVELOPE_LEN, STATUS_TIMEOUT) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("status read failed, treating as no status: {e}");
                return None;
            }
        };
        match StatusEnvelope::decode(&raw) {
            Ok(status) => {
                if status.status != 0 {
                    debug!(
                        status = status.status,
                        residue = status.residue,
                        "device reported non-zero status"
                    );
                }
                Some(status)
            }
            Err(e) => {
                debug!("ignoring invalid status envelope: {e}");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
