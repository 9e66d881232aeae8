//! Binary codec for the command and status envelopes.
//!
//! Wire format (command envelope, 31 bytes):
//! ```text
//! ["USBC":4][tag:4][data_len:4][flags:1][lun:1][cmd_len:1][cmd:16]
//! ```
//!
//! Wire format (status envelope, 13 bytes):
//! ```text
//! ["USBS":4][tag:4][residue:4][status:1]
//! ```
//! All multi-byte integers are little-endian.
//!
//! # Why mass-storage framing? (for beginners)
//!
//! The AX206 firmware reuses the Bulk-Only Transport framing of USB mass
//! storage devices, but the 16-byte command body carries vendor opcodes
//! instead of SCSI commands.  The host never has to guess where a command
//! starts or how much data follows: the envelope says so up front, and the
//! status envelope closes every exchange.

use thiserror::Error;

/// Signature that opens every command envelope.
pub const COMMAND_SIGNATURE: [u8; 4] = *b"USBC";

/// Signature that opens every status envelope.
pub const STATUS_SIGNATURE: [u8; 4] = *b"USBS";

/// Total size of an encoded command envelope in bytes.
pub const COMMAND_ENVELOPE_LEN: usize = 31;

/// Total size of an encoded status envelope in bytes.
pub const STATUS_ENVELOPE_LEN: usize = 13;

/// Maximum length of a command body; shorter bodies are zero-padded.
pub const MAX_COMMAND_LEN: usize = 16;

/// Opaque transfer tag placed in every command envelope.
///
/// The firmware echoes it back in the status envelope but does not otherwise
/// interpret it, so a fixed value is used for every exchange.
pub const TRANSFER_TAG: u32 = 0xDEAD_BEEF;

/// Errors that can occur while building or parsing an envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The command body does not fit in the 16-byte command field.
    #[error("command body is {len} bytes; the envelope holds at most 16")]
    CommandTooLong { len: usize },

    /// The byte slice is not exactly the size of the envelope being parsed.
    #[error("envelope length mismatch: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// The first four bytes are not the expected signature.
    #[error("bad envelope signature: {0:02X?}")]
    BadSignature([u8; 4]),
}

/// Direction of the data phase that follows a command envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host writes the data phase to the OUT endpoint (flag `0x00`).
    HostToDevice,
    /// Device returns the data phase on the IN endpoint (flag `0x80`).
    DeviceToHost,
}

impl Direction {
    /// Returns the envelope flag byte for this direction.
    pub fn flag(self) -> u8 {
        match self {
            Direction::HostToDevice => 0x00,
            Direction::DeviceToHost => 0x80,
        }
    }

    fn from_flag(flag: u8) -> Self {
        if flag & 0x80 != 0 {
            Direction::DeviceToHost
        } else {
            Direction::HostToDevice
        }
    }
}

// ── Command envelope ──────────────────────────────────────────────────────────

/// The 31-byte header written to the OUT endpoint before every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEnvelope {
    /// Opaque tag echoed by the device.
    pub tag: u32,
    /// Number of bytes in the data phase (0 when there is none).
    pub data_length: u32,
    /// Direction of the data phase.
    pub direction: Direction,
    /// Number of meaningful bytes in `command`.
    pub command_length: u8,
    /// Command body, zero-padded to 16 bytes.
    pub command: [u8; MAX_COMMAND_LEN],
}

impl CommandEnvelope {
    /// Builds an envelope around `command`, padding the body to 16 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::CommandTooLong`] if `command` exceeds 16 bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dpf_core::protocol::envelope::{CommandEnvelope, Direction};
    ///
    /// let env = CommandEnvelope::new(&[0xCD, 0, 0, 0, 0, 2], Direction::DeviceToHost, 5).unwrap();
    /// let bytes = env.encode();
    /// assert_eq!(&bytes[0..4], b"USBC");
    /// assert_eq!(bytes[12], 0x80);
    /// ```
    pub fn new(
        command: &[u8],
        direction: Direction,
        data_length: u32,
    ) -> Result<Self, EnvelopeError> {
        if command.len() > MAX_COMMAND_LEN {
            return Err(EnvelopeError::CommandTooLong { len: command.len() });
        }
        let mut padded = [0u8; MAX_COMMAND_LEN];
        padded[..command.len()].copy_from_slice(command);
        Ok(Self {
            tag: TRANSFER_TAG,
            data_length,
            direction,
            command_length: command.len() as u8,
            command: padded,
        })
    }

    /// Encodes the envelope into its 31-byte wire form.
    pub fn encode(&self) -> [u8; COMMAND_ENVELOPE_LEN] {
        let mut buf = [0u8; COMMAND_ENVELOPE_LEN];
        buf[0..4].copy_from_slice(&COMMAND_SIGNATURE);
        buf[4..8].copy_from_slice(&self.tag.to_le_bytes());
        buf[8..12].copy_from_slice(&self.data_length.to_le_bytes());
        buf[12] = self.direction.flag();
        buf[13] = 0x00; // LUN
        buf[14] = self.command_length;
        buf[15..31].copy_from_slice(&self.command);
        buf
    }

    /// Parses a 31-byte command envelope.
    ///
    /// The host never receives command envelopes from the device; this exists
    /// so device simulators and tests can inspect what the host sent.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if the length or signature is wrong.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() != COMMAND_ENVELOPE_LEN {
            return Err(EnvelopeError::WrongLength {
                expected: COMMAND_ENVELOPE_LEN,
                actual: bytes.len(),
            });
        }
        let signature = read_signature(bytes);
        if signature != COMMAND_SIGNATURE {
            return Err(EnvelopeError::BadSignature(signature));
        }
        let mut command = [0u8; MAX_COMMAND_LEN];
        command.copy_from_slice(&bytes[15..31]);
        Ok(Self {
            tag: read_u32_le(bytes, 4),
            data_length: read_u32_le(bytes, 8),
            direction: Direction::from_flag(bytes[12]),
            command_length: bytes[14],
            command,
        })
    }

    /// Returns the meaningful part of the command body.
    pub fn command_body(&self) -> &[u8] {
        let len = (self.command_length as usize).min(MAX_COMMAND_LEN);
        &self.command[..len]
    }
}

// ── Status envelope ───────────────────────────────────────────────────────────

/// The 13-byte trailer the device returns after every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEnvelope {
    /// Tag echoed from the command envelope.
    pub tag: u32,
    /// Difference between the announced and the transferred data length.
    pub residue: u32,
    /// Status code; `0` means the command passed.
    pub status: u8,
}

impl StatusEnvelope {
    /// Parses a status envelope.
    ///
    /// A response is only trusted when it is exactly 13 bytes long and starts
    /// with `"USBS"`.  Anything else is rejected so callers can treat it as
    /// "no status".
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::WrongLength`] or [`EnvelopeError::BadSignature`].
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() != STATUS_ENVELOPE_LEN {
            return Err(EnvelopeError::WrongLength {
                expected: STATUS_ENVELOPE_LEN,
                actual: bytes.len(),
            });
        }
        let signature = read_signature(bytes);
        if signature != STATUS_SIGNATURE {
            return Err(EnvelopeError::BadSignature(signature));
        }
        Ok(Self {
            tag: read_u32_le(bytes, 4),
            residue: read_u32_le(bytes, 8),
            status: bytes[12],
        })
    }

    /// Encodes the status envelope into its 13-byte wire form.
    pub fn encode(&self) -> [u8; STATUS_ENVELOPE_LEN] {
        let mut buf = [0u8; STATUS_ENVELOPE_LEN];
        buf[0..4].copy_from_slice(&STATUS_SIGNATURE);
        buf[4..8].copy_from_slice(&self.tag.to_le_bytes());
        buf[8..12].copy_from_slice(&self.residue.to_le_bytes());
        buf[12] = self.status;
        buf
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_signature(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
