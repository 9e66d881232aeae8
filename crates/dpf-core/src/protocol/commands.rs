//! Vendor opcodes understood by the AX206 firmware.
//!
//! Every command body starts with the lead byte `0xCD`.  The remaining bytes
//! were recovered by observing the device; their individual meaning is not
//! documented, so they are kept here as opaque constants rather than being
//! modelled as fields.
//!
//! | Command          | Direction      | Data phase                   |
//! |------------------|----------------|------------------------------|
//! | `QueryDimensions`| device → host  | 5 bytes: w lo/hi, h lo/hi, reserved |
//! | `SetBacklight`   | host → device  | none                         |
//! | `WriteFrame`     | host → device  | `width * height * 2` RGB565 bytes |

use thiserror::Error;

use crate::domain::backlight::BacklightLevel;
use crate::domain::geometry::DisplayGeometry;
use crate::protocol::envelope::{Direction, MAX_COMMAND_LEN};

/// Lead byte of every vendor command.
pub const OPCODE_LEAD: u8 = 0xCD;

/// Sub-opcode at offset 5 selecting the "get property" command group.
const GROUP_QUERY: u8 = 0x02;

/// Sub-opcode at offset 5 selecting the "set property / blit" command group.
const GROUP_SET: u8 = 0x06;

/// Operation at offset 6 for the backlight property.
const OP_BACKLIGHT: u8 = 0x01;

/// Operation at offset 6 for a rectangular frame blit.
const OP_BLIT: u8 = 0x12;

/// Offset of the hardware backlight level within the command body.
pub const BACKLIGHT_LEVEL_OFFSET: usize = 9;

/// Length of the dimension query response.
pub const DIMENSIONS_RESPONSE_LEN: u32 = 5;

/// A vendor command ready to be wrapped in a command envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Ask the panel for its native resolution.
    QueryDimensions,
    /// Set the backlight to a hardware level (1–7).
    SetBacklight(BacklightLevel),
    /// Blit a full frame whose bottom-right corner is `(x1, y1)`.
    ///
    /// The top-left corner is always `(0, 0)`.
    WriteFrame { x1: u16, y1: u16 },
}

impl DeviceCommand {
    /// Builds the frame-write command for a `width × height` buffer.
    pub fn write_frame(width: u16, height: u16) -> Self {
        DeviceCommand::WriteFrame {
            x1: width.saturating_sub(1),
            y1: height.saturating_sub(1),
        }
    }

    /// Returns the 16-byte command body.
    pub fn body(&self) -> [u8; MAX_COMMAND_LEN] {
        match *self {
            DeviceCommand::QueryDimensions => [
                OPCODE_LEAD, 0, 0, 0, 0, GROUP_QUERY, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
            DeviceCommand::SetBacklight(level) => {
                let mut body = [
                    OPCODE_LEAD, 0, 0, 0, 0, GROUP_SET, OP_BACKLIGHT, 0x01, 0, 0, 0, 0, 0, 0, 0, 0,
                ];
                body[BACKLIGHT_LEVEL_OFFSET] = level.get();
                body
            }
            DeviceCommand::WriteFrame { x1, y1 } => {
                let [x_lo, x_hi] = x1.to_le_bytes();
                let [y_lo, y_hi] = y1.to_le_bytes();
                [
                    OPCODE_LEAD, 0, 0, 0, 0, GROUP_SET, OP_BLIT, 0, 0, 0, 0, x_lo, x_hi, y_lo,
                    y_hi, 0,
                ]
            }
        }
    }

    /// Returns the direction of this command's data phase.
    pub fn direction(&self) -> Direction {
        match self {
            DeviceCommand::QueryDimensions => Direction::DeviceToHost,
            DeviceCommand::SetBacklight(_) | DeviceCommand::WriteFrame { .. } => {
                Direction::HostToDevice
            }
        }
    }

    /// Recognises a command body produced by [`DeviceCommand::body`].
    ///
    /// Returns `None` for bodies this crate never sends.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        if body.len() < 7 || body[0] != OPCODE_LEAD {
            return None;
        }
        match (body[5], body[6]) {
            (GROUP_QUERY, _) => Some(DeviceCommand::QueryDimensions),
            (GROUP_SET, OP_BACKLIGHT) if body.len() > BACKLIGHT_LEVEL_OFFSET => {
                BacklightLevel::new(body[BACKLIGHT_LEVEL_OFFSET]).map(DeviceCommand::SetBacklight)
            }
            (GROUP_SET, OP_BLIT) if body.len() >= 15 => Some(DeviceCommand::WriteFrame {
                x1: u16::from_le_bytes([body[11], body[12]]),
                y1: u16::from_le_bytes([body[13], body[14]]),
            }),
            _ => None,
        }
    }
}

/// Reasons a dimension query response cannot be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DimensionsError {
    /// The response is not exactly 5 bytes.
    #[error("dimension response must be 5 bytes, got {0}")]
    WrongLength(usize),

    /// The device reported a zero width or height.
    #[error("device reported zero dimensions ({width}x{height})")]
    Zero { width: u16, height: u16 },
}

/// Parses the 5-byte dimension query response.
///
/// # Errors
///
/// Returns [`DimensionsError`] when the response is malformed or reports a
/// zero-sized panel.
///
/// # Examples
///
/// ```rust
/// use dpf_core::protocol::commands::parse_dimensions;
///
/// let geometry = parse_dimensions(&[0x20, 0x03, 0xE0, 0x01, 0x00]).unwrap();
/// assert_eq!((geometry.width, geometry.height), (800, 480));
/// ```
pub fn parse_dimensions(response: &[u8]) -> Result<DisplayGeometry, DimensionsError> {
    if response.len() != DIMENSIONS_RESPONSE_LEN as usize {
        return Err(DimensionsError::WrongLength(response.len()));
    }
    let width = u16::from_le_bytes([response[0], response[1]]);
    let height = u16::from_le_bytes([response[2], response[3]]);
    DisplayGeometry::new(width, height).ok_or(DimensionsError::Zero { width, height })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
