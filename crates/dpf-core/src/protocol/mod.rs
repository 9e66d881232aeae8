//! Protocol module containing the envelope codec, device opcodes, and pixel encoder.

pub mod commands;
pub mod envelope;
pub mod pixel;

pub use commands::{parse_dimensions, DeviceCommand, DimensionsError};
pub use envelope::{CommandEnvelope, Direction, EnvelopeError, StatusEnvelope};
pub use pixel::{encode_rgb565, EncodedFrame};
