//! # dpf-core
//!
//! Shared library for the big-screen-monitor display daemon containing the
//! USB command-envelope codec, the device opcodes, the RGB565 pixel encoder,
//! and the display domain types (geometry, backlight, themes, images).
//!
//! This crate has no dependencies on USB libraries, OS APIs, or threads.
//! Everything here is pure data and arithmetic (rasters come from the
//! `image` crate), which is what makes it easy to test byte-for-byte against
//! the device's expectations.
//!
//! # Architecture overview (for beginners)
//!
//! The display is a small AX206-class "digital picture frame" board that
//! appears on the USB bus as a vendor-specific device with two bulk
//! endpoints.  The host talks to it with a framing borrowed from USB mass
//! storage: every command is wrapped in a 31-byte *command envelope*, an
//! optional data phase follows, and the device answers with a 13-byte
//! *status envelope*.
//!
//! - **`protocol`** – How bytes travel over the bus.  Command/status
//!   envelopes, the `0xCD`-prefixed vendor opcodes, and the RGB565 frame
//!   encoder that turns an image into the device's packed-pixel format.
//!
//! - **`domain`** – Pure display logic: the negotiated panel geometry,
//!   orientation handling, the UI-to-hardware backlight mapping, theme
//!   palettes, the settings record, and the raster operations (rotation,
//!   scaling, alpha compositing) used to build frames.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `dpf_core::DisplayGeometry` instead of `dpf_core::domain::geometry::DisplayGeometry`.
pub use domain::backlight::BacklightLevel;
pub use domain::geometry::{DisplayGeometry, Orientation};
pub use domain::raster::{Rgb, RgbImage, Rgba, RgbaImage};
pub use domain::settings::DisplaySettings;
pub use domain::theme::{Palette, Theme};
pub use protocol::commands::DeviceCommand;
pub use protocol::envelope::{CommandEnvelope, Direction, EnvelopeError, StatusEnvelope};
pub use protocol::pixel::{encode_rgb565, EncodedFrame};
