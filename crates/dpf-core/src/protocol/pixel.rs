//! RGB565 frame encoder.
//!
//! The panel consumes 16 bits per pixel, high byte first:
//!
//! ```text
//!  byte 0            byte 1
//! [R R R R R G G G] [G G G B B B B B]
//! ```
//!
//! Red and blue keep their top 5 bits, green its top 6 bits.  The encoder is
//! a pure function of the image: it knows nothing about the device or the
//! orientation, so any rotation must already have been applied.

use crate::domain::raster::{Rgb, RgbImage};

/// Bytes per encoded pixel.
pub const BYTES_PER_PIXEL: usize = 2;

/// Packs one RGB888 pixel into big-endian RGB565 bytes.
#[inline]
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> [u8; 2] {
    let value = ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3);
    value.to_be_bytes()
}

/// Encodes a row-major RGB image into the packed wire format.
///
/// The returned buffer is always `width * height * 2` bytes long.
///
/// # Examples
///
/// ```rust
/// use dpf_core::domain::raster::{solid, Rgb};
/// use dpf_core::protocol::pixel::encode_rgb565;
///
/// let image = solid(4, 3, Rgb([255, 0, 0]));
/// let buf = encode_rgb565(&image);
/// assert_eq!(buf.len(), 4 * 3 * 2);
/// assert_eq!(&buf[0..2], &[0xF8, 0x00]);
/// ```
pub fn encode_rgb565(image: &RgbImage) -> Vec<u8> {
    let pixels = image.width() as usize * image.height() as usize;
    let mut out = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
    for &Rgb([r, g, b]) in image.pixels() {
        out.extend_from_slice(&pack_rgb565(r, g, b));
    }
    out
}

/// A packed frame together with the dimensions it was encoded against.
///
/// Frames are immutable once built; the intro animation precomputes a whole
/// sequence of them and replays them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl EncodedFrame {
    /// Encodes `image` into a new frame.
    ///
    /// Images wider or taller than `u16::MAX` cannot be addressed by the
    /// frame-write command; their dimensions saturate, which leaves the
    /// frame inconsistent so it is refused before it reaches the bus.
    pub fn encode(image: &RgbImage) -> Self {
        Self {
            width: u16::try_from(image.width()).unwrap_or(u16::MAX),
            height: u16::try_from(image.height()).unwrap_or(u16::MAX),
            data: encode_rgb565(image),
        }
    }

    /// Wraps an already packed buffer.
    ///
    /// No length check is made here; [`EncodedFrame::expected_len`] and
    /// [`EncodedFrame::is_consistent`] let the submitting side verify it.
    pub fn from_raw(width: u16, height: u16, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// Width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Packed pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The buffer length implied by the frame's dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Returns `true` when the buffer length matches the dimensions.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.expected_len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
