//! Frame and logo rasters.
//!
//! Frames are [`RgbImage`]s and logos are [`RgbaImage`]s from the `image`
//! crate.  This module adds the few operations the driver and the intro
//! animation need on top of them: turning a portrait canvas back into the
//! panel's native layout, resampling a logo, and compositing it over a
//! background at a given opacity.
//!
//! # Coordinate system
//!
//! `(0, 0)` is the top-left pixel; `x` grows to the right and `y` downwards.

use image::imageops::{self, FilterType};
use image::DynamicImage;

pub use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Creates a `width × height` frame filled with one colour.
pub fn solid(width: u16, height: u16, colour: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width.into(), height.into(), colour)
}

/// Rotates a logical portrait frame 90° counter-clockwise into the panel's
/// native layout.
///
/// The source pixel `(x, y)` lands at `(y, width - 1 - x)` in the result.
pub fn rotate_to_native(logical: &RgbImage) -> RgbImage {
    imageops::rotate270(logical)
}

/// Resamples `logo` to `width × height` with a Lanczos filter.
///
/// Both target dimensions are raised to at least 1.
pub fn scale_logo(logo: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (width, height) = (width.max(1), height.max(1));
    if logo.dimensions() == (width, height) {
        return logo.clone();
    }
    imageops::resize(logo, width, height, FilterType::Lanczos3)
}

/// Returns a copy of `logo` with every alpha value scaled by `opacity / 255`
/// (truncating).
pub fn with_opacity(logo: &RgbaImage, opacity: u8) -> RgbaImage {
    let mut faded = logo.clone();
    for px in faded.pixels_mut() {
        px[3] = (u16::from(px[3]) * u16::from(opacity) / 255) as u8;
    }
    faded
}

/// Composites `logo` over `background` with its top-left corner at `(x, y)`
/// and its alpha scaled by `opacity`.
///
/// Parts of the logo outside the background are clipped.
pub fn composite(
    background: &RgbImage,
    logo: &RgbaImage,
    x: i64,
    y: i64,
    opacity: u8,
) -> RgbImage {
    if opacity == 0 {
        return background.clone();
    }
    let mut canvas = DynamicImage::ImageRgb8(background.clone()).into_rgba8();
    imageops::overlay(&mut canvas, &with_opacity(logo, opacity), x, y);
    DynamicImage::ImageRgba8(canvas).into_rgb8()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
