//! The built-in intro emblem.
//!
//! Used when no logo file is configured: an accent-coloured ring around a
//! panel-coloured face with a smaller disc in the theme's text colour.
//! Edges are anti-aliased by computing each pixel's coverage from its
//! distance to the centre.

use crate::domain::raster::{Rgb, Rgba, RgbaImage};
use crate::domain::theme::Palette;

/// Inner radius of the ring as a fraction of the outer radius.
const RING_INNER_RATIO: f32 = 0.78;

/// Radius of the centre disc as a fraction of the outer radius.
const DISC_RATIO: f32 = 0.46;

/// Renders a square emblem `size` pixels across.
///
/// `size` is raised to at least 1.  Pixels outside the outer ring are fully
/// transparent.
pub fn render_emblem(size: u16, palette: &Palette) -> RgbaImage {
    let size = u32::from(size.max(1));
    let centre = size as f32 / 2.0;
    let outer = centre - 1.0;
    let inner = outer * RING_INNER_RATIO;
    let disc = outer * DISC_RATIO;

    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - centre;
        let dy = y as f32 + 0.5 - centre;
        let d = (dx * dx + dy * dy).sqrt();

        let (colour, cov) = if coverage_inside(d, disc) > 0.0 {
            (palette.text, coverage_inside(d, disc))
        } else if coverage_inside(d, inner) > 0.0 {
            (palette.panel, coverage_inside(d, inner))
        } else {
            (palette.accent, coverage_inside(d, outer))
        };
        with_alpha(colour, (cov * 255.0).round() as u8)
    })
}

fn with_alpha(Rgb([r, g, b]): Rgb<u8>, alpha: u8) -> Rgba<u8> {
    Rgba([r, g, b, alpha])
}

/// Fraction of a pixel centred at distance `d` that lies within `radius`.
fn coverage_inside(d: f32, radius: f32) -> f32 {
    (radius + 0.5 - d).clamp(0.0, 1.0)
}
