//! Stand-in frame renderer.
//!
//! The dashboard itself (telemetry panels, gauges, text) is drawn by a
//! separate renderer.  [`BackgroundRenderer`] fills each frame with the
//! theme's background colour so the daemon runs end to end without it.

use dpf_core::domain::raster::solid;
use dpf_core::{DisplaySettings, RgbImage};

use crate::application::run_loop::FrameRenderer;

/// Renders a solid frame in the theme background colour.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundRenderer;

impl FrameRenderer for BackgroundRenderer {
    fn render(&mut self, width: u16, height: u16, settings: &DisplaySettings) -> RgbImage {
        solid(width, height, settings.theme.palette().background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpf_core::Theme;

    #[test]
    fn test_render_fills_requested_size_with_theme_background() {
        // Arrange
        let settings = DisplaySettings {
            theme: Theme::Neon,
            ..DisplaySettings::default()
        };

        // Act
        let image = BackgroundRenderer.render(48, 20, &settings);

        // Assert
        assert_eq!(image.dimensions(), (48, 20));
        let bg = Theme::Neon.palette().background;
        assert_eq!(*image.get_pixel(0, 0), bg);
        assert_eq!(*image.get_pixel(47, 19), bg);
    }
}
