//! IntroAnimator: the fade-in / hold / fade-out logo animation.
//!
//! The animation plays at startup and whenever the orientation changes.  All
//! frames are composited and encoded *before* the first one is sent, so the
//! frame rate is bounded only by the USB transfer time.
//!
//! # Sequence
//!
//! With the default `8 / 8 / 6` configuration the panel receives 23 frames:
//!
//! ```text
//!  fade-in  │ 8 frames, logo grows 50% → 100% (ease-out) and fades in
//!  hold     │ 8 × the last fade-in frame
//!  fade-out │ 6 frames, full-size logo at alpha 255 → 255/6
//!  clear    │ 1 frame of plain background
//! ```

use dpf_core::domain::emblem::render_emblem;
use dpf_core::domain::raster::{composite, scale_logo, solid};
use dpf_core::{DisplayGeometry, EncodedFrame, Orientation, Palette, Rgb, RgbaImage};
use tracing::{debug, warn};

use crate::application::driver::{encode_for, FrameWriter};

/// Frame counts for each phase of the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntroConfig {
    pub frames_in: u32,
    pub frames_hold: u32,
    pub frames_out: u32,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            frames_in: 8,
            frames_hold: 8,
            frames_out: 6,
        }
    }
}

/// Logo size and opacity for one animation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Fraction of the logo's full size, `0.5..=1.0`.
    pub scale: f64,
    pub alpha: u8,
}

impl IntroConfig {
    /// Total number of frame writes one playback performs.
    pub fn total_frames(&self) -> usize {
        (self.frames_in + self.frames_hold + self.frames_out) as usize + 1
    }

    /// Fade-in schedule: frame `i` of `n` has alpha `round(255 * i / n)` and
    /// grows from half size with an ease-out curve.
    pub fn fade_in_steps(&self) -> Vec<Step> {
        let n = self.frames_in;
        (1..=n)
            .map(|i| {
                let progress = f64::from(i) / f64::from(n);
                let ease_out = 1.0 - (1.0 - progress) * (1.0 - progress);
                Step {
                    scale: 0.5 + 0.5 * ease_out,
                    alpha: alpha_for(progress),
                }
            })
            .collect()
    }

    /// Fade-out schedule: full size, alpha descending from 255 to
    /// `round(255 / n)`.
    pub fn fade_out_steps(&self) -> Vec<Step> {
        let n = self.frames_out;
        (1..=n)
            .rev()
            .map(|i| Step {
                scale: 1.0,
                alpha: alpha_for(f64::from(i) / f64::from(n)),
            })
            .collect()
    }
}

/// Where the intro's logo comes from.
#[derive(Debug, Clone, Default)]
pub enum Logo {
    /// The built-in emblem, drawn in the current theme's colours.
    #[default]
    Emblem,
    /// A decoded logo file.
    Image(RgbaImage),
    /// A logo file was configured but could not be loaded; the intro is
    /// skipped.
    Unavailable,
}

/// A fully precomputed animation, ready to stream.
#[derive(Debug, Clone)]
pub struct IntroSequence {
    fade_in: Vec<EncodedFrame>,
    hold: usize,
    fade_out: Vec<EncodedFrame>,
    clear: EncodedFrame,
}

impl IntroSequence {
    /// Frames in transmission order: fade-in, hold, fade-out, clear.
    pub fn frames(&self) -> impl Iterator<Item = &EncodedFrame> + '_ {
        let hold = self.fade_in.last().map_or(0, |_| self.hold);
        self.fade_in
            .iter()
            .chain(self.fade_in.last().into_iter().cycle().take(hold))
            .chain(self.fade_out.iter())
            .chain(std::iter::once(&self.clear))
    }

    /// Number of frames [`IntroSequence::frames`] yields.
    pub fn len(&self) -> usize {
        self.frames().count()
    }

    /// Always `false`: every sequence ends with the clear frame.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Outcome of one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntroReport {
    pub frames_written: usize,
    pub frames_dropped: usize,
}

/// Builds and plays the intro animation.
#[derive(Debug, Clone, Default)]
pub struct IntroAnimator {
    config: IntroConfig,
    logo: Logo,
}

/// Logo height for a logical canvas: half the height in landscape, 30% in
/// portrait.  Returns `None` when the result would be empty.
pub fn logo_height_for(logical_height: u16, orientation: Orientation) -> Option<u16> {
    let h = match orientation {
        Orientation::Horizontal => logical_height as u32 / 2,
        Orientation::Vertical => logical_height as u32 * 3 / 10,
    };
    (h > 0).then_some(h as u16)
}

impl IntroAnimator {
    pub fn new(config: IntroConfig) -> Self {
        Self {
            config,
            logo: Logo::default(),
        }
    }

    /// Replaces the built-in emblem with `logo`.
    pub fn with_logo(mut self, logo: Logo) -> Self {
        self.logo = logo;
        self
    }

    /// Produces the logo sized for `geometry` and `orientation`.
    ///
    /// A logo file keeps its aspect ratio.  Returns `None` when the panel is
    /// too small to show a logo or the configured file was unavailable.
    pub fn logo_for(
        &self,
        geometry: DisplayGeometry,
        orientation: Orientation,
        palette: &Palette,
    ) -> Option<RgbaImage> {
        let (_, logical_h) = geometry.logical_size(orientation);
        let h = logo_height_for(logical_h, orientation)?;
        match &self.logo {
            Logo::Emblem => Some(render_emblem(h, palette)),
            Logo::Image(source) => {
                let (src_w, src_h) = source.dimensions();
                let w = u64::from(src_w) * u64::from(h) / u64::from(src_h.max(1));
                let w = u32::try_from(w).unwrap_or(u32::MAX);
                Some(scale_logo(source, w, h.into()))
            }
            Logo::Unavailable => None,
        }
    }

    /// Composites and encodes every frame of the animation.
    pub fn precompute(
        &self,
        logo: &RgbaImage,
        background: Rgb<u8>,
        geometry: DisplayGeometry,
        orientation: Orientation,
    ) -> IntroSequence {
        let (width, height) = geometry.logical_size(orientation);
        let canvas = solid(width, height, background);
        let render = |step: Step| -> EncodedFrame {
            let w = (f64::from(logo.width()) * step.scale) as u32;
            let h = (f64::from(logo.height()) * step.scale) as u32;
            if w == 0 || h == 0 || step.alpha == 0 {
                return encode_for(&canvas, orientation);
            }
            let scaled = scale_logo(logo, w, h);
            let x = (i64::from(width) - i64::from(w)).div_euclid(2);
            let y = (i64::from(height) - i64::from(h)).div_euclid(2);
            encode_for(&composite(&canvas, &scaled, x, y, step.alpha), orientation)
        };

        IntroSequence {
            fade_in: self.config.fade_in_steps().into_iter().map(render).collect(),
            hold: self.config.frames_hold as usize,
            fade_out: self.config.fade_out_steps().into_iter().map(render).collect(),
            clear: encode_for(&canvas, orientation),
        }
    }

    /// Streams `sequence` to `writer`.
    ///
    /// A failed write is logged and the frame skipped; playback continues
    /// with the next frame.
    pub fn play<W: FrameWriter + ?Sized>(
        &self,
        sequence: &IntroSequence,
        writer: &mut W,
    ) -> IntroReport {
        let mut report = IntroReport::default();
        for (index, frame) in sequence.frames().enumerate() {
            match writer.write_frame(frame) {
                Ok(()) => report.frames_written += 1,
                Err(e) => {
                    warn!(frame = index, "intro frame dropped: {e}");
                    report.frames_dropped += 1;
                }
            }
        }
        debug!(
            written = report.frames_written,
            dropped = report.frames_dropped,
            "intro finished"
        );
        report
    }

    /// Sizes the logo, precomputes the animation for the writer's geometry,
    /// and plays it.
    ///
    /// Returns `None` (after logging) when no logo can be produced.
    pub fn run<W: FrameWriter + ?Sized>(
        &self,
        writer: &mut W,
        orientation: Orientation,
        palette: &Palette,
    ) -> Option<IntroReport> {
        let geometry = writer.geometry();
        let Some(logo) = self.logo_for(geometry, orientation, palette) else {
            if matches!(self.logo, Logo::Unavailable) {
                warn!("intro logo unavailable; skipping intro");
            } else {
                warn!("panel {geometry} too small for the intro logo; skipping intro");
            }
            return None;
        };
        let sequence = self.precompute(&logo, palette.background, geometry, orientation);
        Some(self.play(&sequence, writer))
    }
}

fn alpha_for(progress: f64) -> u8 {
    (255.0 * progress).round().clamp(0.0, 255.0) as u8
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::driver::DriverError;
    use dpf_core::{Rgba, Theme};

    /// Records every frame instead of sending it.
    struct RecordingWriter {
        geometry: DisplayGeometry,
        frames: Vec<EncodedFrame>,
        fail_every: Option<usize>,
        calls: usize,
    }

    impl RecordingWriter {
        fn new(width: u16, height: u16) -> Self {
            Self {
                geometry: DisplayGeometry::new(width, height).unwrap(),
                frames: Vec::new(),
                fail_every: None,
                calls: 0,
            }
        }
    }

    impl FrameWriter for RecordingWriter {
        fn geometry(&self) -> DisplayGeometry {
            self.geometry
        }

        fn write_frame(&mut self, frame: &EncodedFrame) -> Result<(), DriverError> {
            self.calls += 1;
            if self.fail_every.is_some_and(|n| self.calls % n == 0) {
                return Err(DriverError::Closed);
            }
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    fn play_default(writer: &mut RecordingWriter, orientation: Orientation) -> IntroReport {
        IntroAnimator::default()
            .run(writer, orientation, &Theme::Dark.palette())
            .unwrap()
    }

    #[test]
    fn test_default_config_writes_23_frames() {
        // Arrange
        let mut writer = RecordingWriter::new(64, 48);

        // Act
        let report = play_default(&mut writer, Orientation::Horizontal);

        // Assert
        assert_eq!(report.frames_written, 23);
        assert_eq!(writer.frames.len(), 23);
        assert_eq!(IntroConfig::default().total_frames(), 23);
    }

    #[test]
    fn test_hold_frames_repeat_last_fade_in_frame() {
        let mut writer = RecordingWriter::new(64, 48);

        play_default(&mut writer, Orientation::Horizontal);

        let last_fade_in = &writer.frames[7];
        for hold in &writer.frames[8..16] {
            assert_eq!(hold, last_fade_in);
        }
        assert_ne!(&writer.frames[6], last_fade_in);
    }

    #[test]
    fn test_first_fade_out_frame_matches_full_logo() {
        // Fade-in ends at scale 1.0, alpha 255; fade-out starts at the same point.
        let mut writer = RecordingWriter::new(64, 48);

        play_default(&mut writer, Orientation::Horizontal);

        assert_eq!(writer.frames[16], writer.frames[7]);
    }

    #[test]
    fn test_last_frame_is_plain_background() {
        // Arrange
        let palette = Theme::Dark.palette();
        let mut writer = RecordingWriter::new(64, 48);

        // Act
        play_default(&mut writer, Orientation::Horizontal);

        // Assert
        let expected = EncodedFrame::encode(&solid(64, 48, palette.background));
        assert_eq!(writer.frames.last(), Some(&expected));
        assert_ne!(writer.frames[21], expected);
    }

    #[test]
    fn test_every_frame_has_native_geometry_in_portrait() {
        let mut writer = RecordingWriter::new(64, 48);

        play_default(&mut writer, Orientation::Vertical);

        for frame in &writer.frames {
            assert_eq!((frame.width(), frame.height()), (64, 48));
            assert!(frame.is_consistent());
        }
    }

    #[test]
    fn test_custom_config_changes_frame_count() {
        let animator = IntroAnimator::new(IntroConfig {
            frames_in: 2,
            frames_hold: 1,
            frames_out: 3,
        });
        let mut writer = RecordingWriter::new(32, 32);

        let report = animator
            .run(&mut writer, Orientation::Horizontal, &Theme::Neon.palette())
            .unwrap();

        assert_eq!(report.frames_written, 7);
    }

    #[test]
    fn test_failed_writes_are_counted_and_playback_continues() {
        // Arrange
        let mut writer = RecordingWriter::new(32, 32);
        writer.fail_every = Some(2);

        // Act
        let report = play_default(&mut writer, Orientation::Horizontal);

        // Assert
        assert_eq!(report.frames_dropped, 11);
        assert_eq!(report.frames_written, 12);
    }

    #[test]
    fn test_tiny_panel_skips_intro() {
        let mut writer = RecordingWriter::new(8, 1);

        let report = IntroAnimator::default().run(
            &mut writer,
            Orientation::Horizontal,
            &Theme::Dark.palette(),
        );

        assert_eq!(report, None);
        assert!(writer.frames.is_empty());
    }

    #[test]
    fn test_logo_height_is_half_in_landscape_and_30_percent_in_portrait() {
        assert_eq!(logo_height_for(480, Orientation::Horizontal), Some(240));
        assert_eq!(logo_height_for(800, Orientation::Vertical), Some(240));
        assert_eq!(logo_height_for(1, Orientation::Horizontal), None);
    }

    #[test]
    fn test_zero_frame_phases_still_clear_the_screen() {
        let animator = IntroAnimator::new(IntroConfig {
            frames_in: 0,
            frames_hold: 5,
            frames_out: 0,
        });
        let logo = RgbaImage::new(4, 4);

        let sequence = animator.precompute(
            &logo,
            Rgb([1, 2, 3]),
            DisplayGeometry::new(8, 8).unwrap(),
            Orientation::Horizontal,
        );

        assert_eq!(sequence.len(), 1);
    }

    #[test]
    fn test_fade_schedules_follow_rounded_alpha_ramps() {
        // Arrange
        let config = IntroConfig::default();

        // Act
        let fade_in: Vec<u8> = config.fade_in_steps().iter().map(|s| s.alpha).collect();
        let fade_out: Vec<u8> = config.fade_out_steps().iter().map(|s| s.alpha).collect();

        // Assert
        assert_eq!(fade_in, vec![32, 64, 96, 128, 159, 191, 223, 255]);
        assert_eq!(fade_out, vec![255, 213, 170, 128, 85, 43]);
        let scales: Vec<f64> = config.fade_in_steps().iter().map(|s| s.scale).collect();
        assert!(scales.windows(2).all(|w| w[0] < w[1]));
        assert!(scales[0] > 0.5);
        assert_eq!(scales[7], 1.0);
        assert!(config.fade_out_steps().iter().all(|s| s.scale == 1.0));
    }

    #[test]
    fn test_centre_pixel_follows_fade_ramp() {
        // Arrange: opaque white logo over black; the centre stays covered at
        // every scale, so its level tracks the frame's alpha.
        let logo = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let geometry = DisplayGeometry::new(8, 8).unwrap();
        let config = IntroConfig::default();
        let mut alphas: Vec<u8> = config.fade_in_steps().iter().map(|s| s.alpha).collect();
        alphas.extend(std::iter::repeat(255).take(config.frames_hold as usize));
        alphas.extend(config.fade_out_steps().iter().map(|s| s.alpha));
        alphas.push(0);

        // Act
        let sequence = IntroAnimator::default().precompute(
            &logo,
            Rgb([0, 0, 0]),
            geometry,
            Orientation::Horizontal,
        );

        // Assert: red5 of pixel (4, 4) is the high byte's top five bits
        let centre = (4 * 8 + 4) * 2;
        let red5: Vec<u8> = sequence.frames().map(|f| f.data()[centre] >> 3).collect();
        assert_eq!(red5.len(), 23);
        for (index, (&level, &alpha)) in red5.iter().zip(&alphas).enumerate() {
            let exact = alpha >> 3;
            let truncated = alpha.saturating_sub(1) >> 3;
            assert!(
                level == exact || level == truncated,
                "frame {index}: red5 {level}, alpha {alpha}"
            );
        }
        assert_eq!(red5[7], 31);
        assert!(red5[8..17].iter().all(|&v| v == 31));
        assert!(red5[16..22].windows(2).all(|w| w[0] > w[1]));
        assert_eq!(red5[22], 0);
    }

    #[test]
    fn test_logo_file_is_scaled_to_target_height_keeping_aspect() {
        // Arrange: 40×20 source, 64×48 landscape panel → 24 px high
        let source = RgbaImage::from_pixel(40, 20, Rgba([9, 9, 9, 255]));
        let animator = IntroAnimator::default().with_logo(Logo::Image(source));
        let geometry = DisplayGeometry::new(64, 48).unwrap();

        // Act
        let logo = animator
            .logo_for(geometry, Orientation::Horizontal, &Theme::Dark.palette())
            .unwrap();

        // Assert
        assert_eq!(logo.dimensions(), (48, 24));
    }

    #[test]
    fn test_emblem_is_square_at_portrait_height() {
        let geometry = DisplayGeometry::new(800, 480).unwrap();

        let logo = IntroAnimator::default()
            .logo_for(geometry, Orientation::Vertical, &Theme::Dark.palette())
            .unwrap();

        assert_eq!(logo.dimensions(), (240, 240));
    }

    #[test]
    fn test_unavailable_logo_skips_intro() {
        // Arrange
        let animator = IntroAnimator::default().with_logo(Logo::Unavailable);
        let mut writer = RecordingWriter::new(64, 48);

        // Act
        let report = animator.run(&mut writer, Orientation::Horizontal, &Theme::Dark.palette());

        // Assert
        assert_eq!(report, None);
        assert!(writer.frames.is_empty());
    }
}
