//! The display loop: settings polling, rendering and frame submission.
//!
//! # One cycle (for beginners)
//!
//! The loop runs on a single blocking thread that owns the USB device:
//!
//! 1. Every `settings_poll_interval` (5 s by default) the settings record is
//!    re-read.  A changed brightness is sent to the backlight; a changed
//!    orientation replays the intro animation for the new orientation.
//! 2. The renderer draws one image at the current logical size.
//! 3. The driver rotates, encodes and sends it.
//! 4. The loop sleeps for `cycle_interval` (1 s by default).
//!
//! Nothing that goes wrong inside a cycle stops the loop.  Errors are logged
//! here, at the loop boundary, and the next cycle starts as usual.
//!
//! The settings source and the renderer are injected through the
//! [`SettingsSource`] and [`FrameRenderer`] traits so the loop can be tested
//! without a settings file or a real dashboard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use dpf_core::{DisplaySettings, Palette, RgbImage};
use tracing::{debug, info, warn};

use crate::application::driver::DisplayDriver;
use crate::application::intro::{IntroAnimator, IntroConfig, Logo};
use crate::application::transport::BulkEndpoints;

/// Longest single sleep while waiting for the next cycle, so a shutdown
/// request is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Supplies the current settings record.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsSource: Send {
    /// Returns the current settings.  Sources fall back to defaults rather
    /// than failing.
    fn load(&self) -> DisplaySettings;
}

/// Produces one dashboard image per cycle.
#[cfg_attr(test, mockall::automock)]
pub trait FrameRenderer: Send {
    /// Renders an image of exactly `width × height` logical pixels.
    fn render(&mut self, width: u16, height: u16, settings: &DisplaySettings) -> RgbImage;
}

/// Timing and intro settings for the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    pub cycle_interval: Duration,
    pub settings_poll_interval: Duration,
    pub intro_enabled: bool,
    pub intro: IntroConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_millis(1_000),
            settings_poll_interval: Duration::from_millis(5_000),
            intro_enabled: true,
            intro: IntroConfig::default(),
        }
    }
}

/// Owns the driver and runs the render/draw cycle.
pub struct DisplayLoop<E, S, R>
where
    E: BulkEndpoints,
    S: SettingsSource,
    R: FrameRenderer,
{
    driver: DisplayDriver<E>,
    source: S,
    renderer: R,
    config: LoopConfig,
    animator: IntroAnimator,
    settings: DisplaySettings,
    palette: Palette,
    last_poll: Option<Instant>,
}

impl<E, S, R> DisplayLoop<E, S, R>
where
    E: BulkEndpoints,
    S: SettingsSource,
    R: FrameRenderer,
{
    /// Creates a loop around a driver that has already been brought up.
    pub fn new(driver: DisplayDriver<E>, source: S, renderer: R, config: LoopConfig) -> Self {
        let settings = DisplaySettings::default();
        Self {
            driver,
            source,
            renderer,
            animator: IntroAnimator::new(config.intro),
            config,
            palette: settings.theme.palette(),
            settings,
            last_poll: None,
        }
    }

    /// Uses `logo` for the intro instead of the built-in emblem.
    pub fn with_logo(mut self, logo: Logo) -> Self {
        self.animator = self.animator.with_logo(logo);
        self
    }

    pub fn driver(&self) -> &DisplayDriver<E> {
        &self.driver
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    /// Loads the settings, applies the initial backlight, and plays the intro.
    pub fn start(&mut self) {
        self.adopt(self.source.load());
        self.last_poll = Some(Instant::now());
        self.apply_backlight();
        self.play_intro();
    }

    /// Runs one cycle at time `now`: poll settings if due, render, draw.
    pub fn tick(&mut self, now: Instant) {
        let poll_interval = self.config.settings_poll_interval;
        let due = self
            .last_poll
            .map_or(true, |at| now.saturating_duration_since(at) >= poll_interval);
        if due {
            self.poll_settings();
            self.last_poll = Some(now);
        }

        let (width, height) = self.driver.geometry().logical_size(self.settings.orientation);
        let image = self.renderer.render(width, height, &self.settings);
        if let Err(e) = self.driver.draw(&image, &self.settings) {
            warn!("frame dropped: {e}");
        }
    }

    /// Re-reads the settings and reacts to brightness and orientation changes.
    pub fn poll_settings(&mut self) {
        let fresh = self.source.load();
        let brightness_changed = fresh.brightness != self.settings.brightness;
        let orientation_changed = fresh.orientation != self.settings.orientation;
        if fresh.theme != self.settings.theme {
            debug!(theme = fresh.theme.as_str(), "theme changed");
        }
        self.adopt(fresh);

        if brightness_changed {
            self.apply_backlight();
        }
        if orientation_changed {
            info!(
                orientation = self.settings.orientation.as_str(),
                "orientation changed"
            );
            self.play_intro();
        }
    }

    /// Runs cycles until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            self.tick(Instant::now());
            sleep_while_running(running, self.config.cycle_interval);
        }
    }

    /// Dims the backlight to its lowest level and closes the driver.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.driver.set_backlight(0.0) {
            warn!("could not dim backlight on shutdown: {e}");
        }
        self.driver.close();
    }

    fn adopt(&mut self, settings: DisplaySettings) {
        self.palette = settings.theme.palette();
        self.settings = settings;
    }

    fn apply_backlight(&mut self) {
        match self.driver.set_backlight(self.settings.brightness) {
            Ok(level) => info!("backlight set to {level}"),
            Err(e) => warn!("backlight update failed: {e}"),
        }
    }

    fn play_intro(&mut self) {
        if !self.config.intro_enabled {
            return;
        }
        let orientation = self.settings.orientation;
        let palette = self.palette;
        let animator = &self.animator;
        let report = self
            .driver
            .reconfigure(|driver| animator.run(driver, orientation, &palette));
        if let Some(report) = report {
            debug!(?report, "intro played");
        }
    }
}

fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
