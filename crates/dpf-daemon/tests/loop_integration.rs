//! Integration tests for the display loop.
//!
//! Wires `DisplayLoop` to the device emulator, a hand-written settings
//! source and the stand-in `BackgroundRenderer`, mirroring what `main` does
//! with the real USB device.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dpf_core::domain::raster::solid;
use dpf_core::{encode_rgb565, DisplaySettings, Orientation, Theme};
use dpf_daemon::application::driver::{DisplayDriver, DriverState, NegotiationPolicy};
use dpf_daemon::application::run_loop::{DisplayLoop, LoopConfig, SettingsSource};
use dpf_daemon::infrastructure::render::BackgroundRenderer;
use dpf_daemon::infrastructure::usb::mock::MockEndpoints;

/// Settings source whose record can be changed between cycles.
#[derive(Clone, Default)]
struct SharedSettings(Arc<Mutex<DisplaySettings>>);

impl SharedSettings {
    fn update(&self, f: impl FnOnce(&mut DisplaySettings)) {
        f(&mut self.0.lock().unwrap());
    }
}

impl SettingsSource for SharedSettings {
    fn load(&self) -> DisplaySettings {
        self.0.lock().unwrap().clone()
    }
}

fn display_loop(
    intro_enabled: bool,
) -> (
    MockEndpoints,
    SharedSettings,
    DisplayLoop<MockEndpoints, SharedSettings, BackgroundRenderer>,
) {
    let device = MockEndpoints::new(40, 30);
    let mut driver = DisplayDriver::attach(device.clone());
    driver.bring_up(&NegotiationPolicy::default());
    let settings = SharedSettings::default();
    let config = LoopConfig {
        cycle_interval: Duration::from_millis(1),
        intro_enabled,
        ..LoopConfig::default()
    };
    let display = DisplayLoop::new(driver, settings.clone(), BackgroundRenderer, config);
    (device, settings, display)
}

#[test]
fn test_startup_sets_backlight_then_plays_intro() {
    let (device, _settings, mut display) = display_loop(true);

    display.start();

    // brightness 70 maps to hardware level 5
    assert_eq!(device.backlight_levels(), vec![5]);
    assert_eq!(device.frame_writes().len(), 23);
}

#[test]
fn test_cycle_draws_theme_background() {
    // Arrange
    let (device, settings, mut display) = display_loop(false);
    settings.update(|s| s.theme = Theme::Cyberpunk);
    display.start();

    // Act
    display.tick(Instant::now());

    // Assert
    let frames = device.frame_writes();
    assert_eq!(frames.len(), 1);
    let expected = solid(40, 30, Theme::Cyberpunk.palette().background);
    assert_eq!(frames[0].data, encode_rgb565(&expected));
}

#[test]
fn test_orientation_change_replays_intro_and_rotates_frames() {
    // Arrange
    let (device, settings, mut display) = display_loop(true);
    let start = Instant::now();
    display.start();
    assert_eq!(device.frame_writes().len(), 23);

    // Act: flip to portrait and run a cycle after the poll interval
    settings.update(|s| s.orientation = Orientation::Vertical);
    display.tick(start + Duration::from_secs(6));

    // Assert: a second intro plus one dashboard frame
    let frames = device.frame_writes();
    assert_eq!(frames.len(), 23 + 23 + 1);
    let last = frames.last().unwrap();
    assert_eq!((last.width, last.height), (40, 30));
    assert_eq!(display.settings().orientation, Orientation::Vertical);
}

#[test]
fn test_shutdown_dims_to_lowest_level_and_closes() {
    let (device, _settings, mut display) = display_loop(false);
    display.start();

    let running = AtomicBool::new(false);
    display.run(&running);
    display.shutdown();

    assert_eq!(device.backlight_levels(), vec![5, 1]);
    assert_eq!(display.driver().state(), DriverState::Closed);
}
