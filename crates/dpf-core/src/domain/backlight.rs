//! Backlight level mapping.
//!
//! The settings editor exposes brightness as a 10–100 percentage slider.
//! Older settings files stored the raw hardware level (0–7) instead, so any
//! value of 7 or less is read as a legacy hardware level.  The device itself
//! only accepts levels 1 through 7; level 0 would switch the panel off and is
//! never sent.

use std::fmt;

/// Largest UI value interpreted on the legacy 0–7 scale.
const LEGACY_SCALE_MAX: f64 = 7.0;

/// Bottom of the percentage scale.
const UI_MIN: f64 = 10.0;

/// Top of the percentage scale.
const UI_MAX: f64 = 100.0;

/// A hardware backlight level in `1..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BacklightLevel(u8);

impl BacklightLevel {
    /// Dimmest level the panel accepts.
    pub const MIN: BacklightLevel = BacklightLevel(1);
    /// Brightest level the panel accepts.
    pub const MAX: BacklightLevel = BacklightLevel(7);

    /// Creates a level from a raw hardware value, returning `None` outside `1..=7`.
    pub fn new(raw: u8) -> Option<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&raw) {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Maps a UI brightness value onto a hardware level.
    ///
    /// - `ui ≤ 7` (legacy scale): `clamp(round(ui), 1, 7)`; 0 becomes 1.
    /// - otherwise: `clamp(round(1 + (ui − 10) · 6 / 90), 1, 7)`.
    ///
    /// Non-finite input maps to the dimmest level.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dpf_core::domain::backlight::BacklightLevel;
    ///
    /// assert_eq!(BacklightLevel::from_ui_level(10.0).get(), 1);
    /// assert_eq!(BacklightLevel::from_ui_level(55.0).get(), 4);
    /// assert_eq!(BacklightLevel::from_ui_level(100.0).get(), 7);
    /// assert_eq!(BacklightLevel::from_ui_level(0.0).get(), 1);
    /// ```
    pub fn from_ui_level(ui: f64) -> Self {
        if !ui.is_finite() {
            return Self::MIN;
        }
        let span = (Self::MAX.0 - Self::MIN.0) as f64;
        let hw = if ui <= LEGACY_SCALE_MAX {
            ui.round()
        } else {
            (Self::MIN.0 as f64 + (ui - UI_MIN) * span / (UI_MAX - UI_MIN)).round()
        };
        let clamped = hw.clamp(Self::MIN.0 as f64, Self::MAX.0 as f64);
        Self(clamped as u8)
    }

    /// Returns the raw hardware value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for BacklightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/7", self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
