//! The user-editable settings record.
//!
//! A separate settings editor writes this record as JSON.  The daemon only
//! reads it, and must cope with files written by older editors: every field
//! is optional and falls back to its default, unknown fields are ignored,
//! and unrecognised enum values degrade to the default variant.
//!
//! Only `orientation`, `brightness` and `theme` influence the display
//! driver.  The remaining fields are carried through so that they survive
//! being logged or handed to a renderer.

use serde::{Deserialize, Serialize};

use crate::domain::geometry::Orientation;
use crate::domain::theme::Theme;

/// Settings as read from `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Panel model identifier; `"auto"` means "use whatever is attached".
    pub model: String,
    /// Nominal panel diagonal in inches, as a string (`"3.5"`, `"5"`, …).
    pub size: String,
    /// How the panel is mounted.
    pub orientation: Orientation,
    /// UI brightness: 10–100, or 0–7 for legacy files.
    pub brightness: f64,
    /// Colour theme.
    pub theme: Theme,
    /// Network interface the renderer should report on; `"auto"` picks one.
    pub network_iface: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            model: "auto".to_string(),
            size: "3.5".to_string(),
            orientation: Orientation::Horizontal,
            brightness: 70.0,
            theme: Theme::Dark,
            network_iface: "auto".to_string(),
        }
    }
}
