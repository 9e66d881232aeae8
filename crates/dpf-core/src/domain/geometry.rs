//! Panel geometry and orientation.
//!
//! The panel reports its native (landscape) resolution once at startup.  That
//! geometry never changes afterwards.  Orientation only decides the size of
//! the *logical* canvas the renderer draws on: a vertical canvas is the
//! native one with width and height swapped, and it is rotated back to the
//! native shape before encoding.

use serde::{Deserialize, Serialize};

/// Fallback panel width used when negotiation fails.
pub const DEFAULT_WIDTH: u16 = 800;

/// Fallback panel height used when negotiation fails.
pub const DEFAULT_HEIGHT: u16 = 480;

/// Native pixel dimensions of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayGeometry {
    /// Width in pixels (always > 0).
    pub width: u16,
    /// Height in pixels (always > 0).
    pub height: u16,
}

impl DisplayGeometry {
    /// The geometry assumed when the device does not report one: 800×480.
    pub const FALLBACK: DisplayGeometry = DisplayGeometry {
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
    };

    /// Creates a geometry, returning `None` if either dimension is zero.
    pub fn new(width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }

    /// Returns the `(width, height)` of the logical canvas for `orientation`.
    ///
    /// ```rust
    /// use dpf_core::domain::geometry::{DisplayGeometry, Orientation};
    ///
    /// let g = DisplayGeometry::FALLBACK;
    /// assert_eq!(g.logical_size(Orientation::Horizontal), (800, 480));
    /// assert_eq!(g.logical_size(Orientation::Vertical), (480, 800));
    /// ```
    pub fn logical_size(&self, orientation: Orientation) -> (u16, u16) {
        match orientation {
            Orientation::Horizontal => (self.width, self.height),
            Orientation::Vertical => (self.height, self.width),
        }
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl std::fmt::Display for DisplayGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How the user has mounted the panel.
///
/// Deserialised leniently from the settings file: `"vertical"` selects
/// portrait mode and every other value falls back to landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Orientation {
    /// Landscape; the panel's native orientation.
    #[default]
    Horizontal,
    /// Portrait; logical images are rotated 90° before encoding.
    Vertical,
}

impl Orientation {
    /// Returns the settings-file spelling of this orientation.
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }

    /// Returns `true` for portrait mode.
    pub fn is_vertical(self) -> bool {
        matches!(self, Orientation::Vertical)
    }
}

impl From<String> for Orientation {
    fn from(value: String) -> Self {
        Orientation::from(value.as_str())
    }
}

impl From<&str> for Orientation {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("vertical") {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

impl From<Orientation> for String {
    fn from(value: Orientation) -> Self {
        value.as_str().to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_geometry_is_800x480() {
        assert_eq!(DisplayGeometry::FALLBACK.width, 800);
        assert_eq!(DisplayGeometry::FALLBACK.height, 480);
        assert_eq!(DisplayGeometry::default(), DisplayGeometry::FALLBACK);
    }

    #[test]
    fn test_zero_dimension_geometry_is_rejected() {
        assert_eq!(DisplayGeometry::new(0, 480), None);
        assert_eq!(DisplayGeometry::new(800, 0), None);
        assert!(DisplayGeometry::new(1, 1).is_some());
    }

    #[test]
    fn test_vertical_logical_size_swaps_axes() {
        let g = DisplayGeometry::new(320, 240).unwrap();
        assert_eq!(g.logical_size(Orientation::Vertical), (240, 320));
    }

    #[test]
    fn test_orientation_parses_leniently() {
        assert_eq!(Orientation::from("vertical"), Orientation::Vertical);
        assert_eq!(Orientation::from("Vertical"), Orientation::Vertical);
        assert_eq!(Orientation::from("horizontal"), Orientation::Horizontal);
        assert_eq!(Orientation::from("sideways"), Orientation::Horizontal);
        assert_eq!(Orientation::from(""), Orientation::Horizontal);
    }

    #[test]
    fn test_geometry_displays_as_width_x_height() {
        assert_eq!(DisplayGeometry::FALLBACK.to_string(), "800x480");
    }
}
