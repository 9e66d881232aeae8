//! Colour themes selectable from the settings file.

use serde::{Deserialize, Serialize};

use crate::domain::raster::Rgb;

/// The four colours every theme defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Canvas fill behind everything else.
    pub background: Rgb<u8>,
    /// Fill for raised surfaces drawn over the background, such as the
    /// face of the intro emblem.
    pub panel: Rgb<u8>,
    /// Primary text colour.
    pub text: Rgb<u8>,
    /// Highlight colour; also used for the intro emblem.
    pub accent: Rgb<u8>,
}

/// A named theme.  Unknown names fall back to [`Theme::Dark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Neon,
    Cyberpunk,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Neon => "neon",
            Theme::Cyberpunk => "cyberpunk",
        }
    }

    /// Returns the colours for this theme.
    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Rgb([18, 18, 25]),
                panel: Rgb([30, 30, 40]),
                text: Rgb([255, 255, 255]),
                accent: Rgb([77, 217, 255]),
            },
            Theme::Light => Palette {
                background: Rgb([240, 240, 245]),
                panel: Rgb([255, 255, 255]),
                text: Rgb([20, 20, 30]),
                accent: Rgb([0, 120, 215]),
            },
            Theme::Neon => Palette {
                background: Rgb([10, 5, 20]),
                panel: Rgb([20, 10, 40]),
                text: Rgb([255, 255, 255]),
                accent: Rgb([255, 0, 255]),
            },
            Theme::Cyberpunk => Palette {
                background: Rgb([2, 2, 4]),
                panel: Rgb([10, 10, 15]),
                text: Rgb([253, 237, 5]),
                accent: Rgb([0, 240, 255]),
            },
        }
    }
}

impl From<&str> for Theme {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "light" => Theme::Light,
            "neon" => Theme::Neon,
            "cyberpunk" => Theme::Cyberpunk,
            _ => Theme::Dark,
        }
    }
}

impl From<String> for Theme {
    fn from(value: String) -> Self {
        Theme::from(value.as_str())
    }
}

impl From<Theme> for String {
    fn from(value: Theme) -> Self {
        value.as_str().to_string()
    }
}
