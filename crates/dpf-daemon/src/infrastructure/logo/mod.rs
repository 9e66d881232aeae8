//! Intro logo files.
//!
//! `[intro] logo_path` in the daemon config names a raster image (PNG, JPEG
//! or BMP) to show instead of the built-in emblem.  The file is decoded once
//! at start-up; the intro animation resizes it for each orientation.
//!
//! A configured file that is missing or cannot be decoded is logged and the
//! intro is skipped.  The daemon does not fall back to the emblem in that
//! case, so a broken path is noticed rather than silently ignored.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use dpf_core::RgbaImage;

use crate::application::intro::Logo;

/// Error type for logo loading.
#[derive(Debug, Error)]
pub enum LogoError {
    /// The file could not be opened or decoded.
    #[error("failed to load logo {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decodes the image at `path` into RGBA.
///
/// # Errors
///
/// Returns [`LogoError::Decode`] when the file is missing, unreadable, or
/// not in a supported format.
pub fn load_logo(path: &Path) -> Result<RgbaImage, LogoError> {
    let decoded = image::open(path).map_err(|source| LogoError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.into_rgba8())
}

/// Chooses the intro logo for an optional configured path.
///
/// No path selects the built-in emblem.
pub fn resolve_logo(path: Option<&Path>) -> Logo {
    let Some(path) = path else {
        return Logo::Emblem;
    };
    match load_logo(path) {
        Ok(logo) => {
            info!(
                path = %path.display(),
                width = logo.width(),
                height = logo.height(),
                "intro logo loaded"
            );
            Logo::Image(logo)
        }
        Err(e) => {
            warn!("{e}; the intro will be skipped");
            Logo::Unavailable
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
