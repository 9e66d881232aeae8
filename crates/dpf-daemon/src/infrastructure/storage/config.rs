//! TOML configuration for the display daemon.
//!
//! Read from `$XDG_CONFIG_HOME/big-screen-monitor/daemon.toml` (falling back
//! to `~/.config/big-screen-monitor/daemon.toml`), or from the path passed
//! with `--config`.  Every section and field is optional:
//!
//! ```toml
//! [display]
//! cycle_interval_ms = 1000
//! settings_poll_interval_ms = 5000
//! # settings_path = "/home/alice/.config/big-screen-monitor/settings.json"
//!
//! [intro]
//! enabled = true
//! frames_in = 8
//! frames_hold = 8
//! frames_out = 6
//! # logo_path = "/usr/share/big-screen-monitor/logo.png"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so a missing
//! file, an empty file and a partial file all produce a working config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::intro::IntroConfig;
use crate::application::run_loop::LoopConfig;
use crate::infrastructure::settings::APP_DIR;

/// File name of the daemon config.
pub const CONFIG_FILE: &str = "daemon.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DaemonConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub intro: IntroSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Loop timing and the settings file location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Pause between frames in milliseconds.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// How often the settings file is re-read, in milliseconds.
    #[serde(default = "default_settings_poll_interval_ms")]
    pub settings_poll_interval_ms: u64,
    /// Explicit settings file; discovered from the environment when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
}

/// Intro animation switches and frame counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntroSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_frames_in")]
    pub frames_in: u32,
    #[serde(default = "default_frames_hold")]
    pub frames_hold: u32,
    #[serde(default = "default_frames_out")]
    pub frames_out: u32,
    /// Raster logo (PNG, JPEG or BMP) shown instead of the built-in emblem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset: `"error"`, `"warn"`,
    /// `"info"`, `"debug"`, `"trace"`, or a full directive string.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_cycle_interval_ms() -> u64 {
    1_000
}
fn default_settings_poll_interval_ms() -> u64 {
    5_000
}
fn default_true() -> bool {
    true
}
fn default_frames_in() -> u32 {
    8
}
fn default_frames_hold() -> u32 {
    8
}
fn default_frames_out() -> u32 {
    6
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            settings_poll_interval_ms: default_settings_poll_interval_ms(),
            settings_path: None,
        }
    }
}

impl Default for IntroSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            frames_in: default_frames_in(),
            frames_hold: default_frames_hold(),
            frames_out: default_frames_out(),
            logo_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Builds the run-loop configuration.
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            cycle_interval: Duration::from_millis(self.display.cycle_interval_ms),
            settings_poll_interval: Duration::from_millis(self.display.settings_poll_interval_ms),
            intro_enabled: self.intro.enabled,
            intro: IntroConfig {
                frames_in: self.intro.frames_in,
                frames_hold: self.intro.frames_hold,
                frames_out: self.intro.frames_out,
            },
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when neither `XDG_CONFIG_HOME` nor
/// `HOME` is set.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

/// Loads the daemon config.
///
/// With `path = None` the default location is used and a missing file (or
/// an undeterminable config directory) yields [`DaemonConfig::default`].  An
/// explicit path must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors (including a missing
/// explicit file) and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match config_file_path() {
            Ok(p) => (p, false),
            Err(ConfigError::NoConfigDir) => return Ok(DaemonConfig::default()),
            Err(e) => return Err(e),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            Ok(DaemonConfig::default())
        }
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
