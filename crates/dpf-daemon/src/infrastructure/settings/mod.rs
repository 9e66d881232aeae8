//! JSON settings file written by the desktop settings editor.
//!
//! The editor stores its settings at
//! `$XDG_CONFIG_HOME/big-screen-monitor/settings.json` (falling back to
//! `~/.config/...`).  The daemon only ever reads this file.
//!
//! # Running as root
//!
//! The daemon often runs as root (for USB access) while the editor runs as
//! the desktop user, so root's own config directory usually holds no
//! settings.  When running as root and that file is missing, the daemon
//! looks for the desktop user's file instead:
//!
//! 1. `/home/$SUDO_USER/.config/big-screen-monitor/settings.json` when
//!    `SUDO_USER` is set.
//! 2. Otherwise, the first `/home/*/.config/big-screen-monitor/settings.json`
//!    that exists (in directory-name order).
//!
//! The lookup runs on every load, so a settings file created after the
//! daemon started is picked up on the next poll.
//!
//! # Failure handling
//!
//! A missing file yields the defaults silently.  An unreadable or malformed
//! file yields the defaults and a warning; the display loop never stops
//! because of a bad settings file.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use dpf_core::DisplaySettings;

use crate::application::run_loop::SettingsSource;

/// Directory under the config base shared by the editor and the daemon.
pub const APP_DIR: &str = "big-screen-monitor";

/// File name of the settings record.
pub const SETTINGS_FILE: &str = "settings.json";

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A file system error other than "not found".
    #[error("I/O error reading settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a valid settings JSON object.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and parses a settings file.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for other I/O failures and
/// [`SettingsError::Parse`] for malformed JSON.
pub fn read_settings(path: &Path) -> Result<Option<DisplaySettings>, SettingsError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

// ── Path resolution ───────────────────────────────────────────────────────────

/// The parts of the process environment that decide where settings live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsEnv {
    pub xdg_config_home: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub is_root: bool,
    pub sudo_user: Option<String>,
    /// Parent of user home directories, normally `/home`.
    pub home_root: PathBuf,
}

impl SettingsEnv {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        Self {
            xdg_config_home: non_empty_var("XDG_CONFIG_HOME").map(PathBuf::from),
            home: non_empty_var("HOME").map(PathBuf::from),
            is_root: is_root(),
            sudo_user: non_empty_var("SUDO_USER"),
            home_root: PathBuf::from("/home"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

fn user_settings_path(home: &Path) -> PathBuf {
    home.join(".config").join(APP_DIR).join(SETTINGS_FILE)
}

/// The settings path for the current user, ignoring the root fallback.
pub fn own_settings_path(env: &SettingsEnv) -> Option<PathBuf> {
    let base = env
        .xdg_config_home
        .clone()
        .or_else(|| env.home.as_ref().map(|h| h.join(".config")))?;
    Some(base.join(APP_DIR).join(SETTINGS_FILE))
}

/// Resolves which settings file to read.
///
/// Returns `None` only when no config base directory can be determined and
/// the root fallback finds nothing either.
pub fn resolve_settings_path(env: &SettingsEnv) -> Option<PathBuf> {
    let own = own_settings_path(env);
    if own.as_ref().is_some_and(|p| p.exists()) || !env.is_root {
        return own;
    }

    let fallback = match &env.sudo_user {
        Some(user) => Some(user_settings_path(&env.home_root.join(user))).filter(|p| p.exists()),
        None => first_user_settings(&env.home_root),
    };
    if let Some(path) = &fallback {
        debug!(path = %path.display(), "running as root; using desktop user's settings");
    }
    fallback.or(own)
}

fn first_user_settings(home_root: &Path) -> Option<PathBuf> {
    let mut homes: Vec<PathBuf> = std::fs::read_dir(home_root)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    homes.sort();
    homes
        .into_iter()
        .map(|home| user_settings_path(&home))
        .find(|p| p.exists())
}

// ── SettingsSource ────────────────────────────────────────────────────────────

/// Reads the settings record from the editor's JSON file.
#[derive(Debug, Clone)]
pub struct JsonSettingsFile {
    location: Location,
}

#[derive(Debug, Clone)]
enum Location {
    Fixed(PathBuf),
    Discover(SettingsEnv),
}

impl JsonSettingsFile {
    /// Always reads `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Fixed(path.into()),
        }
    }

    /// Resolves the path from the process environment on every load.
    pub fn discover() -> Self {
        Self::discover_in(SettingsEnv::from_process())
    }

    /// Resolves the path from `env` on every load.
    pub fn discover_in(env: SettingsEnv) -> Self {
        Self {
            location: Location::Discover(env),
        }
    }

    /// The file the next load would read, if any.
    pub fn path(&self) -> Option<PathBuf> {
        match &self.location {
            Location::Fixed(path) => Some(path.clone()),
            Location::Discover(env) => resolve_settings_path(env),
        }
    }
}

impl SettingsSource for JsonSettingsFile {
    fn load(&self) -> DisplaySettings {
        let Some(path) = self.path() else {
            debug!("no settings location (HOME unset); using defaults");
            return DisplaySettings::default();
        };
        match read_settings(&path) {
            Ok(Some(settings)) => settings,
            Ok(None) => DisplaySettings::default(),
            Err(e) => {
                warn!("{e}; using default settings");
                DisplaySettings::default()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
