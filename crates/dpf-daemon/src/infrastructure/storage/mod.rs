//! Storage infrastructure: the daemon's own configuration file.
//!
//! The `config` sub-module reads `daemon.toml` from the XDG config directory
//! (or an explicit `--config` path) and supplies defaults when the file does
//! not exist.  The daemon never writes this file.

pub mod config;
