//! Big Screen Monitor display daemon entry point.
//!
//! Parses the command line, loads the daemon config, opens the USB picture
//! frame and runs the display loop until Ctrl-C (or SIGTERM).
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()              -- daemon.toml, defaults when absent
//!  └─ signal task                -- clears the `running` flag
//!  └─ spawn_blocking(run_display)
//!       ├─ DisplayDriver::open_with(UsbDevice::open)   -- fatal on failure
//!       ├─ DisplayDriver::bring_up()                   -- 800×480 fallback
//!       ├─ resolve_logo()          -- [intro] logo_path or the emblem
//!       ├─ DisplayLoop::start()    -- backlight + intro
//!       ├─ DisplayLoop::run()      -- one frame per cycle
//!       └─ DisplayLoop::shutdown() -- dim backlight, release device
//! ```
//!
//! # Why a blocking thread? (for beginners)
//!
//! libusb transfers block the calling thread until they finish or time out.
//! Running them directly inside an async task would stall a Tokio worker, so
//! the whole display loop is moved onto Tokio's blocking thread pool with
//! `spawn_blocking`.  The async side only waits for signals.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dpf_daemon::application::driver::{DisplayDriver, NegotiationPolicy};
use dpf_daemon::application::run_loop::DisplayLoop;
use dpf_daemon::infrastructure::{
    logo::resolve_logo,
    render::BackgroundRenderer,
    settings::JsonSettingsFile,
    storage::config::{load_config, DaemonConfig},
    usb::{UsbDevice, PRODUCT_ID, VENDOR_ID},
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drives an AX206 USB picture frame as a system dashboard.
#[derive(Debug, Parser)]
#[command(
    name = "dpf-daemon",
    about = "Display daemon for AX206-class USB picture frames",
    version
)]
struct Cli {
    /// Daemon config file (TOML).
    ///
    /// Defaults to `$XDG_CONFIG_HOME/big-screen-monitor/daemon.toml`; a
    /// missing default file means built-in defaults.
    #[arg(long, env = "DPF_CONFIG")]
    config: Option<PathBuf>,

    /// Settings record written by the settings editor (JSON).
    ///
    /// Overrides `display.settings_path` from the config.  When neither is
    /// given the file is looked up in the user's config directory.
    #[arg(long, env = "DPF_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset (e.g. `debug`).
    #[arg(long, env = "DPF_LOG_LEVEL")]
    log_level: Option<String>,

    /// Skip the startup and orientation-change intro animation.
    #[arg(long, env = "DPF_NO_INTRO")]
    no_intro: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load daemon config")?;

    // RUST_LOG wins; otherwise --log-level, then the config file.
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    info!("Big Screen Monitor display daemon starting");

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    tokio::spawn(wait_for_shutdown(Arc::clone(&running)));

    // ── Display loop on the blocking pool ─────────────────────────────────────
    let loop_running = Arc::clone(&running);
    tokio::task::spawn_blocking(move || run_display(&cli, &config, &loop_running))
        .await
        .context("display thread panicked")??;

    info!("display daemon stopped");
    Ok(())
}

/// Opens the frame and runs the display loop until `running` is cleared.
///
/// # Errors
///
/// Returns an error only when the frame cannot be opened.
fn run_display(cli: &Cli, config: &DaemonConfig, running: &AtomicBool) -> anyhow::Result<()> {
    let mut driver = DisplayDriver::open_with(|| UsbDevice::open(VENDOR_ID, PRODUCT_ID))
        .with_context(|| {
            format!("could not open display {VENDOR_ID:04x}:{PRODUCT_ID:04x}")
        })?;
    driver.bring_up(&NegotiationPolicy::default());

    let source = match cli
        .settings
        .clone()
        .or_else(|| config.display.settings_path.clone())
    {
        Some(path) => JsonSettingsFile::at(path),
        None => JsonSettingsFile::discover(),
    };
    if let Some(path) = source.path() {
        info!(path = %path.display(), "reading settings");
    }

    let mut loop_config = config.loop_config();
    if cli.no_intro {
        loop_config.intro_enabled = false;
    }

    let logo = resolve_logo(config.intro.logo_path.as_deref());
    let mut display =
        DisplayLoop::new(driver, source, BackgroundRenderer, loop_config).with_logo(logo);
    display.start();
    display.run(running);

    info!("shutting down display");
    display.shutdown();
    Ok(())
}

/// Clears `running` on Ctrl-C, or on SIGTERM where available.
async fn wait_for_shutdown(running: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    r = tokio::signal::ctrl_c() => {
                        if let Err(e) = r {
                            error!("failed to listen for Ctrl+C signal: {e}");
                            return;
                        }
                    }
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("failed to listen for Ctrl+C signal: {e}");
                    return;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C signal: {e}");
            return;
        }
    }

    info!("shutdown signal received");
    running.store(false, Ordering::Relaxed);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_everything_to_config() {
        // Arrange / Act
        let cli = Cli::parse_from(["dpf-daemon"]);

        // Assert
        assert!(cli.config.is_none());
        assert!(cli.settings.is_none());
        assert!(cli.log_level.is_none());
        assert!(!cli.no_intro);
    }

    #[test]
    fn test_cli_parses_all_flags() {
        let cli = Cli::parse_from([
            "dpf-daemon",
            "--config",
            "/etc/dpf/daemon.toml",
            "--settings",
            "/tmp/settings.json",
            "--log-level",
            "debug",
            "--no-intro",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/etc/dpf/daemon.toml")));
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/settings.json")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.no_intro);
    }
}
