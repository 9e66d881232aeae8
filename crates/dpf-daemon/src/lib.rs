//! dpf-daemon library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does dpf-daemon do? (for beginners)
//!
//! The daemon drives a small USB picture frame (an AX206-based "DPF") as a
//! secondary status display.  The frame has no operating system of its own:
//! it accepts raw RGB565 pixels wrapped in mass-storage style command
//! envelopes over two bulk endpoints.
//!
//! The daemon:
//!
//! 1. Opens the frame over libusb and asks it for its native resolution,
//!    falling back to 800×480 when the frame does not answer.
//! 2. Reads the desktop settings record (brightness, orientation, theme) and
//!    applies the brightness to the backlight.
//! 3. Plays a short fade-in / hold / fade-out intro animation.
//! 4. Once per second renders a frame, rotates it for portrait mounting if
//!    needed, encodes it and sends it to the frame.
//! 5. On Ctrl-C dims the backlight and releases the device.

/// Application layer: transport, driver, intro animation and the run loop.
pub mod application;

/// Infrastructure layer: USB, settings file, daemon config and renderer.
pub mod infrastructure;
