//! Application layer use cases for the display daemon.
//!
//! # What lives here? (for beginners)
//!
//! This layer knows *what* the daemon does with the panel but not *how* the
//! bytes physically reach it.  Everything that touches libusb, the file
//! system or the clock's wall time is injected through a trait, so every use
//! case can be tested against in-memory fakes.
//!
//! # Sub-modules
//!
//! - **`transport`** – One command exchange: envelope, optional data phase,
//!   status.  Defines the [`transport::BulkEndpoints`] seam the USB adapter
//!   implements.
//!
//! - **`driver`** – Bring-up and dimension negotiation, the backlight, the
//!   per-cycle draw path and the low-level frame-write primitive.
//!
//! - **`intro`** – Precomputes and streams the startup logo animation.
//!
//! - **`run_loop`** – The once-per-second cycle that polls settings, renders
//!   and draws.

pub mod driver;
pub mod intro;
pub mod run_loop;
pub mod transport;
