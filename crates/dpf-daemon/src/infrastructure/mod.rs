//! Infrastructure layer for the display daemon.
//!
//! Contains the adapters the application layer is wired to at start-up.
//!
//! **Dependency rule**: this layer may depend on `application` and `dpf_core`,
//! but MUST NOT be imported by the `application` or domain layers.
//!
//! # Sub-modules
//!
//! - **`usb`** – libusb access to the physical panel (`UsbDevice`), plus the
//!   `MockEndpoints` device emulator used by tests.
//!
//! - **`settings`** – the desktop settings editor's JSON file, including the
//!   lookup of the desktop user's file when the daemon runs as root.
//!
//! - **`storage`** – the daemon's own read-only TOML configuration.
//!
//! - **`logo`** – decoding of the optional intro logo file named in the
//!   config.
//!
//! - **`render`** – the stand-in renderer that fills frames with the theme
//!   background.

pub mod logo;
pub mod render;
pub mod settings;
pub mod storage;
pub mod usb;
