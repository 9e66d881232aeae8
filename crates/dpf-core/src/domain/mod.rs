//! Domain layer: pure display logic with no USB or OS dependencies.
//!
//! # Sub-modules
//!
//! - **`geometry`** – The panel's negotiated pixel dimensions and the
//!   orientation that decides how a logical image maps onto them.
//!
//! - **`backlight`** – Maps the user-facing 10–100 brightness slider (or the
//!   legacy 0–7 scale) onto the device's 1–7 hardware levels.
//!
//! - **`raster`** – Frame and logo rasters (`image` crate buffers) with the
//!   operations the driver needs: 90° rotation, Lanczos scaling, and alpha
//!   compositing.
//!
//! - **`theme`** / **`settings`** – The externally edited settings record and
//!   the theme palettes it selects.
//!
//! - **`emblem`** – The built-in logo drawn by the intro animation.

pub mod backlight;
pub mod emblem;
pub mod geometry;
pub mod raster;
pub mod settings;
pub mod theme;
