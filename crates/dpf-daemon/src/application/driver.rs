//! DisplayDriver: device bring-up, backlight, orientation and frame submission.
//!
//! # Lifecycle
//!
//! ```text
//!  Opening ──▶ Negotiating ──▶ Ready ◀──▶ Drawing
//!                                │ ▲
//!                                ▼ │
//!                           Reconfiguring
//!                                │
//!                                ▼
//!                             Closed
//! ```
//!
//! - **Opening**: the endpoints are attached but nothing has been sent.
//! - **Negotiating**: the panel is asked for its resolution, up to three
//!   times.  If it never answers sensibly the driver assumes 800×480.
//! - **Ready**: frames and backlight commands may be sent.
//! - **Drawing**: a rendered frame is being rotated, encoded and sent.
//! - **Reconfiguring**: an orientation change is being applied (the intro
//!   animation plays in this state).
//! - **Closed**: no further commands are sent.  The USB handle itself is
//!   released when the driver is dropped.
//!
//! Every operation after bring-up is non-fatal: a failed transfer is
//! returned to the caller, which logs it and carries on with the next cycle.

use std::borrow::Cow;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use dpf_core::domain::raster::rotate_to_native;
use dpf_core::protocol::commands::{parse_dimensions, DimensionsError, DIMENSIONS_RESPONSE_LEN};
use dpf_core::{
    BacklightLevel, DeviceCommand, DisplayGeometry, DisplaySettings, EncodedFrame, Orientation,
    RgbImage,
};

use crate::application::transport::{
    BulkEndpoints, CommandResponse, DataPhase, DeviceTransport, OpenError, TransportError,
};

/// Where the driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Opening,
    Negotiating,
    Ready,
    Drawing,
    Reconfiguring,
    Closed,
}

/// Error type for driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The panel is not attached.  Only reported while opening.
    #[error("display {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// The panel was found but could not be claimed.
    #[error("could not open display: {0}")]
    Open(String),

    /// A command exchange failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An encoded frame's length does not match its dimensions.
    #[error("encoded frame is {actual} bytes, expected {expected}")]
    EncodingInvariantViolation { expected: usize, actual: usize },

    /// The driver has been closed.
    #[error("display driver is closed")]
    Closed,
}

impl From<OpenError> for DriverError {
    fn from(e: OpenError) -> Self {
        match e {
            OpenError::DeviceNotFound {
                vendor_id,
                product_id,
            } => DriverError::DeviceNotFound {
                vendor_id,
                product_id,
            },
            OpenError::Usb(msg) => DriverError::Open(msg),
        }
    }
}

/// Why a single negotiation attempt was rejected.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dimensions(#[from] DimensionsError),
}

/// Every negotiation attempt failed.
#[derive(Debug, Error)]
#[error("dimension negotiation failed after {attempts} attempts: {last}")]
pub struct NegotiationFailure {
    pub attempts: u32,
    #[source]
    pub last: AttemptError,
}

/// How many times to ask the panel for its resolution, and how long to wait
/// between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationPolicy {
    pub attempts: u32,
    pub pause: Duration,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_millis(200),
        }
    }
}

/// The low-level frame-write primitive shared by the per-cycle draw path and
/// the intro animation.
pub trait FrameWriter {
    /// The panel's native geometry.
    fn geometry(&self) -> DisplayGeometry;

    /// Sends an already-encoded frame.
    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<(), DriverError>;
}

/// Drives one panel over one transport.
pub struct DisplayDriver<E: BulkEndpoints> {
    transport: DeviceTransport<E>,
    geometry: DisplayGeometry,
    state: DriverState,
}

impl<E: BulkEndpoints> DisplayDriver<E> {
    /// Wraps already-opened endpoints.  The geometry is the fallback until
    /// [`DisplayDriver::bring_up`] runs.
    pub fn attach(endpoints: E) -> Self {
        Self {
            transport: DeviceTransport::new(endpoints),
            geometry: DisplayGeometry::FALLBACK,
            state: DriverState::Opening,
        }
    }

    /// Opens the endpoints with `open` and attaches to them.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::DeviceNotFound`] or [`DriverError::Open`].
    pub fn open_with<F>(open: F) -> Result<Self, DriverError>
    where
        F: FnOnce() -> Result<E, OpenError>,
    {
        let endpoints = open()?;
        Ok(Self::attach(endpoints))
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// Returns a reference to the underlying endpoints.
    pub fn endpoints(&self) -> &E {
        self.transport.endpoints()
    }

    /// Negotiates the panel geometry and moves to `Ready`.
    ///
    /// Never fails: if negotiation is unsuccessful the fallback geometry
    /// (800×480) is used.
    pub fn bring_up(&mut self, policy: &NegotiationPolicy) -> DisplayGeometry {
        self.state = DriverState::Negotiating;
        self.geometry = match self.negotiate(policy) {
            Ok(geometry) => {
                info!("display resolution detected: {geometry}");
                geometry
            }
            Err(e) => {
                warn!("{e}; assuming {}", DisplayGeometry::FALLBACK);
                DisplayGeometry::FALLBACK
            }
        };
        self.state = DriverState::Ready;
        self.geometry
    }

    /// Asks the panel for its resolution, retrying per `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationFailure`] carrying the last attempt's error when
    /// every attempt fails.
    pub fn negotiate(
        &mut self,
        policy: &NegotiationPolicy,
    ) -> Result<DisplayGeometry, NegotiationFailure> {
        let attempts = policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.query_dimensions() {
                Ok(geometry) => return Ok(geometry),
                Err(e) if attempt < attempts => {
                    debug!(attempt, "dimension query rejected: {e}");
                    thread::sleep(policy.pause);
                    attempt += 1;
                }
                Err(last) => return Err(NegotiationFailure { attempts, last }),
            }
        }
    }

    fn query_dimensions(&mut self) -> Result<DisplayGeometry, AttemptError> {
        let response = self.transport.send_command(
            &DeviceCommand::QueryDimensions.body(),
            DataPhase::In(DIMENSIONS_RESPONSE_LEN),
        )?;
        Ok(parse_dimensions(response.data())?)
    }

    /// Maps a UI brightness value to a hardware level and sends it.
    ///
    /// Returns the level that was sent.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Transport`] if the command could not be sent,
    /// or [`DriverError::Closed`] after [`DisplayDriver::close`].
    pub fn set_backlight(&mut self, ui_level: f64) -> Result<BacklightLevel, DriverError> {
        self.ensure_open()?;
        let level = BacklightLevel::from_ui_level(ui_level);
        self.send_host_command(DeviceCommand::SetBacklight(level), &[])?;
        debug!(ui_level, hw_level = level.get(), "backlight set");
        Ok(level)
    }

    /// Rotates (for vertical orientation), encodes and sends a rendered image.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the frame could not be sent; the frame is
    /// dropped.
    pub fn draw(
        &mut self,
        image: &RgbImage,
        settings: &DisplaySettings,
    ) -> Result<(), DriverError> {
        self.ensure_open()?;
        let previous = self.state;
        self.state = DriverState::Drawing;
        let frame = encode_for(image, settings.orientation);
        let result = self.write_frame(&frame);
        self.state = previous;
        result
    }

    /// Sends an already-encoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::EncodingInvariantViolation`] (a debug assertion
    /// in debug builds) when the buffer length does not match the frame's
    /// dimensions; the frame is not sent.  Otherwise returns
    /// [`DriverError::Transport`] if the exchange fails.
    pub fn write_frame(&mut self, frame: &EncodedFrame) -> Result<(), DriverError> {
        self.ensure_open()?;
        debug_assert!(
            frame.is_consistent(),
            "encoded frame length mismatch: {} bytes for {}x{}",
            frame.data().len(),
            frame.width(),
            frame.height()
        );
        if !frame.is_consistent() {
            return Err(DriverError::EncodingInvariantViolation {
                expected: frame.expected_len(),
                actual: frame.data().len(),
            });
        }
        let cmd = DeviceCommand::write_frame(frame.width(), frame.height());
        self.send_host_command(cmd, frame.data())
    }

    /// Runs `apply` in the `Reconfiguring` state, then returns to `Ready`.
    pub fn reconfigure<R>(&mut self, apply: impl FnOnce(&mut Self) -> R) -> R {
        self.state = DriverState::Reconfiguring;
        let result = apply(self);
        if self.state != DriverState::Closed {
            self.state = DriverState::Ready;
        }
        result
    }

    /// Stops sending commands.  The device handle is released on drop.
    pub fn close(&mut self) {
        if self.state != DriverState::Closed {
            info!("display driver closed");
        }
        self.state = DriverState::Closed;
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.state == DriverState::Closed {
            return Err(DriverError::Closed);
        }
        Ok(())
    }

    fn send_host_command(&mut self, cmd: DeviceCommand, payload: &[u8]) -> Result<(), DriverError> {
        let phase = if payload.is_empty() {
            DataPhase::None
        } else {
            DataPhase::Out(payload)
        };
        if let CommandResponse::Status(status) = self.transport.send_command(&cmd.body(), phase)? {
            if status != 0 {
                debug!(status, ?cmd, "command completed with non-zero status");
            }
        }
        Ok(())
    }
}

impl<E: BulkEndpoints> FrameWriter for DisplayDriver<E> {
    fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<(), DriverError> {
        DisplayDriver::write_frame(self, frame)
    }
}

/// Encodes a logical image for the panel, rotating portrait canvases back to
/// the native landscape layout.
pub fn encode_for(image: &RgbImage, orientation: Orientation) -> EncodedFrame {
    let native: Cow<'_, RgbImage> = match orientation {
        Orientation::Vertical => Cow::Owned(rotate_to_native(image)),
        Orientation::Horizontal => Cow::Borrowed(image),
    };
    EncodedFrame::encode(&native)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::usb::mock::MockEndpoints;
    use dpf_core::domain::raster::solid;
    use dpf_core::Rgb;

    fn fast_policy() -> NegotiationPolicy {
        NegotiationPolicy {
            attempts: 3,
            pause: Duration::from_millis(1),
        }
    }

    fn ready_driver(width: u16, height: u16) -> (DisplayDriver<MockEndpoints>, MockEndpoints) {
        let device = MockEndpoints::new(width, height);
        let mut driver = DisplayDriver::attach(device.clone());
        driver.bring_up(&fast_policy());
        (driver, device)
    }

    // ── Bring-up ──────────────────────────────────────────────────────────────

    #[test]
    fn test_attach_starts_in_opening_state() {
        let driver = DisplayDriver::attach(MockEndpoints::new(320, 240));
        assert_eq!(driver.state(), DriverState::Opening);
    }

    #[test]
    fn test_bring_up_uses_reported_geometry() {
        // Arrange / Act
        let (driver, device) = ready_driver(320, 240);

        // Assert
        assert_eq!(driver.geometry(), DisplayGeometry::new(320, 240).unwrap());
        assert_eq!(driver.state(), DriverState::Ready);
        assert_eq!(device.dimension_queries(), 1);
    }

    #[test]
    fn test_bring_up_retries_after_zero_response() {
        // Arrange
        let device = MockEndpoints::new(480, 320);
        device.push_dimension_response(vec![0, 0, 0, 0, 0]);
        let mut driver = DisplayDriver::attach(device.clone());

        // Act
        let geometry = driver.bring_up(&fast_policy());

        // Assert
        assert_eq!(geometry, DisplayGeometry::new(480, 320).unwrap());
        assert_eq!(device.dimension_queries(), 2);
    }

    #[test]
    fn test_bring_up_falls_back_after_three_zero_responses() {
        let (driver, device) = ready_driver(0, 0);

        assert_eq!(driver.geometry(), DisplayGeometry::FALLBACK);
        assert_eq!(device.dimension_queries(), 3);
        assert_eq!(driver.state(), DriverState::Ready);
    }

    #[test]
    fn test_negotiation_reports_last_error_after_exhausting_attempts() {
        let device = MockEndpoints::new(0, 0);
        let mut driver = DisplayDriver::attach(device);

        let err = driver.negotiate(&fast_policy()).unwrap_err();

        assert_eq!(err.attempts, 3);
        assert!(matches!(
            err.last,
            AttemptError::Dimensions(DimensionsError::Zero { .. })
        ));
    }

    #[test]
    fn test_bring_up_falls_back_when_transport_fails() {
        let device = MockEndpoints::new(320, 240);
        device.set_fail_writes(true);
        let mut driver = DisplayDriver::attach(device.clone());

        let geometry = driver.bring_up(&fast_policy());

        assert_eq!(geometry, DisplayGeometry::FALLBACK);
    }

    #[test]
    fn test_malformed_short_response_is_rejected() {
        let device = MockEndpoints::new(800, 480);
        for _ in 0..3 {
            device.push_dimension_response(vec![0x20, 0x03]);
        }
        let mut driver = DisplayDriver::attach(device);

        let err = driver.negotiate(&fast_policy()).unwrap_err();

        assert!(matches!(
            err.last,
            AttemptError::Dimensions(DimensionsError::WrongLength(2))
        ));
    }

    #[test]
    fn test_open_with_maps_device_not_found() {
        let result = DisplayDriver::<MockEndpoints>::open_with(|| {
            Err(OpenError::DeviceNotFound {
                vendor_id: 0x1908,
                product_id: 0x0102,
            })
        });

        assert!(matches!(
            result,
            Err(DriverError::DeviceNotFound {
                vendor_id: 0x1908,
                product_id: 0x0102
            })
        ));
    }

    // ── Backlight ─────────────────────────────────────────────────────────────

    #[test]
    fn test_set_backlight_sends_mapped_level() {
        // Arrange
        let (mut driver, device) = ready_driver(320, 240);

        // Act
        let level = driver.set_backlight(55.0).unwrap();

        // Assert
        assert_eq!(level.get(), 4);
        assert_eq!(device.backlight_levels(), vec![4]);
    }

    #[test]
    fn test_set_backlight_zero_sends_dimmest_level() {
        let (mut driver, device) = ready_driver(320, 240);

        driver.set_backlight(0.0).unwrap();

        assert_eq!(device.backlight_levels(), vec![1]);
    }

    #[test]
    fn test_set_backlight_transport_failure_is_returned() {
        let (mut driver, device) = ready_driver(320, 240);
        device.set_fail_writes(true);

        let result = driver.set_backlight(100.0);

        assert!(matches!(result, Err(DriverError::Transport(_))));
        assert_eq!(driver.state(), DriverState::Ready);
    }

    // ── Draw ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_draw_horizontal_sends_image_unrotated() {
        // Arrange
        let (mut driver, device) = ready_driver(4, 2);
        let mut image = solid(4, 2, Rgb([0, 0, 0]));
        image.put_pixel(0, 0, Rgb([255, 0, 0]));

        // Act
        driver.draw(&image, &DisplaySettings::default()).unwrap();

        // Assert
        let frames = device.frame_writes();
        assert_eq!(frames.len(), 1);
        assert_eq!((frames[0].width, frames[0].height), (4, 2));
        assert_eq!(&frames[0].data[0..2], &[0xF8, 0x00]);
    }

    #[test]
    fn test_draw_vertical_rotates_to_native_geometry() {
        // Arrange: 4x2 panel, 2x4 portrait canvas with red top-right pixel
        let (mut driver, device) = ready_driver(4, 2);
        let settings = DisplaySettings {
            orientation: Orientation::Vertical,
            ..DisplaySettings::default()
        };
        let mut canvas = solid(2, 4, Rgb([0, 0, 0]));
        canvas.put_pixel(1, 0, Rgb([255, 0, 0]));

        // Act
        driver.draw(&canvas, &settings).unwrap();

        // Assert: (1, 0) -> (0, 0) after a counter-clockwise turn
        let frames = device.frame_writes();
        assert_eq!((frames[0].width, frames[0].height), (4, 2));
        assert_eq!(frames[0].data.len(), 2 * 4 * 2);
        assert_eq!(&frames[0].data[0..2], &[0xF8, 0x00]);
    }

    #[test]
    fn test_draw_transport_failure_drops_frame_and_stays_ready() {
        let (mut driver, device) = ready_driver(4, 2);
        device.set_fail_writes(true);

        let image = solid(4, 2, Rgb([1, 1, 1]));

        let result = driver.draw(&image, &DisplaySettings::default());

        assert!(matches!(result, Err(DriverError::Transport(_))));
        assert_eq!(driver.state(), DriverState::Ready);
        assert!(device.frame_writes().is_empty());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "encoded frame length mismatch"))]
    fn test_inconsistent_frame_is_never_sent() {
        let (mut driver, device) = ready_driver(4, 2);
        let truncated = EncodedFrame::from_raw(4, 2, vec![0u8; 15]);

        let result = driver.write_frame(&truncated);

        assert!(matches!(
            result,
            Err(DriverError::EncodingInvariantViolation { expected: 16, actual: 15 })
        ));
        assert!(device.frame_writes().is_empty());
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    #[test]
    fn test_reconfigure_returns_to_ready() {
        let (mut driver, _device) = ready_driver(4, 2);

        let seen = driver.reconfigure(|d| d.state());

        assert_eq!(seen, DriverState::Reconfiguring);
        assert_eq!(driver.state(), DriverState::Ready);
    }

    #[test]
    fn test_closed_driver_refuses_commands() {
        let (mut driver, device) = ready_driver(4, 2);
        driver.close();

        let result = driver.set_backlight(50.0);

        assert!(matches!(result, Err(DriverError::Closed)));
        assert_eq!(driver.state(), DriverState::Closed);
        assert!(device.backlight_levels().is_empty());
    }
}
