//! libusb-backed access to the physical panel.
//!
//! # Claiming the device (for beginners)
//!
//! On Linux the AX206 frame enumerates as a USB mass-storage device, so the
//! kernel's `usb-storage` driver usually binds to interface 0 as soon as the
//! frame is plugged in.  Before userspace can issue bulk transfers it must:
//!
//! 1. Detach the kernel driver from interface 0 (if one is bound).
//! 2. Select configuration 1.
//! 3. Claim interface 0.
//!
//! Steps 1 and 2 are best-effort: some kernels refuse to detach, and some
//! firmware revisions reject a redundant `SET_CONFIGURATION`.  Neither stops
//! the frame from working, so both failures are only logged.  Claiming the
//! interface is mandatory.
//!
//! When [`UsbDevice`] is dropped it releases the interface and re-attaches
//! the kernel driver it detached, so the frame is left as it was found on
//! every exit path.

pub mod mock;

use std::thread;
use std::time::Duration;

use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info, warn};

use crate::application::transport::{BulkEndpoints, EndpointError, OpenError};

/// USB vendor id of the AX206 picture frame.
pub const VENDOR_ID: u16 = 0x1908;

/// USB product id of the AX206 picture frame.
pub const PRODUCT_ID: u16 = 0x0102;

/// Bulk OUT endpoint address.
pub const ENDPOINT_OUT: u8 = 0x01;

/// Bulk IN endpoint address.
pub const ENDPOINT_IN: u8 = 0x81;

const INTERFACE: u8 = 0;
const CONFIGURATION: u8 = 1;

/// Pause after selecting the configuration before the first transfer.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// An opened and claimed panel.
pub struct UsbDevice {
    handle: DeviceHandle<GlobalContext>,
    reattach_kernel_driver: bool,
}

impl UsbDevice {
    /// Opens the first attached device matching `vendor_id:product_id`.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::DeviceNotFound`] when no such device is attached
    /// (or it cannot be opened), and [`OpenError::Usb`] when its interface
    /// cannot be claimed.
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self, OpenError> {
        let handle = rusb::open_device_with_vid_pid(vendor_id, product_id).ok_or(
            OpenError::DeviceNotFound {
                vendor_id,
                product_id,
            },
        )?;

        log_identity(&handle);

        let mut reattach_kernel_driver = false;
        match handle.kernel_driver_active(INTERFACE) {
            Ok(true) => match handle.detach_kernel_driver(INTERFACE) {
                Ok(()) => {
                    info!("detached kernel driver from interface {INTERFACE}");
                    reattach_kernel_driver = true;
                }
                Err(e) => warn!("could not detach kernel driver: {e}"),
            },
            Ok(false) => {}
            Err(e) => debug!("kernel driver query not supported: {e}"),
        }

        match handle.set_active_configuration(CONFIGURATION) {
            Ok(()) => thread::sleep(SETTLE_DELAY),
            Err(e) => debug!("set configuration {CONFIGURATION} failed: {e}"),
        }

        handle
            .claim_interface(INTERFACE)
            .map_err(|e| OpenError::Usb(format!("claim interface {INTERFACE}: {e}")))?;

        Ok(Self {
            handle,
            reattach_kernel_driver,
        })
    }
}

fn log_identity(handle: &DeviceHandle<GlobalContext>) {
    let device = handle.device();
    let (manufacturer, product) = match device.device_descriptor() {
        Ok(desc) => (
            handle.read_manufacturer_string_ascii(&desc).unwrap_or_default(),
            handle.read_product_string_ascii(&desc).unwrap_or_default(),
        ),
        Err(_) => (String::new(), String::new()),
    };
    info!(
        bus = device.bus_number(),
        address = device.address(),
        "display found: {manufacturer} {product}"
    );
}

fn map_error(e: rusb::Error) -> EndpointError {
    match e {
        rusb::Error::Timeout => EndpointError::Timeout,
        rusb::Error::NoDevice => EndpointError::NoDevice,
        other => EndpointError::Usb(other.to_string()),
    }
}

impl BulkEndpoints for UsbDevice {
    fn write_out(&mut self, data: &[u8], timeout: Duration) -> Result<usize, EndpointError> {
        self.handle
            .write_bulk(ENDPOINT_OUT, data, timeout)
            .map_err(map_error)
    }

    fn read_in(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, EndpointError> {
        let mut buf = vec![0u8; len];
        let read = self
            .handle
            .read_bulk(ENDPOINT_IN, &mut buf, timeout)
            .map_err(map_error)?;
        buf.truncate(read);
        Ok(buf)
    }
}

impl Drop for UsbDevice {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(INTERFACE) {
            debug!("release interface failed: {e}");
        }
        if self.reattach_kernel_driver {
            match self.handle.attach_kernel_driver(INTERFACE) {
                Ok(()) => info!("re-attached kernel driver to interface {INTERFACE}"),
                Err(e) => warn!("could not re-attach kernel driver: {e}"),
            }
        }
    }
}
