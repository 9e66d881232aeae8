//! Integration tests for the bytes dpf-core puts on the bus.
//!
//! These tests go through the public API only and check complete command
//! envelopes byte-for-byte, the way a USB capture of the real device would
//! show them.

use dpf_core::protocol::commands::{parse_dimensions, DeviceCommand};
use dpf_core::protocol::envelope::{
    CommandEnvelope, Direction, StatusEnvelope, COMMAND_ENVELOPE_LEN, TRANSFER_TAG,
};
use dpf_core::domain::raster::{rotate_to_native, solid};
use dpf_core::{BacklightLevel, DisplayGeometry, EncodedFrame, Orientation, Rgb};

/// Builds the envelope the driver sends for `cmd` with a given data length.
fn envelope_for(cmd: DeviceCommand, data_length: u32) -> [u8; COMMAND_ENVELOPE_LEN] {
    CommandEnvelope::new(&cmd.body(), cmd.direction(), data_length)
        .expect("16-byte bodies always fit")
        .encode()
}

#[test]
fn test_dimension_query_envelope_matches_capture() {
    let bytes = envelope_for(DeviceCommand::QueryDimensions, 5);

    let mut expected = vec![b'U', b'S', b'B', b'C'];
    expected.extend_from_slice(&[0xEF, 0xBE, 0xAD, 0xDE]); // tag, little-endian
    expected.extend_from_slice(&[5, 0, 0, 0]); // data length
    expected.push(0x80); // device → host
    expected.push(0x00); // LUN
    expected.push(16); // command length
    expected.extend_from_slice(&[0xCD, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    assert_eq!(bytes.to_vec(), expected);
}

#[test]
fn test_backlight_envelope_has_no_data_phase() {
    let level = BacklightLevel::from_ui_level(100.0);
    let bytes = envelope_for(DeviceCommand::SetBacklight(level), 0);

    assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
    assert_eq!(bytes[12], 0x00);
    assert_eq!(bytes[15 + 9], 7);
}

#[test]
fn test_full_frame_envelope_announces_frame_length() {
    // Arrange
    let geometry = DisplayGeometry::FALLBACK;
    let frame = EncodedFrame::encode(&solid(geometry.width, geometry.height, Rgb([18, 18, 25])));

    // Act
    let cmd = DeviceCommand::write_frame(frame.width(), frame.height());
    let bytes = envelope_for(cmd, frame.data().len() as u32);
    let decoded = CommandEnvelope::decode(&bytes).unwrap();

    // Assert
    assert_eq!(decoded.data_length, 768_000);
    assert_eq!(decoded.direction, Direction::HostToDevice);
    assert_eq!(decoded.tag, TRANSFER_TAG);
    assert_eq!(
        DeviceCommand::from_body(decoded.command_body()),
        Some(DeviceCommand::WriteFrame { x1: 799, y1: 479 })
    );
}

#[test]
fn test_portrait_canvas_encodes_to_native_frame() {
    // Arrange: a vertical canvas for an 800x480 panel is 480x800
    let geometry = DisplayGeometry::FALLBACK;
    let (w, h) = geometry.logical_size(Orientation::Vertical);
    let canvas = solid(w, h, Rgb([0, 0, 0]));

    // Act
    let frame = EncodedFrame::encode(&rotate_to_native(&canvas));

    // Assert
    assert_eq!((frame.width(), frame.height()), (800, 480));
    assert_eq!(frame.data().len(), 2 * 800 * 480);
}

#[test]
fn test_status_envelope_from_device_is_accepted() {
    let raw = [b'U', b'S', b'B', b'S', 0xEF, 0xBE, 0xAD, 0xDE, 0, 0, 0, 0, 0];
    let status = StatusEnvelope::decode(&raw).unwrap();
    assert_eq!(status.tag, TRANSFER_TAG);
    assert_eq!(status.status, 0);
}

#[test]
fn test_dimension_response_for_320x240_panel() {
    let geometry = parse_dimensions(&[0x40, 0x01, 0xF0, 0x00, 0x00]).unwrap();
    assert_eq!(geometry, DisplayGeometry::new(320, 240).unwrap());
}
