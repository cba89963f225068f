// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::frame::{self, cmd, RawFrame, TextCommand};
use crate::types::{CartType, Mode};

#[test]
fn test_cart_type_frame_requires_end_marker() {
    assert_eq!(frame::decode_cart_type(&[0x76, 0x7A, 0x77]), Some(0x7A));
    assert_eq!(frame::decode_cart_type(&[0x76, 0x7A, 0x78]), None);
    assert_eq!(frame::decode_cart_type(&[0x76, 0x7A]), None);
}

#[test]
fn test_size_frame_is_big_endian() {
    let bytes = [0x96, 0x00, 0x00, 0x08, 0x00, 0x97];
    assert_eq!(frame::decode_size(&bytes), Some(2048));
    assert_eq!(frame::encode_size(2048), bytes);

    let bytes = [0x96, 0x01, 0x02, 0x03, 0x04, 0x97];
    assert_eq!(frame::decode_size(&bytes), Some(0x0102_0304));
}

#[test]
fn test_size_frame_with_wrong_end_marker_is_not_a_frame() {
    assert_eq!(frame::decode_size(&[0x96, 0x00, 0x00, 0x08, 0x00, 0x00]), None);
    assert_eq!(frame::decode_at(&[0x96, 0x00, 0x00, 0x08, 0x00, 0x00], 0), None);
}

#[test]
fn test_name_frame_reports_truncation() {
    let buf = [0x86, 0x04, 0x87, b'T', b'E'];
    match frame::decode_name(&buf) {
        Some(RawFrame::Name { declared, bytes }) => {
            assert_eq!(declared, 4);
            assert_eq!(bytes, b"TE");
        }
        other => panic!("unexpected decode: {:?}", other),
    }
}

#[test]
fn test_decode_at_offset() {
    let mut buf = vec![0x00, 0x55];
    buf.extend_from_slice(&frame::encode_name(b"TEST"));
    let raw = frame::decode_at(&buf, 2).unwrap();
    assert_eq!(raw.encoded_len(), 7);
    assert_eq!(raw, RawFrame::Name { declared: 4, bytes: b"TEST" });
    assert_eq!(frame::decode_at(&buf, 0), None);
    assert_eq!(frame::decode_at(&buf, 100), None);
}

#[test]
fn test_encode_frames_match_firmware_layout() {
    assert_eq!(frame::encode_cart_type(CartType::GbaOnly), [0x76, 0x7B, 0x77]);
    assert_eq!(
        frame::encode_name(b"ZELDA"),
        vec![0x86, 5, 0x87, b'Z', b'E', b'L', b'D', b'A']
    );
    let long = vec![b'A'; 300];
    assert_eq!(frame::encode_name(&long).len(), 3 + 255);
}

#[test]
fn test_abort_frame_detection_and_message() {
    let mut buf = vec![cmd::ABORT, cmd::ABORT_CMD];
    buf.extend_from_slice(b"NO CART\r\n");
    assert!(frame::is_abort_frame(&buf));
    assert_eq!(frame::abort_message(&buf), "NO CART");

    assert!(!frame::is_abort_frame(&[cmd::ABORT]));
    assert!(!frame::is_abort_frame(&[cmd::ABORT, 0x10, 0x00]));
    assert_eq!(frame::abort_message(&[cmd::ABORT, cmd::ABORT_PACKET]), "");
}

#[test]
fn test_text_commands() {
    assert_eq!(TextCommand::for_mode(Mode::ReadRom).unwrap().as_str(), "API_READ_ROM\n");
    assert_eq!(TextCommand::for_mode(Mode::ReadRam).unwrap().as_str(), "API_READ_RAM\n");
    assert_eq!(TextCommand::for_mode(Mode::WriteRam).unwrap().as_str(), "API_WRITE_RAM\n");
    assert_eq!(TextCommand::for_mode(Mode::Idle), None);
}

#[test]
fn test_decode_ascii_replaces_high_bytes() {
    assert_eq!(frame::decode_ascii(b"POKEMON RED"), "POKEMON RED");
    assert_eq!(frame::decode_ascii(&[b'A', 0xFF, b'B']), "A?B");
}
