// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Header Parser.
//!
//! Scans an accumulated receive buffer for the cart-type, name and size
//! frames. Frames may come in any order with unrelated bytes between them.
//! The result is a fresh [`GameInfo`] plus the offset just past the last
//! consumed frame, so callers can skip straight to payload bytes that shared
//! the same receive chunk.

use chrono::{Local, NaiveDate};

use crate::config::{MAX_TRANSFER_SIZE, MIN_READ_HEADER_LEN, MIN_TRANSFER_SIZE, MIN_WRITE_HEADER_LEN};
use crate::error::{ProtocolError, Result};
use crate::frame::{self, RawFrame};
use crate::types::{CartType, GameInfo, Mode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub game_info: GameInfo,
    /// Offset just past the last consumed header byte.
    pub consumed: usize,
}

pub fn min_header_len(mode: Mode) -> usize {
    match mode {
        Mode::WriteRam => MIN_WRITE_HEADER_LEN,
        Mode::ReadRom | Mode::ReadRam | Mode::Idle => MIN_READ_HEADER_LEN,
    }
}

/// Parses a header, dating any generated fallback name with today's date.
pub fn parse(buf: &[u8], mode: Mode) -> Result<Header> {
    parse_on(buf, mode, Local::now().date_naive())
}

/// Same as [`parse`] with an explicit date for the fallback name.
pub fn parse_on(buf: &[u8], mode: Mode, today: NaiveDate) -> Result<Header> {
    if frame::is_abort_frame(buf) {
        return Err(ProtocolError::DeviceAborted(frame::abort_message(buf)));
    }

    let required = min_header_len(mode);
    if buf.len() < required {
        return Err(ProtocolError::Timeout {
            received: buf.len(),
            required,
        });
    }

    let mut cart_type = CartType::Unknown;
    let mut name: Option<String> = None;
    let mut size: Option<u32> = None;
    let mut consumed = 0;
    let mut offset = 0;

    while offset < buf.len() {
        let Some(raw) = frame::decode_at(buf, offset) else {
            offset += 1;
            continue;
        };
        let frame_len = raw.encoded_len();

        match raw {
            RawFrame::CartType(byte) => {
                cart_type = CartType::from_u8(byte).ok_or(ProtocolError::InvalidCartType(byte))?;
            }
            RawFrame::Name { declared, bytes } => {
                if declared == 0 || bytes.len() < declared {
                    return Err(ProtocolError::InvalidName);
                }
                name = Some(frame::decode_ascii(bytes));
            }
            RawFrame::Size(value) => size = Some(value),
        }

        offset += frame_len;
        consumed = offset;
    }

    // Size limits depend on the cart type, which may arrive after the size frame.
    let file_size = size.unwrap_or(0);
    validate_size(file_size, cart_type)?;

    let cart_name = match name {
        Some(n) if !n.trim().is_empty() => n,
        _ => GameInfo::fallback_name(today),
    };

    Ok(Header {
        game_info: GameInfo::new(cart_name, cart_type, file_size),
        consumed,
    })
}

/// Zero is never valid. Non-GBA carts must also stay within the MBC limits.
pub fn validate_size(size: u32, cart_type: CartType) -> Result<()> {
    if size == 0 {
        return Err(ProtocolError::InvalidSize(size));
    }
    if cart_type != CartType::GbaOnly && !(MIN_TRANSFER_SIZE..=MAX_TRANSFER_SIZE).contains(&size) {
        return Err(ProtocolError::InvalidSize(size));
    }
    Ok(())
}
