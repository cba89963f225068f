// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Frame codec for the controller wire protocol.
//!
//! Header fields travel as marker-delimited frames:
//!
//! ```text
//! cart type : 0x76 <type> 0x77
//! name      : 0x86 <len> 0x87 <len ASCII bytes>
//! size      : 0x96 <b3> <b2> <b1> <b0> 0x97   (big-endian u32)
//! ```
//!
//! A frame only decodes when both its start marker and its end marker sit at
//! the expected offsets. Anything else is not that frame.

use byteorder::{BigEndian, ByteOrder};

use crate::types::{CartType, Mode};

pub const CART_TYPE_START: u8 = 0x76;
pub const CART_TYPE_END: u8 = 0x77;
pub const NAME_START: u8 = 0x86;
pub const NAME_END: u8 = 0x87;
pub const SIZE_START: u8 = 0x96;
pub const SIZE_END: u8 = 0x97;

pub const CART_TYPE_FRAME_LEN: usize = 3;
pub const NAME_FRAME_OVERHEAD: usize = 3;
pub const SIZE_FRAME_LEN: usize = 6;

/// Single byte commands exchanged once a transfer is running.
pub mod cmd {
    pub const OK: u8 = 0x10;
    pub const NOK: u8 = 0x11;
    pub const VERIFY: u8 = 0x12;
    pub const RESET: u8 = 0x13;
    pub const HANDSHAKE_REQUEST: u8 = 0x17;
    pub const HANDSHAKE_ACCEPT: u8 = 0x06;
    pub const HANDSHAKE_DENY: u8 = 0x15;
    pub const TASK_START: u8 = 0x20;
    pub const TASK_FINISHED: u8 = 0x21;
    pub const ABORT: u8 = 0xF0;
    pub const ABORT_ERROR: u8 = 0xF1;
    pub const ABORT_CMD: u8 = 0xF2;
    pub const ABORT_PACKET: u8 = 0xF3;
}

/// ASCII commands that start a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextCommand {
    ReadRom,
    ReadRam,
    WriteRam,
}

impl TextCommand {
    pub fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::ReadRom => Some(TextCommand::ReadRom),
            Mode::ReadRam => Some(TextCommand::ReadRam),
            Mode::WriteRam => Some(TextCommand::WriteRam),
            Mode::Idle => None,
        }
    }

    /// Command line including the terminating newline.
    pub fn as_str(self) -> &'static str {
        match self {
            TextCommand::ReadRom => "API_READ_ROM\n",
            TextCommand::ReadRam => "API_READ_RAM\n",
            TextCommand::WriteRam => "API_WRITE_RAM\n",
        }
    }
}

/// A header frame as found on the wire, before any range validation.
#[derive(Debug, PartialEq, Eq)]
pub enum RawFrame<'a> {
    CartType(u8),
    /// `bytes` holds what is available of the name and may be shorter than
    /// `declared` when the buffer is truncated.
    Name { declared: usize, bytes: &'a [u8] },
    Size(u32),
}

impl RawFrame<'_> {
    /// Number of buffer bytes the frame occupies.
    pub fn encoded_len(&self) -> usize {
        match self {
            RawFrame::CartType(_) => CART_TYPE_FRAME_LEN,
            RawFrame::Name { declared, .. } => NAME_FRAME_OVERHEAD + declared,
            RawFrame::Size(_) => SIZE_FRAME_LEN,
        }
    }
}

pub fn decode_cart_type(buf: &[u8]) -> Option<u8> {
    match buf {
        [CART_TYPE_START, kind, CART_TYPE_END, ..] => Some(*kind),
        _ => None,
    }
}

pub fn decode_name(buf: &[u8]) -> Option<RawFrame<'_>> {
    match buf {
        [NAME_START, len, NAME_END, rest @ ..] => {
            let declared = *len as usize;
            let available = declared.min(rest.len());
            Some(RawFrame::Name {
                declared,
                bytes: &rest[..available],
            })
        }
        _ => None,
    }
}

pub fn decode_size(buf: &[u8]) -> Option<u32> {
    if buf.len() < SIZE_FRAME_LEN || buf[0] != SIZE_START || buf[5] != SIZE_END {
        return None;
    }
    Some(BigEndian::read_u32(&buf[1..5]))
}

/// Tries every frame kind at `offset`.
pub fn decode_at(buf: &[u8], offset: usize) -> Option<RawFrame<'_>> {
    let tail = buf.get(offset..)?;
    if let Some(kind) = decode_cart_type(tail) {
        return Some(RawFrame::CartType(kind));
    }
    if let Some(name) = decode_name(tail) {
        return Some(name);
    }
    decode_size(tail).map(RawFrame::Size)
}

pub fn encode_cart_type(cart_type: CartType) -> [u8; CART_TYPE_FRAME_LEN] {
    [CART_TYPE_START, cart_type.as_u8(), CART_TYPE_END]
}

/// Names longer than 255 bytes are cut to fit the length byte.
pub fn encode_name(name: &[u8]) -> Vec<u8> {
    let name = &name[..name.len().min(u8::MAX as usize)];
    let mut out = Vec::with_capacity(NAME_FRAME_OVERHEAD + name.len());
    out.extend_from_slice(&[NAME_START, name.len() as u8, NAME_END]);
    out.extend_from_slice(name);
    out
}

pub fn encode_size(size: u32) -> [u8; SIZE_FRAME_LEN] {
    let mut out = [SIZE_START, 0, 0, 0, 0, SIZE_END];
    BigEndian::write_u32(&mut out[1..5], size);
    out
}

/// Both leading bytes at or above `ABORT` mark an error report from the device.
pub fn is_abort_frame(buf: &[u8]) -> bool {
    matches!(buf, [a, b, ..] if *a >= cmd::ABORT && *b >= cmd::ABORT)
}

/// Text carried by an abort frame: bytes 2 through `len - 2`.
pub fn abort_message(buf: &[u8]) -> String {
    let end = buf.len().saturating_sub(2);
    if end <= 2 {
        return String::new();
    }
    decode_ascii(&buf[2..end])
}

/// Lossy ASCII decoding; bytes above 0x7F become `?`.
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}
