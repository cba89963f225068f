// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Time out: controller sent {received} header bytes, at least {required} required")]
    Timeout { received: usize, required: usize },

    #[error("Error parsing header (cart type): unknown cart type 0x{0:02X}")]
    InvalidCartType(u8),

    #[error("Error parsing header (game name): invalid name frame")]
    InvalidName,

    #[error("Error parsing header (file size): invalid size 0x{0:X}")]
    InvalidSize(u32),

    #[error("Cart error: {0}")]
    DeviceAborted(String),

    #[error("Unexpected data retrieved from controller: {0}")]
    ProtocolViolation(String),

    #[error("Incorrect selected save size ({found}). The game's save is {expected}")]
    SizeMismatch { expected: u32, found: u64 },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
