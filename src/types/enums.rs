// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Cartridge and session enums.

use serde::{Serialize, Deserialize};

/// Cartridge family as reported by the controller in the cart-type frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CartType {
    Unknown = 0,
    GbcOnly = 0x78,
    GbcHybrid = 0x79,
    GbOnly = 0x7A,
    GbaOnly = 0x7B,
}

impl CartType {
    /// Maps a wire byte to a known cart type. `Unknown` is never produced here.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x78 => Some(CartType::GbcOnly),
            0x79 => Some(CartType::GbcHybrid),
            0x7A => Some(CartType::GbOnly),
            0x7B => Some(CartType::GbaOnly),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// File extension for a ROM dump of this cartridge.
    pub fn rom_extension(self) -> &'static str {
        match self {
            CartType::GbaOnly => "gba",
            CartType::GbOnly => "gb",
            CartType::GbcOnly | CartType::GbcHybrid => "gbc",
            CartType::Unknown => "bin",
        }
    }
}

impl Default for CartType {
    fn default() -> Self {
        CartType::Unknown
    }
}

/// Transfer mode of a session. Only one mode other than `Idle` is ever active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Idle,
    ReadRom,
    ReadRam,
    WriteRam,
}

impl Mode {
    pub fn is_read(self) -> bool {
        matches!(self, Mode::ReadRom | Mode::ReadRam)
    }

    /// Destination file extension for a read of the given cartridge.
    /// RAM reads are always `.sav`.
    pub fn file_extension(self, cart_type: CartType) -> &'static str {
        match self {
            Mode::ReadRam | Mode::WriteRam => "sav",
            Mode::ReadRom | Mode::Idle => cart_type.rom_extension(),
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Idle
    }
}
