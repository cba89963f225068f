// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Minimum header bytes for a ROM or RAM read before parsing is attempted.
pub const MIN_READ_HEADER_LEN: usize = 12;

/// Minimum header bytes for the write-RAM exchange.
pub const MIN_WRITE_HEADER_LEN: usize = 7;

/// Smallest transfer a non-GBA cartridge may declare (MBC2 RAM).
pub const MIN_TRANSFER_SIZE: u32 = 0x0200;

/// Largest transfer a non-GBA cartridge may declare (4 MiB ROM).
pub const MAX_TRANSFER_SIZE: u32 = 0x40_0000;

/// Prefix for the generated name used when a cartridge reports a blank title.
pub const FALLBACK_NAME_PREFIX: &str = "GAME_";

/// Date suffix appended to [`FALLBACK_NAME_PREFIX`] (day, month, two digit year).
pub const FALLBACK_NAME_DATE_FORMAT: &str = "%d%m%y";
