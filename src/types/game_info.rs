// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-transfer cartridge information.

use chrono::NaiveDate;
use serde::{Serialize, Deserialize};

use crate::config::{FALLBACK_NAME_DATE_FORMAT, FALLBACK_NAME_PREFIX};
use crate::types::enums::CartType;

/// Cartridge name, type and transfer progress.
///
/// Treated as a value: every change produces a new `GameInfo` that replaces
/// the old one wholesale, so readers never observe a half-applied header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub cart_name: String,
    pub cart_type: CartType,
    /// Declared transfer length in bytes.
    pub file_size: u32,
    /// Bytes transferred so far.
    pub current_addr: u32,
}

impl GameInfo {
    pub fn new(cart_name: impl Into<String>, cart_type: CartType, file_size: u32) -> Self {
        Self {
            cart_name: cart_name.into(),
            cart_type,
            file_size,
            current_addr: 0,
        }
    }

    /// Placeholder used for cartridges whose header title is blank.
    pub fn fallback_name(today: NaiveDate) -> String {
        format!("{}{}", FALLBACK_NAME_PREFIX, today.format(FALLBACK_NAME_DATE_FORMAT))
    }

    pub fn with_progress(&self, current_addr: u32) -> Self {
        Self {
            current_addr,
            ..self.clone()
        }
    }

    pub fn remaining(&self) -> u32 {
        self.file_size.saturating_sub(self.current_addr)
    }

    pub fn is_complete(&self) -> bool {
        self.file_size > 0 && self.current_addr >= self.file_size
    }

    /// Completed fraction in `[0.0, 1.0]`. Zero while no size is known.
    pub fn progress(&self) -> f64 {
        if self.file_size == 0 {
            return 0.0;
        }
        (self.current_addr as f64 / self.file_size as f64).min(1.0)
    }
}
