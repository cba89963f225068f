// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::BackendKind;

/// Baud rates the controller firmware has been built for.
pub const BAUD_RATES: [u32; 15] = [
    300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200, 250000, 460800, 500000,
    1000000,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub baud_rates: Vec<u32>,
    pub default_baud_rate: u32,
    pub backend: BackendKind,

    /// Reply polls after sending the handshake request.
    pub handshake_attempts: u32,
    pub handshake_interval_ms: u64,
    /// Upper bound on waiting for a header burst to show up.
    pub header_wait_ms: u64,
    pub header_poll_ms: u64,
    /// Grace period for the second byte of a write-phase packet.
    pub write_settle_ms: u64,

    pub output_dir: PathBuf,
    pub event_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            baud_rates: BAUD_RATES.to_vec(),
            default_baud_rate: 500000,
            backend: BackendKind::Native,
            handshake_attempts: 11,
            handshake_interval_ms: 20,
            header_wait_ms: 500,
            header_poll_ms: 1,
            write_settle_ms: 10,
            output_dir: PathBuf::from("."),
            event_capacity: 256,
        }
    }
}

impl HostConfig {
    /// Loads a JSON config. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn is_supported_baud(&self, rate: u32) -> bool {
        self.baud_rates.contains(&rate)
    }

    pub fn handshake_interval(&self) -> Duration {
        Duration::from_millis(self.handshake_interval_ms)
    }

    pub fn header_wait(&self) -> Duration {
        Duration::from_millis(self.header_wait_ms)
    }

    pub fn header_poll(&self) -> Duration {
        Duration::from_millis(self.header_poll_ms.max(1))
    }

    pub fn write_settle(&self) -> Duration {
        Duration::from_millis(self.write_settle_ms)
    }
}
