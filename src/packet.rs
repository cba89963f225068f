// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Write-RAM byte phase packets.
//!
//! Once the header exchange is done the controller only ever sends one or
//! two byte packets: `TASK_START`, `TASK_FINISHED`, or `VERIFY <echo>`.

use crate::error::{ProtocolError, Result};
use crate::frame::cmd;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePacket {
    TaskStart,
    TaskFinished,
    /// Device echo of the last byte it wrote.
    Verify(u8),
}

impl WritePacket {
    pub fn parse(data: &[u8]) -> Result<Self> {
        match data {
            [] => Err(ProtocolError::ProtocolViolation("empty packet".into())),
            [first, ..] if data.len() > 2 => Err(violation(*first, data.len())),
            [cmd::TASK_START, ..] => Ok(WritePacket::TaskStart),
            [cmd::TASK_FINISHED, ..] => Ok(WritePacket::TaskFinished),
            [cmd::VERIFY, echo] => Ok(WritePacket::Verify(*echo)),
            [first, ..] => Err(violation(*first, data.len())),
        }
    }
}

fn violation(first: u8, len: usize) -> ProtocolError {
    ProtocolError::ProtocolViolation(format!("0x{:02X}({})", first, len))
}
