// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Write flow for save uploads.
//!
//! Header phase: the controller declares the save size, which must equal
//! the size of the file the operator picked. Byte phase: one byte at a time,
//! each echoed back by the controller for verification:
//!
//! ```text
//! device: TASK_START        host: OK  storage[0]
//! device: VERIFY <echo>     host: OK  storage[addr + 1]   (echo matched, addr advances)
//!                           host: NOK storage[addr]       (echo mismatched, resend)
//! device: TASK_FINISHED     host: reset
//! ```

use cartlink::error::ProtocolError;
use cartlink::frame::cmd;
use cartlink::header;
use cartlink::packet::WritePacket;
use cartlink::types::Mode;
use chrono::Local;

use super::Session;
use crate::errors::{SessionError, SessionResult};
use crate::events::Status;
use crate::transport::Transport;

impl<T: Transport> Session<T> {
    /// Any failure tears the transfer down and sends `ABORT` before the
    /// error reaches the dispatch boundary, which sends its own `ABORT_CMD`.
    pub(super) async fn handle_write_ram(&mut self, data: Vec<u8>) -> SessionResult<()> {
        let result = if self.game_info.file_size == 0 {
            self.begin_write(data).await
        } else {
            self.write_step(data).await
        };

        match result {
            Err(SessionError::Cancelled) => Err(SessionError::Cancelled),
            Err(e) => {
                self.emit_status(Status::AbortCmd, None);
                self.reset();
                if let Err(send_err) = self.transport.write(&[cmd::ABORT]) {
                    self.warn(format!("Failed to send ABORT to controller: {}", send_err));
                }
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    async fn begin_write(&mut self, data: Vec<u8>) -> SessionResult<()> {
        let buf = self.collect_header(data).await?;
        let parsed = header::parse(&buf, Mode::WriteRam)?;

        let stored = self.storage.size()?;
        if stored != parsed.game_info.file_size as u64 {
            return Err(ProtocolError::SizeMismatch {
                expected: parsed.game_info.file_size,
                found: stored,
            }
            .into());
        }

        self.game_info = parsed.game_info;
        self.started_at = Some(Local::now());
        tracing::info!(
            "WriteRam: {} bytes from {:?}",
            self.game_info.file_size,
            self.storage.path()
        );
        self.emit_status(Status::TaskStart, None);

        self.transport.write(&[cmd::OK])?;
        Ok(())
    }

    async fn write_step(&mut self, mut data: Vec<u8>) -> SessionResult<()> {
        if data.len() < 2 {
            // Either a lone TASK_START/TASK_FINISHED or half of a VERIFY.
            self.pause(self.config.write_settle()).await?;
            data.extend(self.transport.read_available()?);
        }

        match WritePacket::parse(&data)? {
            WritePacket::TaskStart => {
                if self.game_info.current_addr != 0 {
                    return Err(ProtocolError::ProtocolViolation(
                        "Received TASK_START at an unexpected moment".into(),
                    )
                    .into());
                }
                let first = self.storage.read_at(0)?;
                self.transport.write(&[cmd::OK, first])?;
            }
            WritePacket::Verify(echo) => self.verify(echo)?,
            WritePacket::TaskFinished => {
                tracing::info!("WriteRam finished: {} bytes", self.game_info.current_addr);
                self.emit_status(Status::TaskFinished, None);
                self.reset();
            }
        }
        Ok(())
    }

    fn verify(&mut self, echo: u8) -> SessionResult<()> {
        let addr = self.game_info.current_addr;
        let expected = self.storage.read_at(addr as u64)?;

        if echo != expected {
            tracing::debug!(
                "Verify mismatch @{:#06x}: got {:#04x}, expected {:#04x}",
                addr,
                echo,
                expected
            );
            self.transport.write(&[cmd::NOK, expected])?;
            return Ok(());
        }

        let next = addr + 1;
        if next > self.game_info.file_size {
            return Err(ProtocolError::InvalidOperation(format!(
                "Current position in ram ({}) is past ram size ({})",
                next, self.game_info.file_size
            ))
            .into());
        }

        self.game_info = self.game_info.with_progress(next);
        self.emit_status(Status::Ok, None);

        let byte = self.storage.read_at(next as u64)?;
        self.transport.write(&[cmd::OK, byte])?;
        Ok(())
    }
}
