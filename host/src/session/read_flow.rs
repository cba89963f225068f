// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read flow for ROM and RAM dumps.
//!
//! The first chunk carries the header. Once it parses, the destination file
//! is created and the controller gets `OK`; every later chunk is payload
//! until `file_size` bytes are stored. Bytes beyond that are dropped.

use cartlink::frame::cmd;
use cartlink::header;
use cartlink::types::{CartType, Mode};
use chrono::Local;

use super::Session;
use crate::errors::SessionResult;
use crate::events::Status;
use crate::storage::{transfer_file_name, StorageMode};
use crate::transport::Transport;

impl<T: Transport> Session<T> {
    pub(super) async fn handle_read(&mut self, data: Vec<u8>) -> SessionResult<()> {
        if !self.storage.is_open() || self.game_info.cart_name.trim().is_empty() {
            return self.begin_read(data).await;
        }
        self.receive_payload(&data)
    }

    async fn begin_read(&mut self, data: Vec<u8>) -> SessionResult<()> {
        let buf = self.collect_header(data).await?;
        let parsed = match header::parse(&buf, self.mode) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.emit_status(Status::AbortCmd, None);
                return Err(e.into());
            }
        };
        let consumed = parsed.consumed;
        self.game_info = parsed.game_info;
        if self.mode == Mode::ReadRom && self.game_info.cart_type == CartType::Unknown {
            self.warn("Header carried no cart type; saving the dump as .bin".to_string());
        }

        let extension = self.mode.file_extension(self.game_info.cart_type);
        let path = self
            .config
            .output_dir
            .join(transfer_file_name(&self.game_info.cart_name, extension));
        self.storage.open(&path, StorageMode::Create)?;
        self.started_at = Some(Local::now());

        tracing::info!(
            "{:?}: {} ({:?}, {} bytes) -> {:?}",
            self.mode,
            self.game_info.cart_name,
            self.game_info.cart_type,
            self.game_info.file_size,
            path
        );
        self.emit_status(Status::TaskStart, Some(path.display().to_string()));

        // Ready for data.
        self.transport.write(&[cmd::OK])?;

        if consumed < buf.len() {
            tracing::debug!("{} payload bytes arrived with the header", buf.len() - consumed);
            self.receive_payload(&buf[consumed..])?;
        }
        Ok(())
    }

    fn receive_payload(&mut self, data: &[u8]) -> SessionResult<()> {
        let current = self.game_info.current_addr as u64;
        let size = self.game_info.file_size as u64;

        if current + (data.len() as u64) < size {
            self.storage.write(data)?;
            self.game_info = self.game_info.with_progress((current + data.len() as u64) as u32);
            self.emit_status(Status::Ok, None);
            return Ok(());
        }

        let remaining = (size - current) as usize;
        if data.len() > remaining {
            tracing::debug!("Discarding {} bytes past end of transfer", data.len() - remaining);
        }
        self.storage.write(&data[..remaining])?;
        self.game_info = self.game_info.with_progress(self.game_info.file_size);

        tracing::info!("{:?} finished: {} bytes", self.mode, size);
        self.emit_status(Status::TaskFinished, None);
        self.reset();
        Ok(())
    }
}
