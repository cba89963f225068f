// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Storage Access for transfer files.
//!
//! One file per transfer, owned by the active session:
//! - reads create/truncate the file and append every chunk, flushing as they go
//! - writes open the operator's existing save and serve single bytes from it

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid file name: {0:?}")]
    InvalidPath(PathBuf),

    #[error("{0:?} does not exist")]
    NotFound(PathBuf),

    #[error("File not open")]
    NotOpen,

    #[error("Failed to read {path:?} (@{index}): file is empty")]
    Empty { path: PathBuf, index: u64 },
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// Create or truncate, read-write.
    Create,
    /// Open an existing file read-write.
    Existing,
}

#[derive(Debug, Default)]
pub struct StorageAccess {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl StorageAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path`, closing whatever was open before.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: StorageMode) -> StorageResult<()> {
        let path = path.as_ref();
        let has_stem = path
            .file_stem()
            .map(|s| !s.to_string_lossy().trim().is_empty())
            .unwrap_or(false);
        if !has_stem {
            return Err(StorageError::InvalidPath(path.to_path_buf()));
        }

        self.close();

        let file = match mode {
            StorageMode::Create => OpenOptions::new()
                .create(true)
                .truncate(true)
                .read(true)
                .write(true)
                .open(path)?,
            StorageMode::Existing => {
                if !path.exists() {
                    return Err(StorageError::NotFound(path.to_path_buf()));
                }
                OpenOptions::new().read(true).write(true).open(path)?
            }
        };

        tracing::debug!("Opened {:?} ({:?})", path, mode);
        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Flushes and releases the file. No-op when nothing is open.
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sync_data() {
                tracing::warn!("Failed to sync {:?} on close: {}", self.path, e);
            }
        }
        self.path = None;
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn size(&self) -> StorageResult<u64> {
        let file = self.file.as_ref().ok_or(StorageError::NotOpen)?;
        Ok(file.metadata()?.len())
    }

    /// Appends `bytes` and flushes. Returns the new file size.
    pub fn write(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let file = self.file.as_mut().ok_or(StorageError::NotOpen)?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file.metadata()?.len())
    }

    /// Single byte at `index`. Indices past the end read the last byte.
    pub fn read_at(&mut self, index: u64) -> StorageResult<u8> {
        let size = self.size()?;
        if size == 0 {
            return Err(StorageError::Empty {
                path: self.path.clone().unwrap_or_default(),
                index,
            });
        }
        let index = if index >= size {
            tracing::trace!("Read index {} clamped to {}", index, size - 1);
            size - 1
        } else {
            index
        };

        let file = self.file.as_mut().ok_or(StorageError::NotOpen)?;
        file.seek(SeekFrom::Start(index))?;
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

/// File name for a read transfer: `<cart_name>.<ext>` with characters that
/// are not valid in file names replaced by `_`.
pub fn transfer_file_name(cart_name: &str, extension: &str) -> String {
    let stem: String = cart_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.{}", stem, extension)
}
