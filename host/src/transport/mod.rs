// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Transport contract.
//!
//! The session talks to the controller only through [`Transport`]. The
//! native serial port and FTDI backends both implement it; which one is in
//! use never changes how the session behaves. Backends report incoming bytes
//! and line errors through the [`TransportNotifier`] handed to them on
//! [`Transport::subscribe`], from whatever thread they run on.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// OS serial port driver.
    #[default]
    Native,
    /// FTDI D2XX driver.
    Ftdi,
}

/// A port the backend can open. `device` is what the driver needs,
/// `name` is what an operator sees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialDevice {
    pub name: String,
    pub device: String,
}

impl SerialDevice {
    pub fn new(name: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: device.into(),
        }
    }
}

impl fmt::Display for SerialDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to open {device}: {reason}")]
    Open { device: String, reason: String },
    #[error("Transport is not open")]
    NotOpen,
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaud(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportErrorKind {
    /// Receive buffer overrun.
    Overrun,
    Framing,
    Parity,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportSignal {
    DataReady,
    Error { kind: TransportErrorKind, message: String },
}

/// Callback side of the transport. Cheap to clone, safe to call from any thread.
#[derive(Clone, Debug)]
pub struct TransportNotifier {
    tx: mpsc::UnboundedSender<TransportSignal>,
}

impl TransportNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the session side is gone.
    pub fn data_ready(&self) -> bool {
        self.tx.send(TransportSignal::DataReady).is_ok()
    }

    pub fn error(&self, kind: TransportErrorKind, message: impl Into<String>) -> bool {
        self.tx
            .send(TransportSignal::Error {
                kind,
                message: message.into(),
            })
            .is_ok()
    }
}

pub trait Transport: Send {
    fn devices(&self) -> Vec<SerialDevice>;

    fn open(&mut self, device: &SerialDevice, baud_rate: u32) -> Result<(), TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
    fn is_open(&self) -> bool;

    /// Bytes buffered and ready to be read without blocking.
    fn bytes_available(&self) -> usize;
    fn read(&mut self, count: usize) -> Result<Vec<u8>, TransportError>;
    fn read_byte(&mut self) -> Result<u8, TransportError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.write(text.as_bytes())
    }

    fn subscribe(&mut self, notifier: TransportNotifier);
    fn unsubscribe(&mut self);

    /// Everything currently buffered, possibly nothing.
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        match self.bytes_available() {
            0 => Ok(Vec::new()),
            count => self.read(count),
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn devices(&self) -> Vec<SerialDevice> {
        (**self).devices()
    }

    fn open(&mut self, device: &SerialDevice, baud_rate: u32) -> Result<(), TransportError> {
        (**self).open(device, baud_rate)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn bytes_available(&self) -> usize {
        (**self).bytes_available()
    }

    fn read(&mut self, count: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(count)
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        (**self).read_byte()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        (**self).write_text(text)
    }

    fn subscribe(&mut self, notifier: TransportNotifier) {
        (**self).subscribe(notifier)
    }

    fn unsubscribe(&mut self) {
        (**self).unsubscribe()
    }
}
