// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use cartlink::error::ProtocolError;
use cartlink::types::Mode;
use thiserror::Error;

use crate::storage::StorageError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Session not ready: {0:?} in progress")]
    Busy(Mode),
    #[error("Serial is not connected")]
    NotConnected,
    #[error("Serial is already connected")]
    AlreadyConnected,
    #[error("Controller denied the handshake")]
    HandshakeDenied,
    #[error("Wait cancelled")]
    Cancelled,
    #[error("Session task has stopped")]
    Closed,
}

pub type SessionResult<T> = Result<T, SessionError>;
