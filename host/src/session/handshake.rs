// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Connect, handshake and disconnect.

use cartlink::frame::cmd;
use serde::Serialize;

use super::Session;
use crate::errors::{SessionError, SessionResult};
use crate::transport::{SerialDevice, Transport, TransportError};

/// How the controller answered `HANDSHAKE_REQUEST`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HandshakeOutcome {
    Accepted,
    Denied,
    /// Some other byte. Older firmware answers with stray data.
    Unexpected(u8),
    NoResponse,
}

impl<T: Transport> Session<T> {
    /// Opens the transport and performs the handshake.
    ///
    /// A denied handshake closes the transport again. No reply or a wrong
    /// reply keeps the connection open with a warning.
    pub async fn connect(&mut self, device: &SerialDevice, baud_rate: u32) -> SessionResult<HandshakeOutcome> {
        if self.is_busy() {
            return Err(SessionError::Busy(self.mode));
        }
        if self.transport.is_open() {
            return Err(SessionError::AlreadyConnected);
        }
        if !self.config.is_supported_baud(baud_rate) {
            return Err(TransportError::UnsupportedBaud(baud_rate).into());
        }

        self.transport.open(device, baud_rate)?;
        tracing::info!("Opened {} ({}) at {} baud", device, device.device, baud_rate);

        let outcome = match self.attempt_handshake().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.close_transport();
                return Err(e);
            }
        };

        match outcome {
            HandshakeOutcome::Accepted => tracing::info!("Handshake accepted"),
            HandshakeOutcome::Denied => {
                tracing::warn!("Controller denied the handshake");
                self.close_transport();
                return Err(SessionError::HandshakeDenied);
            }
            HandshakeOutcome::Unexpected(_) | HandshakeOutcome::NoResponse => {
                tracing::debug!("Handshake outcome: {:?}", outcome);
                self.warn(
                    "Controller did not respond correctly to the handshake. Keeping connection open..."
                        .to_string(),
                );
            }
        }

        self.transport.subscribe(self.notifier.clone());
        Ok(outcome)
    }

    async fn attempt_handshake(&mut self) -> SessionResult<HandshakeOutcome> {
        self.transport.write(&[cmd::HANDSHAKE_REQUEST])?;

        for _ in 0..self.config.handshake_attempts {
            if self.transport.bytes_available() > 0 {
                let reply = self.transport.read_byte()?;
                return Ok(match reply {
                    cmd::HANDSHAKE_ACCEPT => HandshakeOutcome::Accepted,
                    cmd::HANDSHAKE_DENY => HandshakeOutcome::Denied,
                    other => HandshakeOutcome::Unexpected(other),
                });
            }
            self.pause(self.config.handshake_interval()).await?;
        }

        Ok(HandshakeOutcome::NoResponse)
    }

    /// Hard cancel, valid from any state: drops the callbacks, closes the
    /// transport and resets the session even mid-transfer. Re-arms the
    /// [`WaitCanceller`](super::WaitCanceller) afterwards.
    pub fn disconnect(&mut self) -> SessionResult<()> {
        if self.is_busy() {
            tracing::warn!("Disconnecting during {:?}; transfer abandoned", self.mode);
        }
        self.transport.unsubscribe();
        let closed = if self.transport.is_open() {
            self.transport.close()
        } else {
            Ok(())
        };
        self.reset();
        self.canceller.renew();
        tracing::info!("Disconnected");
        closed.map_err(Into::into)
    }

    fn close_transport(&mut self) {
        if let Err(e) = self.transport.close() {
            tracing::warn!("Failed to close transport: {}", e);
        }
    }
}
