// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Session State Machine
//!
//! One [`Session`] drives one controller. It is `Idle` until a transfer is
//! started and returns to `Idle` when the transfer completes, fails or the
//! transport is disconnected.
//!
//! # Dispatch
//! Every data-ready notification reads everything buffered once and routes
//! it by mode:
//! - `ReadRom` / `ReadRam` → read flow
//! - `WriteRam` → write flow
//! - `Idle` → logged verbatim as device chatter
//!
//! Flow errors never escape: they are reported, the session is reset and the
//! controller gets a best-effort `ABORT_CMD`.
//!
//! The session itself is not reentrant. [`spawn_session`] moves it into a
//! single task so requests and transport signals are handled one at a time.
//!
//! # Cancellation
//! Every bounded wait (handshake polling, header wait, write settle) races
//! the session's [`WaitCanceller`]. Tripping it from outside the task ends
//! the wait at once with [`SessionError::Cancelled`], which lets a disconnect
//! overtake a transfer that is parked in a wait.

mod actor;
mod handshake;
mod read_flow;
mod write_flow;

pub use actor::{spawn_session, SessionHandle};
pub use handshake::HandshakeOutcome;

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cartlink::error::ProtocolError;
use cartlink::frame::{self, cmd, TextCommand};
use cartlink::types::{GameInfo, Mode};
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::HostConfig;
use crate::errors::{SessionError, SessionResult};
use crate::events::{EventBus, SessionEvent, Status, StatusEvent};
use crate::storage::{StorageAccess, StorageMode};
use crate::transport::{SerialDevice, Transport, TransportErrorKind, TransportNotifier, TransportSignal};

/// Point-in-time view of a session for front ends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub mode: Mode,
    pub game_info: GameInfo,
    pub started_at: Option<DateTime<Local>>,
}

/// Shared switch that cuts the session's current wait short.
///
/// Stays tripped until the session disconnects, so a wait that starts after
/// the cancel but before the disconnect is handled also ends immediately.
#[derive(Clone, Debug, Default)]
pub struct WaitCanceller {
    current: Arc<Mutex<CancellationToken>>,
}

impl WaitCanceller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.lock().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().is_cancelled()
    }

    fn token(&self) -> CancellationToken {
        self.lock().clone()
    }

    fn renew(&self) {
        *self.lock() = CancellationToken::new();
    }

    fn lock(&self) -> MutexGuard<'_, CancellationToken> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Session<T: Transport> {
    transport: T,
    config: HostConfig,
    notifier: TransportNotifier,
    storage: StorageAccess,
    mode: Mode,
    game_info: GameInfo,
    started_at: Option<DateTime<Local>>,
    events: EventBus,
    canceller: WaitCanceller,
}

impl<T: Transport> Session<T> {
    /// `notifier` is handed to the transport on connect; its receiving end
    /// should feed [`Session::handle_signal`].
    pub fn new(transport: T, config: HostConfig, notifier: TransportNotifier) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            transport,
            config,
            notifier,
            storage: StorageAccess::new(),
            mode: Mode::Idle,
            game_info: GameInfo::default(),
            started_at: None,
            events,
            canceller: WaitCanceller::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Handle for cancelling waits from another task.
    pub fn canceller(&self) -> WaitCanceller {
        self.canceller.clone()
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn game_info(&self) -> &GameInfo {
        &self.game_info
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    pub fn is_busy(&self) -> bool {
        self.mode != Mode::Idle
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connected: self.is_connected(),
            mode: self.mode,
            game_info: self.game_info.clone(),
            started_at: self.started_at,
        }
    }

    pub fn devices(&self) -> Vec<SerialDevice> {
        self.transport.devices()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn read_rom(&mut self) -> SessionResult<()> {
        self.start_transfer(Mode::ReadRom)
    }

    pub fn read_ram(&mut self) -> SessionResult<()> {
        self.start_transfer(Mode::ReadRam)
    }

    /// Starts writing the save at `path` to the cartridge. The file must
    /// already exist; its size is checked against the controller's header.
    pub fn write_ram(&mut self, path: impl AsRef<Path>) -> SessionResult<()> {
        self.ensure_ready()?;
        self.storage.open(path, StorageMode::Existing)?;
        self.start_transfer(Mode::WriteRam)
    }

    fn ensure_ready(&self) -> SessionResult<()> {
        if !self.transport.is_open() {
            return Err(SessionError::NotConnected);
        }
        if self.is_busy() {
            return Err(SessionError::Busy(self.mode));
        }
        Ok(())
    }

    fn start_transfer(&mut self, mode: Mode) -> SessionResult<()> {
        self.ensure_ready()?;
        let command = TextCommand::for_mode(mode).ok_or_else(|| {
            ProtocolError::InvalidOperation(format!("{:?} is not a transfer mode", mode))
        })?;

        self.mode = mode;
        if let Err(e) = self.transport.write_text(command.as_str()) {
            tracing::error!("Failed to send {:?}: {}", command, e);
            self.reset();
            return Err(e.into());
        }
        tracing::info!("Started {:?}", mode);
        Ok(())
    }

    /// Back to `Idle`: closes the transfer file and clears the game info.
    /// Always emits a `Reset` status, even when already idle.
    pub fn reset(&mut self) {
        self.storage.close();
        self.game_info = GameInfo::default();
        self.mode = Mode::Idle;
        self.started_at = None;
        self.emit_status(Status::Reset, None);
    }

    pub async fn handle_signal(&mut self, signal: TransportSignal) {
        match signal {
            TransportSignal::DataReady => self.on_data_ready().await,
            TransportSignal::Error { kind, message } => self.on_transport_error(kind, message),
        }
    }

    /// Reads everything buffered and routes it by mode.
    pub async fn on_data_ready(&mut self) {
        if !self.transport.is_open() {
            return;
        }

        let data = match self.transport.read_available() {
            Ok(data) => data,
            Err(e) if self.is_busy() => {
                self.abort_transfer(e.into());
                return;
            }
            Err(e) => {
                self.warn(format!("Failed to read from controller: {}", e));
                return;
            }
        };
        // Stale notification; the bytes were already consumed by a flow.
        if data.is_empty() {
            return;
        }

        let result = match self.mode {
            Mode::WriteRam => self.handle_write_ram(data).await,
            Mode::ReadRom | Mode::ReadRam => self.handle_read(data).await,
            Mode::Idle => {
                let message = frame::decode_ascii(&data);
                tracing::info!("Controller: {}", message.trim_end());
                self.events.emit(SessionEvent::Info { message });
                Ok(())
            }
        };

        match result {
            Ok(()) => {}
            // The disconnect queued behind this wait tears the transfer down.
            Err(SessionError::Cancelled) => tracing::debug!("{:?} wait cancelled", self.mode),
            Err(e) => self.abort_transfer(e),
        }
    }

    /// Line errors leave the transport usable, so they do not end the transfer.
    pub fn on_transport_error(&mut self, kind: TransportErrorKind, message: String) {
        self.warn(format!("Transport error ({:?}): {}", kind, message));
    }

    fn abort_transfer(&mut self, err: SessionError) {
        tracing::error!("Transfer failed in {:?}: {}", self.mode, err);
        if let SessionError::Protocol(ProtocolError::DeviceAborted(message)) = &err {
            self.warn(format!("Cart Error : {}", message));
        }
        self.events.emit(SessionEvent::Error {
            message: err.to_string(),
        });
        self.reset();

        if let Err(e) = self.transport.write(&[cmd::ABORT_CMD]) {
            self.warn(format!("Failed to send abort to controller: {}", e));
        }
    }

    /// Appends whatever arrives within the header wait to `buf`.
    ///
    /// Waits for the first byte, then reads twice back to back: the
    /// controller may still be sending the tail of the header.
    async fn collect_header(&mut self, mut buf: Vec<u8>) -> SessionResult<Vec<u8>> {
        let deadline = Instant::now() + self.config.header_wait();
        while self.transport.bytes_available() == 0 && Instant::now() < deadline {
            self.pause(self.config.header_poll()).await?;
        }

        for _ in 0..2 {
            buf.extend(self.transport.read_available()?);
        }
        tracing::debug!("Header buffer: {} bytes", buf.len());
        Ok(buf)
    }

    /// Sleeps for `duration` unless the canceller trips first. The returned
    /// future does not borrow the session.
    fn pause(&self, duration: Duration) -> impl Future<Output = SessionResult<()>> + Send + 'static {
        let token = self.canceller.token();
        async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(SessionError::Cancelled),
                _ = sleep(duration) => Ok(()),
            }
        }
    }

    fn emit_status(&self, status: Status, message: Option<String>) {
        self.events.emit(SessionEvent::Status(StatusEvent {
            status,
            mode: self.mode,
            game_info: self.game_info.clone(),
            started_at: self.started_at,
            message,
        }));
    }

    fn warn(&self, message: String) {
        tracing::warn!("{}", message);
        self.events.emit(SessionEvent::Warning { message });
    }
}
