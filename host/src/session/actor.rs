// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Single-consumer session task.
//!
//! Front-end requests and transport signals both land in one `select!`
//! loop, so the session never handles two of them at once.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc, oneshot};

use super::{HandshakeOutcome, Session, SessionSnapshot, WaitCanceller};
use crate::config::HostConfig;
use crate::errors::{SessionError, SessionResult};
use crate::events::{EventBus, SessionEvent};
use crate::transport::{SerialDevice, Transport, TransportNotifier, TransportSignal};

const REQUEST_QUEUE: usize = 32;

enum Request {
    Connect {
        device: SerialDevice,
        baud_rate: u32,
        reply: oneshot::Sender<SessionResult<HandshakeOutcome>>,
    },
    Disconnect {
        reply: oneshot::Sender<SessionResult<()>>,
    },
    ReadRom {
        reply: oneshot::Sender<SessionResult<()>>,
    },
    ReadRam {
        reply: oneshot::Sender<SessionResult<()>>,
    },
    WriteRam {
        path: PathBuf,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Devices {
        reply: oneshot::Sender<Vec<SerialDevice>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front-end handle to a running session task.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    events: EventBus,
    canceller: WaitCanceller,
    baud_rates: Vec<u32>,
}

/// Moves `transport` into a new session task. Must be called inside a Tokio runtime.
pub fn spawn_session<T: Transport + 'static>(transport: T, config: HostConfig) -> SessionHandle {
    let (notifier, signals) = TransportNotifier::channel();
    let baud_rates = config.baud_rates.clone();
    let session = Session::new(transport, config, notifier);
    let events = session.events();
    let canceller = session.canceller();
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE);

    tokio::spawn(run(session, rx, signals));

    SessionHandle {
        requests: tx,
        events,
        canceller,
        baud_rates,
    }
}

async fn run<T: Transport>(
    mut session: Session<T>,
    mut requests: mpsc::Receiver<Request>,
    mut signals: mpsc::UnboundedReceiver<TransportSignal>,
) {
    tracing::debug!("Session task started");
    let mut shutdown_reply = None;

    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(Request::Shutdown { reply }) => {
                    shutdown_reply = Some(reply);
                    break;
                }
                Some(request) => handle_request(&mut session, request).await,
                None => break,
            },
            Some(signal) = signals.recv() => session.handle_signal(signal).await,
        }
    }

    if session.is_connected() {
        if let Err(e) = session.disconnect() {
            tracing::warn!("Disconnect on shutdown failed: {}", e);
        }
    }
    tracing::debug!("Session task stopped");
    if let Some(reply) = shutdown_reply {
        let _ = reply.send(());
    }
}

async fn handle_request<T: Transport>(session: &mut Session<T>, request: Request) {
    // A dropped reply receiver only means the caller stopped waiting.
    match request {
        Request::Connect {
            device,
            baud_rate,
            reply,
        } => {
            let _ = reply.send(session.connect(&device, baud_rate).await);
        }
        Request::Disconnect { reply } => {
            let _ = reply.send(session.disconnect());
        }
        Request::ReadRom { reply } => {
            let _ = reply.send(session.read_rom());
        }
        Request::ReadRam { reply } => {
            let _ = reply.send(session.read_ram());
        }
        Request::WriteRam { path, reply } => {
            let _ = reply.send(session.write_ram(&path));
        }
        Request::Snapshot { reply } => {
            let _ = reply.send(session.snapshot());
        }
        Request::Devices { reply } => {
            let _ = reply.send(session.devices());
        }
        Request::Shutdown { reply } => {
            let _ = reply.send(());
        }
    }
}

impl SessionHandle {
    async fn call<R>(&self, build: impl FnOnce(oneshot::Sender<R>) -> Request) -> SessionResult<R> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(build(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn baud_rates(&self) -> &[u32] {
        &self.baud_rates
    }

    pub async fn connect(&self, device: SerialDevice, baud_rate: u32) -> SessionResult<HandshakeOutcome> {
        self.call(|reply| Request::Connect {
            device,
            baud_rate,
            reply,
        })
        .await?
    }

    /// Cuts any wait in progress short, then disconnects.
    pub async fn disconnect(&self) -> SessionResult<()> {
        self.canceller.cancel();
        self.call(|reply| Request::Disconnect { reply }).await?
    }

    pub async fn read_rom(&self) -> SessionResult<()> {
        self.call(|reply| Request::ReadRom { reply }).await?
    }

    pub async fn read_ram(&self) -> SessionResult<()> {
        self.call(|reply| Request::ReadRam { reply }).await?
    }

    pub async fn write_ram(&self, path: impl Into<PathBuf>) -> SessionResult<()> {
        let path = path.into();
        self.call(|reply| Request::WriteRam { path, reply }).await?
    }

    pub async fn snapshot(&self) -> SessionResult<SessionSnapshot> {
        self.call(|reply| Request::Snapshot { reply }).await
    }

    pub async fn is_connected(&self) -> SessionResult<bool> {
        Ok(self.snapshot().await?.connected)
    }

    pub async fn is_busy(&self) -> SessionResult<bool> {
        Ok(self.snapshot().await?.mode != cartlink::types::Mode::Idle)
    }

    pub async fn devices(&self) -> SessionResult<Vec<SerialDevice>> {
        self.call(|reply| Request::Devices { reply }).await
    }

    /// Disconnects if needed and stops the session task.
    pub async fn shutdown(&self) -> SessionResult<()> {
        self.canceller.cancel();
        self.call(|reply| Request::Shutdown { reply }).await
    }
}
