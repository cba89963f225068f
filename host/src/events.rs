// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Status events for front ends.
//!
//! Purely informational: progress bars and log panes render these, the
//! protocol never depends on them being delivered.

use cartlink::frame::cmd;
use cartlink::types::{GameInfo, Mode};
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Status {
    Ok,
    TaskStart,
    TaskFinished,
    Reset,
    AbortCmd,
}

impl Status {
    /// Wire command byte this status mirrors.
    pub fn as_byte(self) -> u8 {
        match self {
            Status::Ok => cmd::OK,
            Status::TaskStart => cmd::TASK_START,
            Status::TaskFinished => cmd::TASK_FINISHED,
            Status::Reset => cmd::RESET,
            Status::AbortCmd => cmd::ABORT_CMD,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusEvent {
    pub status: Status,
    pub mode: Mode,
    pub game_info: GameInfo,
    pub started_at: Option<DateTime<Local>>,
    pub message: Option<String>,
}

impl StatusEvent {
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.started_at.map(|start| Local::now() - start)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind")]
pub enum SessionEvent {
    Status(StatusEvent),
    /// Out-of-band device output while idle.
    Info { message: String },
    Warning { message: String },
    Error { message: String },
}

impl SessionEvent {
    pub fn status(&self) -> Option<Status> {
        match self {
            SessionEvent::Status(ev) => Some(ev.status),
            _ => None,
        }
    }
}

/// Fan-out of session events. Emitting with no subscribers is not an error.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}
