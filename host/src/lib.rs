// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Host side driver for the cartridge dumper.
//!
//! Owns the serial transport, the transfer file and the session state
//! machine that speaks the [`cartlink`] protocol. Front ends start
//! operations through a [`session::SessionHandle`] and render the
//! [`events::SessionEvent`]s it broadcasts.

pub mod config;
pub mod errors;
pub mod events;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod transport;

pub use config::HostConfig;
pub use errors::SessionError;
pub use session::{spawn_session, Session, SessionHandle};
