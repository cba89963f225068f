// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! cartlink: wire protocol kernel for a serial Game Boy / GBA cartridge dumper.
//!
//! Pure and I/O free. Frames and packets go in, typed values and
//! [`error::ProtocolError`]s come out. The host crate owns the transport,
//! the files and the session state machine.

pub mod config;
pub mod error;
pub mod types;
pub mod frame;
pub mod header;
pub mod packet;

pub use error::{ProtocolError, Result};
pub use types::{CartType, GameInfo, Mode};

#[cfg(test)]
pub mod tests;
