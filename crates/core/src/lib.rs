// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cg-core: client for the clamd streaming-scan protocol.
//!
//! This crate opens TCP connections to clamd, streams arbitrary bytes with
//! the `INSTREAM` chunk framing and turns the daemon's text answer into a
//! [`Verdict`]. Single command exchanges such as `zVERSION` go through the
//! same client.

pub mod client;
pub mod command;
pub mod daemon;
pub mod deadline;
pub mod error;
pub mod framing;
pub mod response;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use client::{ClamdClient, ClientConfig};
pub use command::CommandClient;
pub use daemon::DaemonAddr;
pub use deadline::{DeadlineGuard, GuardState};
pub use error::{CommandError, CommandResult, ScanError, ScanResult};
pub use framing::{ChunkFramer, FramingError};
pub use response::{ResponseCollector, Verdict};
pub use session::{ScanOptions, ScanSession, SessionState};
