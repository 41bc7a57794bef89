// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! High-level clamd client.
//!
//! Each call opens its own connection: scans run in a fresh
//! [`ScanSession`], commands through a [`CommandClient`]. Nothing is shared
//! between calls, so one client may serve concurrent requests.

use std::convert::Infallible;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{stream, Stream};

use crate::command::{CommandClient, DEFAULT_COMMAND_TIMEOUT, PING_COMMAND, VERSION_COMMAND};
use crate::daemon::DaemonAddr;
use crate::error::{CommandResult, ScanResult};
use crate::response::Verdict;
use crate::session::{ScanOptions, ScanSession};

/// Configuration for a [`ClamdClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Daemon to talk to.
    pub addr: DaemonAddr,
    /// Bound on single command exchanges.
    pub command_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: DaemonAddr::default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Client for a clamd instance reachable over TCP.
#[derive(Debug, Clone)]
pub struct ClamdClient {
    config: ClientConfig,
}

impl ClamdClient {
    pub fn new(config: ClientConfig) -> Self {
        ClamdClient { config }
    }

    pub fn addr(&self) -> &DaemonAddr {
        &self.config.addr
    }

    /// Stream `producer` to clamd with `INSTREAM` and return its verdict.
    pub async fn scan_stream<S, E>(&self, producer: S, options: ScanOptions) -> ScanResult<Verdict>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
    {
        let mut session = ScanSession::new(self.config.addr.clone());
        session.run(producer, &options).await
    }

    /// Scan an in-memory buffer as a single chunk.
    pub async fn scan_bytes(
        &self,
        data: impl Into<Bytes>,
        options: ScanOptions,
    ) -> ScanResult<Verdict> {
        let producer = stream::iter([Ok::<_, Infallible>(data.into())]);
        self.scan_stream(producer, options).await
    }

    /// Send a raw command such as `zVERSION\0`.
    pub async fn run_command(&self, command: &str) -> CommandResult<String> {
        self.commands().run(command).await
    }

    /// Daemon version string.
    pub async fn version(&self) -> CommandResult<String> {
        self.run_command(VERSION_COMMAND).await
    }

    /// Liveness probe; `Ok("PONG")` when the daemon is up.
    pub async fn ping(&self) -> CommandResult<String> {
        self.run_command(PING_COMMAND).await
    }

    fn commands(&self) -> CommandClient {
        CommandClient::new(self.config.addr.clone(), self.config.command_timeout)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
