// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Single command/response exchanges with clamd.
//!
//! The client writes one NUL-terminated command, reads until the daemon
//! closes the connection and returns the cleaned text. There are no
//! retries; callers decide whether to try again.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::daemon::{self, DaemonAddr};
use crate::error::{CommandError, CommandResult};
use crate::response::clean_text;

/// Query the daemon version.
pub const VERSION_COMMAND: &str = "zVERSION\0";

/// Liveness probe; clamd answers `PONG`.
pub const PING_COMMAND: &str = "zPING\0";

/// Default bound on a command exchange.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Client for commands that need no chunk framing.
#[derive(Debug, Clone)]
pub struct CommandClient {
    addr: DaemonAddr,
    timeout: Duration,
}

impl CommandClient {
    pub fn new(addr: DaemonAddr, timeout: Duration) -> Self {
        CommandClient { addr, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `command` and return the daemon's trimmed answer.
    ///
    /// A missing trailing NUL is appended. The whole exchange, connect
    /// included, is bounded by the client timeout.
    pub async fn run(&self, command: &str) -> CommandResult<String> {
        let label = command.trim_end_matches('\0').to_string();
        let wire = if command.ends_with('\0') {
            command.to_string()
        } else {
            format!("{}\0", command)
        };

        match tokio::time::timeout(self.timeout, self.exchange(&wire, &label)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(addr = %self.addr, command = %label, "clamd command timed out");
                Err(CommandError::Timeout {
                    command: label,
                    after: self.timeout,
                })
            }
        }
    }

    async fn exchange(&self, wire: &str, label: &str) -> CommandResult<String> {
        let io_error = |source| CommandError::Io {
            command: label.to_string(),
            source,
        };

        let mut stream =
            daemon::connect(&self.addr, false)
                .await
                .map_err(|source| CommandError::Connect {
                    command: label.to_string(),
                    source,
                })?;

        stream.write_all(wire.as_bytes()).await.map_err(io_error)?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.map_err(io_error)?;

        let text = clean_text(&String::from_utf8_lossy(&response));
        debug!(addr = %self.addr, command = %label, response = %text, "clamd command completed");
        Ok(text)
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
