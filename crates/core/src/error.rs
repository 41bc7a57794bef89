// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for cg-core operations.

use std::time::Duration;

use thiserror::Error;

use crate::framing::FramingError;
use crate::response::Verdict;

/// Ways a scan session can fail.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unable to connect to clamd, {}{source}", with_separator(.partial))]
    Connect {
        partial: String,
        #[source]
        source: std::io::Error,
    },

    #[error("clamd connection failed, {}{source}", with_separator(.partial))]
    Socket {
        partial: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to read stream, {0}")]
    StreamRead(String),

    #[error("scan aborted, {response}")]
    Aborted { response: String },

    #[error("{}", .0.message)]
    Rejected(Verdict),

    #[error("scan timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
}

impl ScanError {
    /// Caller-facing verdict for this failure.
    ///
    /// Always `success: false, error: true`; the message is the Display text.
    pub fn verdict(&self) -> Verdict {
        Verdict::failure(self.to_string())
    }
}

/// Ways a single command exchange can fail.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("error executing command {command}: {source}")]
    Connect {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error executing command {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error executing command {command}: timed out after {}ms", .after.as_millis())]
    Timeout { command: String, after: Duration },
}

fn with_separator(partial: &str) -> String {
    if partial.is_empty() {
        String::new()
    } else {
        format!("{}, ", partial)
    }
}

/// Result of a scan session.
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Result of a command exchange.
pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
