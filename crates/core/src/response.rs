// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon response collection and classification.
//!
//! clamd answers a scan with a single line of text and then closes the
//! connection. Known forms:
//! - `stream: OK` (clean)
//! - `stream: <signature> FOUND` (detection)
//! - `stream: <error text>` or any other free text (daemon-side error)
//!
//! Responses may carry a trailing NUL, which is stripped before
//! classification.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Prefix of a clean scan result.
pub const CLEAN_PREFIX: &str = "stream: OK";

/// Suffix clamd appends to a detection.
const FOUND_SUFFIX: &str = " FOUND";

/// Structured outcome of a scan, serialized as `{success, error, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub success: bool,
    pub error: bool,
    pub message: String,
}

impl Verdict {
    /// Classify cleaned daemon text.
    ///
    /// Only text starting with `stream: OK` is a success.
    pub fn parse(raw: &str) -> Self {
        let message = clean_text(raw);
        Verdict {
            success: message.starts_with(CLEAN_PREFIX),
            error: false,
            message,
        }
    }

    /// Failure verdict for a session that never produced a daemon answer.
    pub fn failure(message: impl Into<String>) -> Self {
        Verdict {
            success: false,
            error: true,
            message: message.into(),
        }
    }

    /// Signature name when the daemon reported a detection.
    pub fn signature(&self) -> Option<&str> {
        self.message
            .strip_prefix("stream: ")?
            .strip_suffix(FOUND_SUFFIX)
            .filter(|name| !name.is_empty())
    }
}

/// Remove NUL characters and surrounding whitespace from daemon text.
pub fn clean_text(raw: &str) -> String {
    raw.replace('\0', "").trim().to_string()
}

/// Ordered buffer of byte segments received from the daemon.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    segments: Vec<Bytes>,
    len: usize,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment. Returns `true` if it is the first non-empty one.
    pub fn push(&mut self, segment: Bytes) -> bool {
        if segment.is_empty() {
            return false;
        }
        let first = self.segments.is_empty();
        self.len += segment.len();
        self.segments.push(segment);
        first
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total number of bytes collected.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Drop everything collected so far.
    pub fn reset(&mut self) {
        self.segments.clear();
        self.len = 0;
    }

    /// All segments joined in arrival order.
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }

    /// Collected bytes decoded as text and cleaned.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; clamd speaks ASCII.
    pub fn text(&self) -> String {
        clean_text(&String::from_utf8_lossy(&self.concat()))
    }

    /// Classify the collected response.
    pub fn verdict(&self) -> Verdict {
        Verdict::parse(&String::from_utf8_lossy(&self.concat()))
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
