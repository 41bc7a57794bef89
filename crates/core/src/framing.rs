// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Chunk framing for the clamd `INSTREAM` command.
//!
//! After the command itself, the byte stream is sent as a sequence of chunks:
//! - 4 bytes: payload length (big-endian u32)
//! - N bytes: payload
//!
//! A single zero-length chunk terminates the stream. clamd keeps reading
//! chunks until it sees the terminator or closes the connection itself.

use bytes::{BufMut, BytesMut};

/// Command that switches a clamd connection into streaming-scan mode.
pub const INSTREAM_COMMAND: &[u8] = b"zINSTREAM\0";

/// Size of the length prefix written ahead of every chunk.
pub const PREFIX_LEN: usize = 4;

/// Zero-length chunk that ends the stream.
pub const TERMINATOR: [u8; PREFIX_LEN] = [0; PREFIX_LEN];

/// Error returned when a segment cannot be framed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// The segment length does not fit in the 4-byte prefix.
    #[error("chunk too large: {0} bytes (max {max})", max = u32::MAX)]
    PayloadTooLarge(usize),

    /// A chunk or second terminator was requested after the stream ended.
    #[error("chunk written after stream terminator")]
    AfterTerminator,
}

/// Turns producer segments into `INSTREAM` wire chunks.
///
/// Segments are framed as received; boundaries chosen by the producer are
/// kept. Empty segments are skipped, so a zero-length prefix only ever
/// appears as the terminator.
#[derive(Debug, Default)]
pub struct ChunkFramer {
    terminated: bool,
    chunks: u64,
    payload_bytes: u64,
}

impl ChunkFramer {
    /// Create a framer that has not yet emitted anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one framed chunk carrying `payload` to `dst`.
    pub fn frame(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), FramingError> {
        if self.terminated {
            return Err(FramingError::AfterTerminator);
        }
        if payload.is_empty() {
            return Ok(());
        }
        let len =
            u32::try_from(payload.len()).map_err(|_| FramingError::PayloadTooLarge(payload.len()))?;

        dst.reserve(PREFIX_LEN + payload.len());
        dst.put_u32(len);
        dst.put_slice(payload);

        self.chunks += 1;
        self.payload_bytes += u64::from(len);
        Ok(())
    }

    /// Append the zero-length terminator to `dst`.
    ///
    /// Succeeds exactly once; every later call (and every later `frame`)
    /// returns [`FramingError::AfterTerminator`].
    pub fn finish(&mut self, dst: &mut BytesMut) -> Result<(), FramingError> {
        if self.terminated {
            return Err(FramingError::AfterTerminator);
        }
        dst.put_slice(&TERMINATOR);
        self.terminated = true;
        Ok(())
    }

    /// Whether the terminator has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of data chunks framed so far.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Total payload bytes framed so far, prefixes excluded.
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
