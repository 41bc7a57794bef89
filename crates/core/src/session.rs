// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One streaming scan against clamd.
//!
//! A [`ScanSession`] owns the daemon socket for the duration of a scan and
//! drives it through an explicit state machine:
//!
//! ```text
//! Idle ─► Connecting ─┬─► ConnectFailed
//!                     └─► Streaming ─► AwaitingResponse ─┬─► Completed
//!                            │                            ├─► Rejected
//!                            ├─► StreamFailed             ├─► Aborted
//!                            ├─► Aborted                  └─► TimedOut
//!                            └─► TimedOut
//! ```
//!
//! Every transition is triggered by one event: connect completion, daemon
//! data, daemon close, socket error, producer item/end/error, or deadline
//! expiry. Teardown goes through a single guarded path, so the socket is
//! closed at most once whichever path reaches it first.
//!
//! While streaming, producer segments are only pulled when the previous
//! chunk has been written. Once the daemon sends anything, the producer is
//! no longer polled; the daemon may answer before consuming the whole
//! stream (size limit, early rejection) and the session then waits for it
//! to close the connection.

use std::fmt;
use std::io;
use std::pin::pin;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::daemon::{self, DaemonAddr};
use crate::deadline::DeadlineGuard;
use crate::error::{ScanError, ScanResult};
use crate::framing::{ChunkFramer, FramingError, INSTREAM_COMMAND};
use crate::response::{ResponseCollector, Verdict};

/// Default upper bound on a scan session (10 minutes).
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(600_000);

/// Read buffer size for daemon responses.
const READ_CHUNK: usize = 4096;

/// Per-scan options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Deadline for the whole session, connect included.
    pub connection_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

/// Position of a session in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    ConnectFailed,
    Streaming,
    AwaitingResponse,
    Completed,
    Rejected,
    Aborted,
    StreamFailed,
    TimedOut,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::ConnectFailed => "connect_failed",
            SessionState::Streaming => "streaming",
            SessionState::AwaitingResponse => "awaiting_response",
            SessionState::Completed => "completed",
            SessionState::Rejected => "rejected",
            SessionState::Aborted => "aborted",
            SessionState::StreamFailed => "stream_failed",
            SessionState::TimedOut => "timed_out",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::ConnectFailed
                | SessionState::Completed
                | SessionState::Rejected
                | SessionState::Aborted
                | SessionState::StreamFailed
                | SessionState::TimedOut
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Daemon socket with an explicit closed flag.
#[derive(Debug, Default)]
struct SessionSocket {
    stream: Option<TcpStream>,
    closed: bool,
    teardowns: u32,
}

impl SessionSocket {
    fn attach(&mut self, stream: TcpStream) {
        self.stream = Some(stream);
    }

    /// Close the socket. Only the first call has any effect.
    fn destroy(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.teardowns += 1;
        // Dropping the stream closes both directions.
        self.stream = None;
    }
}

/// How the streaming loop ended.
enum Exit {
    DaemonClosed,
    Socket(io::Error),
    StreamRead(String),
    Framing(FramingError),
    TimedOut,
}

/// State of one scan: daemon address, socket, collected response and flags.
#[derive(Debug)]
pub struct ScanSession {
    addr: DaemonAddr,
    socket: SessionSocket,
    responses: ResponseCollector,
    /// Producer signalled the end of its stream.
    complete: bool,
    /// Session ended in a failure.
    error: bool,
    state: SessionState,
}

impl ScanSession {
    pub fn new(addr: DaemonAddr) -> Self {
        ScanSession {
            addr,
            socket: SessionSocket::default(),
            responses: ResponseCollector::new(),
            complete: false,
            error: false,
            state: SessionState::Idle,
        }
    }

    pub fn addr(&self) -> &DaemonAddr {
        &self.addr
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the producer finished its stream.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the last run ended in a failure.
    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Number of times the socket was actually torn down (0 or 1 per run).
    pub fn teardowns(&self) -> u32 {
        self.socket.teardowns
    }

    /// Bytes the daemon sent during the last run.
    pub fn response_len(&self) -> usize {
        self.responses.len()
    }

    /// Stream `producer` to clamd and return its verdict.
    ///
    /// Resolves exactly once, when the session reaches a terminal state.
    /// Anything other than a `stream: OK` answer is an error; a detection
    /// surfaces as [`ScanError::Rejected`] carrying the parsed verdict.
    pub async fn run<S, E>(&mut self, producer: S, options: &ScanOptions) -> ScanResult<Verdict>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
    {
        self.reset();
        let mut guard = DeadlineGuard::arm(options.connection_timeout);

        let result = self.drive(producer, &mut guard).await;

        guard.disarm();
        self.teardown();
        self.error = result.is_err();
        result
    }

    fn reset(&mut self) {
        self.socket = SessionSocket::default();
        self.responses.reset();
        self.complete = false;
        self.error = false;
        self.state = SessionState::Idle;
    }

    fn transition(&mut self, next: SessionState) {
        enter(&mut self.state, next, &self.addr);
    }

    fn teardown(&mut self) {
        if !self.socket.closed {
            debug!(addr = %self.addr, state = %self.state, "closing clamd socket");
        }
        self.socket.destroy();
    }

    async fn drive<S, E>(&mut self, producer: S, guard: &mut DeadlineGuard) -> ScanResult<Verdict>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
    {
        self.transition(SessionState::Connecting);

        let connected = tokio::select! {
            biased;
            () = guard.expired() => return Err(self.time_out(guard.timeout())),
            res = daemon::connect(&self.addr, true) => res,
        };

        let stream = match connected {
            Ok(stream) => stream,
            Err(source) => {
                self.transition(SessionState::ConnectFailed);
                let partial = self.responses.text();
                warn!(addr = %self.addr, error = %source, "unable to connect to clamd");
                self.teardown();
                return Err(ScanError::Connect { partial, source });
            }
        };
        self.socket.attach(stream);
        self.transition(SessionState::Streaming);

        let exit = self.exchange(producer, guard).await;
        self.conclude(exit, guard.timeout())
    }

    /// Pump producer chunks out and daemon bytes in until something ends it.
    async fn exchange<S, E>(&mut self, producer: S, guard: &mut DeadlineGuard) -> Exit
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
    {
        let Some(stream) = self.socket.stream.as_mut() else {
            return Exit::Socket(io::Error::from(io::ErrorKind::NotConnected));
        };
        let (mut reader, mut writer) = stream.split();
        let mut producer = pin!(producer);

        let mut framer = ChunkFramer::new();
        let mut outbound = BytesMut::from(INSTREAM_COMMAND);
        let mut inbound = BytesMut::with_capacity(READ_CHUNK);
        let mut paused = false;
        let mut write_closed = false;

        loop {
            inbound.reserve(READ_CHUNK);
            let pull = outbound.is_empty() && !self.complete && !paused && !write_closed;
            let push = !outbound.is_empty() && !write_closed;

            tokio::select! {
                biased;
                () = guard.expired() => return Exit::TimedOut,
                read = reader.read_buf(&mut inbound) => match read {
                    Ok(0) => return Exit::DaemonClosed,
                    Ok(n) => {
                        let first = self.responses.push(inbound.split().freeze());
                        if first && !self.complete {
                            paused = true;
                            debug!(addr = %self.addr, bytes = n, "clamd answered early, pausing producer");
                        }
                    }
                    Err(e) => return Exit::Socket(e),
                },
                written = writer.write(&outbound), if push => match written {
                    Ok(0) => {
                        warn!(addr = %self.addr, "clamd stopped accepting data");
                        write_closed = true;
                    }
                    Ok(n) => {
                        outbound.advance(n);
                        if outbound.is_empty() && framer.is_terminated() {
                            enter(&mut self.state, SessionState::AwaitingResponse, &self.addr);
                        }
                    }
                    Err(e) => {
                        // The daemon may have closed after answering; keep
                        // reading so its response is not lost.
                        warn!(addr = %self.addr, error = %e, "write to clamd failed");
                        write_closed = true;
                    }
                },
                next = producer.next(), if pull => match next {
                    Some(Ok(chunk)) => {
                        if let Err(e) = framer.frame(&chunk, &mut outbound) {
                            return Exit::Framing(e);
                        }
                    }
                    Some(Err(e)) => return Exit::StreamRead(e.to_string()),
                    None => {
                        self.complete = true;
                        if let Err(e) = framer.finish(&mut outbound) {
                            return Exit::Framing(e);
                        }
                        debug!(
                            addr = %self.addr,
                            chunks = framer.chunks(),
                            bytes = framer.payload_bytes(),
                            "producer finished"
                        );
                    }
                },
            }
        }
    }

    /// Map how the exchange ended to a terminal state and result.
    fn conclude(&mut self, exit: Exit, timeout: Duration) -> ScanResult<Verdict> {
        match exit {
            Exit::DaemonClosed if !self.complete => {
                self.transition(SessionState::Aborted);
                self.teardown();
                let response = self.responses.text();
                warn!(addr = %self.addr, %response, "clamd closed before stream completed");
                Err(ScanError::Aborted { response })
            }
            Exit::DaemonClosed => {
                self.teardown();
                let verdict = self.responses.verdict();
                if verdict.success {
                    self.transition(SessionState::Completed);
                    Ok(verdict)
                } else {
                    self.transition(SessionState::Rejected);
                    if let Some(signature) = verdict.signature() {
                        info!(addr = %self.addr, signature, "clamd reported detection");
                    }
                    Err(ScanError::Rejected(verdict))
                }
            }
            Exit::Socket(source) => {
                self.transition(SessionState::Aborted);
                self.teardown();
                let partial = self.responses.text();
                warn!(addr = %self.addr, error = %source, "clamd connection failed");
                Err(ScanError::Socket { partial, source })
            }
            Exit::StreamRead(message) => {
                self.transition(SessionState::StreamFailed);
                self.teardown();
                warn!(addr = %self.addr, error = %message, "unable to read stream");
                Err(ScanError::StreamRead(message))
            }
            Exit::Framing(e) => {
                self.transition(SessionState::StreamFailed);
                self.teardown();
                Err(e.into())
            }
            Exit::TimedOut => Err(self.time_out(timeout)),
        }
    }

    fn time_out(&mut self, after: Duration) -> ScanError {
        self.transition(SessionState::TimedOut);
        self.teardown();
        info!(addr = %self.addr, ?after, "clamd socket destroyed after deadline");
        ScanError::Timeout { after }
    }
}

fn enter(state: &mut SessionState, next: SessionState, addr: &DaemonAddr) {
    debug!(%addr, from = %state, to = %next, "scan session transition");
    *state = next;
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
