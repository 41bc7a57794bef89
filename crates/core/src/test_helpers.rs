// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted clamd stand-in for session and command tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::convert::Infallible;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;

use crate::daemon::DaemonAddr;
use crate::framing::INSTREAM_COMMAND;

/// What the fake daemon does with a connection.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Read the command (and all chunks for INSTREAM), reply, then close.
    Reply(&'static [u8]),
    /// Reply right after the command and close without reading chunks.
    ReplyEarly(&'static [u8]),
    /// Reply right after the command, keep reading for the given time,
    /// then close.
    ReplyAndHold(&'static [u8], Duration),
    /// Read the command, then reset the connection.
    Reset,
    /// Accept, read forever, never answer.
    Silent,
}

/// Everything the fake daemon saw on its connection.
#[derive(Debug, Default)]
pub struct Received {
    pub command: Vec<u8>,
    pub payload: Vec<u8>,
    pub chunks: usize,
    pub terminators: usize,
    /// Bytes that arrived after the terminator.
    pub trailing: usize,
}

/// A one-connection daemon bound to a random local port.
pub struct FakeDaemon {
    addr: DaemonAddr,
    handle: JoinHandle<Received>,
}

impl FakeDaemon {
    pub async fn start(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            serve(stream, behaviour).await
        });

        FakeDaemon {
            addr: DaemonAddr::new("127.0.0.1", port),
            handle,
        }
    }

    pub fn addr(&self) -> DaemonAddr {
        self.addr.clone()
    }

    /// Wait for the connection to finish and return what was received.
    pub async fn received(self) -> Received {
        self.handle.await.unwrap()
    }
}

/// Address of a port nothing listens on.
pub async fn closed_port() -> DaemonAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    DaemonAddr::new("127.0.0.1", port)
}

/// A listener whose accept queue is full, so new connects stay pending.
pub struct Backlogged {
    addr: DaemonAddr,
    _listener: TcpListener,
    _held: Vec<TcpStream>,
}

impl Backlogged {
    pub async fn start() -> Self {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(1).unwrap();
        let local = listener.local_addr().unwrap();

        let mut held = Vec::new();
        for _ in 0..16 {
            match tokio::time::timeout(Duration::from_millis(100), TcpStream::connect(local)).await
            {
                Ok(Ok(stream)) => held.push(stream),
                _ => break,
            }
        }

        Backlogged {
            addr: DaemonAddr::new("127.0.0.1", local.port()),
            _listener: listener,
            _held: held,
        }
    }

    pub fn addr(&self) -> DaemonAddr {
        self.addr.clone()
    }
}

/// Producer that never ends, yielding one segment every `every`.
///
/// The returned counter tracks how many segments were requested.
pub fn endless(
    every: Duration,
) -> (
    impl Stream<Item = Result<Bytes, Infallible>> + Send,
    Arc<AtomicUsize>,
) {
    let pulls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pulls);
    let producer = stream::unfold(counter, move |counter| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(every).await;
        Some((Ok::<_, Infallible>(Bytes::from_static(b"more data")), counter))
    });
    (producer, pulls)
}

/// Producer that yields `segments` and then ends.
pub fn segments(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    let items: Vec<_> = parts
        .iter()
        .map(|&p| Ok::<_, Infallible>(Bytes::from_static(p)))
        .collect();
    stream::iter(items)
}

/// Producer that yields `parts` and then never ends.
pub fn unfinished(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    segments(parts).chain(stream::pending())
}

/// Producer that yields `parts` and then fails.
pub fn failing(
    parts: &[&'static [u8]],
    message: &'static str,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send {
    let mut items: Vec<_> = parts
        .iter()
        .map(|&p| Ok::<_, io::Error>(Bytes::from_static(p)))
        .collect();
    items.push(Err(io::Error::other(message)));
    stream::iter(items)
}

async fn serve(mut stream: TcpStream, behaviour: Behaviour) -> Received {
    let mut received = Received::default();
    read_command(&mut stream, &mut received).await;

    match behaviour {
        Behaviour::Reply(reply) => {
            if received.command == INSTREAM_COMMAND {
                read_chunks(&mut stream, &mut received).await;
            }
            let _ = stream.write_all(reply).await;
            let _ = stream.shutdown().await;
            received.trailing = drain(&mut stream).await;
        }
        Behaviour::ReplyEarly(reply) => {
            let _ = stream.write_all(reply).await;
            let _ = stream.shutdown().await;
            drain(&mut stream).await;
        }
        Behaviour::ReplyAndHold(reply, hold) => {
            let _ = stream.write_all(reply).await;
            let _ = tokio::time::timeout(hold, drain(&mut stream)).await;
        }
        Behaviour::Reset => {
            #[allow(deprecated)]
            let _ = stream.set_linger(Some(Duration::ZERO));
            drop(stream);
            return received;
        }
        Behaviour::Silent => {
            drain(&mut stream).await;
        }
    }
    received
}

async fn read_command(stream: &mut TcpStream, received: &mut Received) {
    loop {
        match stream.read_u8().await {
            Ok(byte) => {
                received.command.push(byte);
                if byte == 0 {
                    return;
                }
            }
            Err(_) => return,
        }
    }
}

async fn read_chunks(stream: &mut TcpStream, received: &mut Received) {
    loop {
        let Ok(len) = stream.read_u32().await else {
            return;
        };
        if len == 0 {
            received.terminators += 1;
            return;
        }
        let mut buf = vec![0u8; len as usize];
        if stream.read_exact(&mut buf).await.is_err() {
            return;
        }
        received.payload.extend_from_slice(&buf);
        received.chunks += 1;
    }
}

/// Read until the client closes; returns the byte count.
async fn drain(stream: &mut TcpStream) -> usize {
    let mut sink = Vec::new();
    stream.read_to_end(&mut sink).await.unwrap_or(0)
}
