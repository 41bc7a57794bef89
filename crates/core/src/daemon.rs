// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon address and TCP connection setup.

use std::fmt;
use std::io;

use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tracing::debug;

/// Default clamd TCP port.
pub const DEFAULT_PORT: u16 = 3310;

/// Host and port of a clamd instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonAddr {
    pub host: String,
    pub port: u16,
}

impl DaemonAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        DaemonAddr {
            host: host.into(),
            port,
        }
    }
}

impl Default for DaemonAddr {
    fn default() -> Self {
        DaemonAddr::new("127.0.0.1", DEFAULT_PORT)
    }
}

impl fmt::Display for DaemonAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Open a TCP connection, trying each resolved address in turn.
///
/// Returns the error of the last attempt when none succeeds.
pub(crate) async fn connect(addr: &DaemonAddr, keepalive: bool) -> io::Result<TcpStream> {
    let mut last_err = None;

    for resolved in lookup_host((addr.host.as_str(), addr.port)).await? {
        let socket = if resolved.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_keepalive(keepalive)?;

        match socket.connect(resolved).await {
            Ok(stream) => {
                debug!(%addr, %resolved, "connected to clamd");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, %resolved, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no addresses resolved for {}", addr),
        )
    }))
}
