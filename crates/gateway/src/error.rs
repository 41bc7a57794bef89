// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that stop the gateway from starting or serving.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A specialized Result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;
