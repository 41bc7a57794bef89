// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway configuration.
//!
//! Each setting is taken from its command-line flag, then its environment
//! variable, then the built-in default.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use cg_core::daemon::DEFAULT_PORT;
use cg_core::{ClientConfig, DaemonAddr, ScanOptions};

use crate::env::{self, vars};
use crate::error::{Error, Result};
use crate::Args;

/// Port the gateway listens on when nothing else is given.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Raw environment values, captured once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvValues {
    pub clam_host: Option<String>,
    pub clam_port: Option<String>,
    pub port: Option<String>,
    pub scan_timeout_ms: Option<String>,
}

impl EnvValues {
    pub fn from_process() -> Self {
        EnvValues {
            clam_host: env::clam_host(),
            clam_port: env::clam_port(),
            port: env::port(),
            scan_timeout_ms: env::scan_timeout_ms(),
        }
    }
}

/// Fully resolved gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub daemon: ClientConfig,
    pub listen: SocketAddr,
    pub scan: ScanOptions,
}

impl GatewayConfig {
    pub fn resolve(args: &Args, env: &EnvValues) -> Result<Self> {
        let host = args
            .clam_host
            .clone()
            .or_else(|| env.clam_host.clone())
            .unwrap_or_else(|| DaemonAddr::default().host);
        let clam_port =
            pick(args.clam_port, env.clam_port.as_deref(), vars::CLAM_PORT)?.unwrap_or(DEFAULT_PORT);
        let port = pick(args.port, env.port.as_deref(), vars::PORT)?.unwrap_or(DEFAULT_LISTEN_PORT);

        let scan = match pick(
            args.scan_timeout_ms,
            env.scan_timeout_ms.as_deref(),
            vars::SCAN_TIMEOUT_MS,
        )? {
            Some(0) => {
                return Err(Error::Config(
                    "scan timeout must be greater than zero".to_string(),
                ))
            }
            Some(ms) => ScanOptions {
                connection_timeout: Duration::from_millis(ms),
            },
            None => ScanOptions::default(),
        };

        let ip = IpAddr::from_str(&args.bind_host)
            .map_err(|_| Error::Config(format!("invalid bind host: '{}'", args.bind_host)))?;

        Ok(GatewayConfig {
            daemon: ClientConfig {
                addr: DaemonAddr::new(host, clam_port),
                ..ClientConfig::default()
            },
            listen: SocketAddr::new(ip, port),
            scan,
        })
    }
}

/// Flag value if given, else the parsed environment value.
fn pick<T: FromStr>(arg: Option<T>, env: Option<&str>, name: &str) -> Result<Option<T>> {
    if arg.is_some() {
        return Ok(arg);
    }
    env.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("invalid {}: '{}'", name, value)))
    })
    .transpose()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
