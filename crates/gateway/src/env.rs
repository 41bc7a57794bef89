// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule. Empty values count as unset.

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `CLAM_HOST` if set.
pub fn clam_host() -> Option<String> {
    non_empty(vars::CLAM_HOST)
}

/// Returns the value of `CLAM_PORT` if set.
pub fn clam_port() -> Option<String> {
    non_empty(vars::CLAM_PORT)
}

/// Returns the value of `PORT` if set.
pub fn port() -> Option<String> {
    non_empty(vars::PORT)
}

/// Returns the value of `CLAMGATE_SCAN_TIMEOUT_MS` if set.
pub fn scan_timeout_ms() -> Option<String> {
    non_empty(vars::SCAN_TIMEOUT_MS)
}

/// Returns the `RUST_LOG` filter directive if set.
pub fn log_directive() -> Option<String> {
    non_empty(vars::RUST_LOG)
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
