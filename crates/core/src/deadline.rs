// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Upper bound on the duration of a scan session.
//!
//! The guard never touches the socket. It only reports expiry; the session
//! that polls it owns the socket and tears it down when the guard fires.
//!
//! ```text
//! Armed ──disarm──► Disarmed
//!   │
//!   └───expiry────► Fired
//! ```

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Lifecycle of a [`DeadlineGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Armed,
    Disarmed,
    Fired,
}

/// Timer armed when a session starts and cleared when it ends.
#[derive(Debug)]
pub struct DeadlineGuard {
    state: GuardState,
    timeout: Duration,
    sleep: Pin<Box<Sleep>>,
}

impl DeadlineGuard {
    /// Start a timer that fires `timeout` from now.
    pub fn arm(timeout: Duration) -> Self {
        DeadlineGuard {
            state: GuardState::Armed,
            timeout,
            sleep: Box::pin(tokio::time::sleep(timeout)),
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Configured duration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time left before expiry; zero once disarmed or fired.
    pub fn remaining(&self) -> Duration {
        match self.state {
            GuardState::Armed => self.sleep.deadline().saturating_duration_since(Instant::now()),
            GuardState::Disarmed | GuardState::Fired => Duration::ZERO,
        }
    }

    /// Clear the timer. No-op unless armed.
    pub fn disarm(&mut self) {
        if self.state == GuardState::Armed {
            self.state = GuardState::Disarmed;
        }
    }

    /// Resolve when the deadline passes.
    ///
    /// Never resolves once the guard is disarmed or has already fired, so it
    /// is safe to poll from a `select!` loop on every iteration.
    pub async fn expired(&mut self) {
        if self.state != GuardState::Armed {
            return future::pending().await;
        }
        self.sleep.as_mut().await;
        self.state = GuardState::Fired;
    }
}

#[cfg(test)]
#[path = "deadline_tests.rs"]
mod tests;
