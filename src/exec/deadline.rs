// src/exec/deadline.rs

//! The two sequential time windows of an invocation.
//!
//! Window 1 bounds the child (optional). Window 2 bounds the export and only
//! starts once window 1 has been handed back. Each [`Deadline`] releases its
//! timer on every exit path, explicitly via [`Deadline::release`] or on drop.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Command,
    Export,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Command => f.write_str("command"),
            Window::Export => f.write_str("export"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{window} deadline of {limit:?} exceeded")]
pub struct DeadlineExceeded {
    pub window: Window,
    pub limit: Duration,
}

/// Configured limits for both windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPair {
    /// `None` lets the child run indefinitely.
    pub command: Option<Duration>,
    pub export: Duration,
}

impl TimeoutPair {
    /// A zero `command` duration means unbounded.
    pub fn new(command: Duration, export: Duration) -> Self {
        Self {
            command: (!command.is_zero()).then_some(command),
            export,
        }
    }
}

/// One active time window.
#[derive(Debug)]
pub struct Deadline {
    window: Window,
    limit: Option<Duration>,
    expires_at: Option<Instant>,
    released: bool,
}

impl Deadline {
    fn start(window: Window, limit: Option<Duration>) -> Self {
        let expires_at = limit.map(|d| Instant::now() + d);
        debug!(%window, ?limit, "deadline window started");
        Self {
            window,
            limit,
            expires_at,
            released: false,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn is_bounded(&self) -> bool {
        self.expires_at.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Time left, `None` if unbounded or released.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Run `fut` until it completes or the window closes.
    ///
    /// On expiry `fut` is dropped and [`DeadlineExceeded`] returned. An
    /// unbounded or released window never expires.
    pub async fn bound<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        match (self.expires_at, self.limit) {
            (Some(at), Some(limit)) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| DeadlineExceeded {
                    window: self.window,
                    limit,
                }),
            _ => Ok(fut.await),
        }
    }

    /// Close the window. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.expires_at = None;
        debug!(window = %self.window, "deadline window released");
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.release();
    }
}

/// Hands out the command window, then the export window, in that order.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineCoordinator {
    timeouts: TimeoutPair,
}

impl DeadlineCoordinator {
    pub fn new(timeouts: TimeoutPair) -> Self {
        Self { timeouts }
    }

    pub fn timeouts(&self) -> TimeoutPair {
        self.timeouts
    }

    /// Open window 1. Unbounded when no command timeout is configured.
    pub fn begin_command(&self) -> Deadline {
        Deadline::start(Window::Command, self.timeouts.command)
    }

    /// Close window 1 and open window 2; the export clock starts now.
    pub fn begin_export(&self, mut command: Deadline) -> Deadline {
        command.release();
        drop(command);
        Deadline::start(Window::Export, Some(self.timeouts.export))
    }
}
