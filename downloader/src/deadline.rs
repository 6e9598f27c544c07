/// Shared run deadline: one expiry instant plus a cancellation token.
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Why an operation raced against the deadline was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expired {
    TimedOut,
    Cancelled,
}

impl std::fmt::Display for Expired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expired::TimedOut => write!(f, "deadline exceeded"),
            Expired::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Process-wide deadline. Clones share the same token, so firing it
/// (timeout or explicit cancel) aborts every task at once.
#[derive(Debug, Clone)]
pub struct Deadline {
    token: CancellationToken,
    expires_at: Instant,
}

impl Deadline {
    /// Start a deadline that fires `timeout` from now.
    ///
    /// Spawns a watchdog that cancels the token at expiry; the watchdog exits
    /// early if the token is cancelled first. Must be called inside a runtime.
    pub fn start(timeout: Duration) -> Self {
        let deadline = Self {
            token: CancellationToken::new(),
            expires_at: Instant::now() + timeout,
        };

        let token = deadline.token.clone();
        let expires_at = deadline.expires_at;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(expires_at) => {
                    debug!("Deadline elapsed, cancelling in-flight work");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });

        deadline
    }

    /// Fire the deadline now.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token that cancels the deadline when dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Run `fut` unless the deadline fires first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Expired>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.reason()),
            out = fut => Ok(out),
        }
    }

    fn reason(&self) -> Expired {
        if Instant::now() >= self.expires_at {
            Expired::TimedOut
        } else {
            Expired::Cancelled
        }
    }
}
