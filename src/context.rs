//! Per-request execution context: target database, deadline, and cancellation.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Seconds an adapter call may take. Attached to the request by the timeout middleware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTimeout(pub u64);

/// Set by a request interceptor to replace the configured timeout for that request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutOverride(pub u64);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("context canceled")]
    Canceled,
}

/// Owned by one dispatch. Dropping it cancels the token, so work tied to it stops
/// on completion, error, or when the request future itself is dropped (client disconnect).
pub struct ExecutionContext {
    database: String,
    deadline: Instant,
    token: CancellationToken,
    _release: DropGuard,
}

impl ExecutionContext {
    pub fn new(database: impl Into<String>, timeout: Duration) -> Self {
        let token = CancellationToken::new();
        ExecutionContext {
            database: database.into(),
            deadline: Instant::now() + timeout,
            _release: token.clone().drop_guard(),
            token,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Token cancelled when this context is released; hand clones to spawned work.
    pub fn cancellation(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Drive `fut` until it finishes, the deadline passes, or the context is cancelled.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Interrupted::Canceled),
            _ = tokio::time::sleep_until(self.deadline) => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
