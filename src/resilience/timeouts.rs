//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound a single operation by a deadline
//! - Abort the operation as soon as the caller cancels
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout and cancellation are distinct errors; callers retry the first, never the second
//! - The wrapped future is dropped on either outcome, so a child process with
//!   `kill_on_drop` is reaped with it

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeadlineError {
    #[error("deadline of {0:?} exceeded")]
    Elapsed(Duration),
    #[error("operation cancelled")]
    Cancelled,
}

/// Run `fut` until it completes, `deadline` passes, or `cancel` fires.
pub async fn with_deadline<F>(deadline: Duration, cancel: &CancellationToken, fut: F) -> Result<F::Output, DeadlineError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeadlineError::Cancelled),
        result = tokio::time::timeout(deadline, fut) => result.map_err(|_| DeadlineError::Elapsed(deadline)),
    }
}
