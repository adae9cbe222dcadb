//! Retry logic.
//!
//! # Responsibilities
//! - Run a fallible async operation up to `max_attempts` times
//! - Wait a jittered backoff between attempts, observing cancellation
//! - Stop early on success or on an error the predicate refuses to retry
//!
//! # Design Decisions
//! - The policy is immutable and shared; each run is independent
//! - Cancellation during a wait returns a distinct error and never re-runs the operation
//! - Exhaustion reports the attempt count and wraps the last error

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::resilience::backoff::Backoff;

/// Substrings that mark an error as transient (matched case-insensitively).
const TRANSIENT_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "connection refused",
    "temporary failure",
    "rate limited",
    "service unavailable",
    "network unreachable",
    "network is unreachable",
    "no route to host",
    "connection reset",
    "deadline exceeded",
    "resource temporarily unavailable",
];

/// True if the error's message matches a known transient pattern.
pub fn is_transient_error(err: &dyn fmt::Display) -> bool {
    let message = err.to_string().to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|pattern| message.contains(pattern))
}

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Error returned when a retried operation does not succeed.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Cancellation arrived while waiting between attempts.
    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, last: E },
    /// The operation failed and no further attempt was allowed.
    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted { attempts: u32, source: E },
}

impl<E> RetryError<E> {
    /// Number of times the operation ran.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Cancelled { attempts, .. } | RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The error produced by the final attempt.
    pub fn into_last(self) -> E {
        match self {
            RetryError::Cancelled { last, .. } => last,
            RetryError::Exhausted { source, .. } => source,
        }
    }
}

/// Immutable retry policy: attempt limit, backoff and retryability predicate.
pub struct RetryPolicy<E> {
    max_attempts: u32,
    backoff: Backoff,
    should_retry: Predicate<E>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            should_retry: self.should_retry.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<E> RetryPolicy<E> {
    /// Create a policy that retries every error. `max_attempts` is raised to at least 1.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            should_retry: Arc::new(|_| true),
        }
    }

    /// Replace the retryability predicate.
    pub fn with_should_retry<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn is_retryable(&self, err: &E) -> bool {
        (self.should_retry)(err)
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match self.next_step(cancel, attempt, err).await {
                Step::Retry => attempt += 1,
                Step::Stop(e) => return Err(e),
            }
        }
    }

    /// Run `op`, which reports a value alongside every outcome.
    ///
    /// The value produced by the final attempt is returned whether or not it
    /// succeeded.
    pub async fn run_with_value<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> (T, Result<(), RetryError<E>>)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = (T, Result<(), E>)>,
    {
        let mut attempt = 1;
        loop {
            let (value, outcome) = op(attempt).await;
            let err = match outcome {
                Ok(()) => return (value, Ok(())),
                Err(e) => e,
            };

            match self.next_step(cancel, attempt, err).await {
                Step::Retry => attempt += 1,
                Step::Stop(e) => return (value, Err(e)),
            }
        }
    }

    /// Decide what follows a failed attempt, waiting out the backoff if retrying.
    async fn next_step(&self, cancel: &CancellationToken, attempt: u32, err: E) -> Step<E> {
        if !self.is_retryable(&err) || attempt >= self.max_attempts {
            return Step::Stop(RetryError::Exhausted { attempts: attempt, source: err });
        }

        let delay = self.backoff.jittered(attempt);
        tracing::debug!(attempt, delay = ?delay, "Retrying after failure");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Stop(RetryError::Cancelled { attempts: attempt, last: err }),
            _ = tokio::time::sleep(delay) => Step::Retry,
        }
    }
}

enum Step<E> {
    Retry,
    Stop(RetryError<E>),
}
