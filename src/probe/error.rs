//! Probe error taxonomy.

use std::time::Duration;

use crate::resilience::retries::is_transient_error;

/// Why a probe could not determine a target's status.
///
/// Malformed but non-fatal command output is not an error here; it is
/// logged and yields an `Unknown` status without one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The circuit breaker rejected the call; no command was run.
    #[error("circuit breaker is open - findmnt commands are temporarily disabled")]
    CircuitOpen,
    /// Cancellation arrived while waiting between or during attempts.
    #[error("retry cancelled: {0}")]
    RetryCancelled(Box<ProbeError>),
    #[error("context cancelled")]
    Cancelled,
    /// A single attempt exceeded its deadline.
    #[error("findmnt command timed out after {0:?}")]
    Timeout(Duration),
    /// The command failed for a reason other than "target not found".
    #[error("findmnt command failed: {0}")]
    Execution(String),
    /// Retries ran out; wraps the last attempt's error.
    #[error("gave up after {attempts} attempt(s), last error: {source}")]
    Exhausted { attempts: u32, source: Box<ProbeError> },
}

impl ProbeError {
    /// Default retryability predicate for probe attempts.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProbeError::Timeout(_) => true,
            ProbeError::Execution(_) => is_transient_error(self),
            _ => false,
        }
    }

    /// True for the cancellation variants.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ProbeError::Cancelled | ProbeError::RetryCancelled(_))
    }
}
