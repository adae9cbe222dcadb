//! Probe executor.
//!
//! # Responsibilities
//! - Compose circuit breaker, retries and a per-attempt deadline around
//!   one command invocation for one target
//! - Classify and parse the command's outcome into a `ProbeResult`
//! - Fan out over many targets, keeping results in input order
//! - Keep call statistics
//!
//! # Design Decisions
//! - The breaker is consulted with `rejects_calls` before anything else, so a
//!   rejected check costs no command and no retry, yet an elapsed reset
//!   timeout still lets the trial through
//! - Cancellation is recorded as neither success nor failure by the breaker
//! - Clones share the runner, breaker and counters

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::probe::command::CommandRunner;
use crate::probe::error::ProbeError;
use crate::probe::parse::{classify, Classification};
use crate::probe::stats::{ProbeStats, ProbeStatsSnapshot};
use crate::probe::types::{MountInfo, MountStatus, ProbeResult};
use crate::resilience::backoff::{Backoff, BackoffStrategy};
use crate::resilience::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState, Outcome, StateChange, StateObserver,
};
use crate::resilience::retries::{RetryError, RetryPolicy};
use crate::resilience::timeouts::{with_deadline, DeadlineError};

/// Tunables for one executor.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Deadline for a single command invocation.
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub breaker: CircuitBreakerConfig,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff: Backoff {
                strategy: BackoffStrategy::Exponential,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(5),
                multiplier: 2.0,
                jitter: 0.1,
            },
            breaker: CircuitBreakerConfig {
                name: "findmnt-circuit-breaker".to_string(),
                max_failures: 5,
                reset_timeout: Duration::from_secs(60),
            },
        }
    }
}

/// What one successful invocation established.
struct Observation {
    status: MountStatus,
    info: Option<MountInfo>,
}

/// Logs breaker transitions and counts trips.
struct TransitionLogger {
    stats: Arc<ProbeStats>,
}

impl StateObserver for TransitionLogger {
    fn on_state_change(&self, change: &StateChange) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if change.to == CircuitState::Open {
            self.stats.record_trip();
            tracing::warn!(
                breaker = %change.name,
                from = %change.from,
                to = %change.to,
                "Circuit breaker opened, probes temporarily disabled"
            );
        } else {
            tracing::info!(breaker = %change.name, from = %change.from, to = %change.to, "Circuit breaker state changed");
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProbeExecutor {
    runner: Arc<dyn CommandRunner>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy<ProbeError>,
    timeout: Duration,
    stats: Arc<ProbeStats>,
}

impl std::fmt::Debug for ProbeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeExecutor")
            .field("breaker", &self.breaker)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProbeExecutor {
    /// Build an executor around `runner`.
    ///
    /// Starts the breaker's observer task, so this must run inside a Tokio runtime.
    pub fn new(runner: Arc<dyn CommandRunner>, settings: ProbeSettings) -> Self {
        let stats = Arc::new(ProbeStats::new());
        let observer = Arc::new(TransitionLogger { stats: stats.clone() });
        let breaker = CircuitBreaker::with_observer(settings.breaker, observer);
        let retry = RetryPolicy::new(settings.max_attempts, settings.backoff).with_should_retry(ProbeError::is_retryable);

        Self {
            runner,
            breaker: Arc::new(breaker),
            retry,
            timeout: settings.timeout,
            stats,
        }
    }

    /// Determine whether `target` is mounted. Never fails; errors are
    /// carried in the result.
    pub async fn check(&self, cancel: &CancellationToken, target: &str) -> ProbeResult {
        let started = Instant::now();
        self.stats.record_check();

        if self.breaker.rejects_calls() {
            self.stats.record_failure();
            return ProbeResult::failed(target, ProbeError::CircuitOpen, started.elapsed());
        }

        let outcome = self
            .breaker
            .execute_classified(
                || self.retry.run(cancel, |_| self.invoke_once(cancel, target)),
                breaker_outcome,
            )
            .await;

        match outcome {
            Ok(observation) => {
                self.stats.record_success();
                ProbeResult {
                    target: target.to_string(),
                    status: observation.status,
                    info: observation.info,
                    error: None,
                    elapsed: started.elapsed(),
                }
            }
            Err(err) => {
                self.stats.record_failure();
                let error = probe_error(err);
                tracing::debug!(mount_point = %target, error = %error, "Probe failed");
                ProbeResult::failed(target, error, started.elapsed())
            }
        }
    }

    /// Check every target concurrently; `results[i]` belongs to `targets[i]`.
    ///
    /// On cancellation, returns at once with every unresolved slot set to
    /// `Unknown` and a cancellation error.
    pub async fn check_many(&self, cancel: &CancellationToken, targets: &[String]) -> Vec<ProbeResult> {
        let started = Instant::now();
        let mut slots: Vec<Option<ProbeResult>> = vec![None; targets.len()];
        let mut tasks = JoinSet::new();

        for (index, target) in targets.iter().enumerate() {
            let executor = self.clone();
            let cancel = cancel.clone();
            let target = target.clone();
            tasks.spawn(async move { (index, executor.check(&cancel, &target).await) });
        }

        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, result))) => slots[index] = Some(result),
                    Some(Err(e)) => tracing::error!(error = %e, "Probe task failed"),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    tracing::debug!(pending = tasks.len(), "Fan-out cancelled");
                    break;
                }
            }
        }
        tasks.abort_all();

        let cancelled = cancel.is_cancelled();
        slots
            .into_iter()
            .zip(targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| {
                    let error = if cancelled {
                        ProbeError::Cancelled
                    } else {
                        ProbeError::Execution("probe task failed".to_string())
                    };
                    ProbeResult::failed(target.as_str(), error, started.elapsed())
                })
            })
            .collect()
    }

    /// One command invocation under the per-attempt deadline.
    async fn invoke_once(&self, cancel: &CancellationToken, target: &str) -> Result<Observation, ProbeError> {
        self.stats.record_attempt();

        let output = match with_deadline(self.timeout, cancel, self.runner.run(target)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ProbeError::Execution(e.to_string())),
            Err(DeadlineError::Elapsed(deadline)) => return Err(ProbeError::Timeout(deadline)),
            Err(DeadlineError::Cancelled) => return Err(ProbeError::Cancelled),
        };

        match classify(&output)? {
            Classification::Mounted(info) => Ok(Observation {
                status: MountStatus::Mounted,
                info: Some(info),
            }),
            Classification::NotMounted => Ok(Observation {
                status: MountStatus::NotMounted,
                info: None,
            }),
            Classification::Anomaly => {
                tracing::warn!(mount_point = %target, "Unparseable findmnt output, status unknown");
                Ok(Observation {
                    status: MountStatus::Unknown,
                    info: None,
                })
            }
        }
    }

    /// True if the command can be found at all, independent of any target.
    pub fn is_available(&self) -> bool {
        self.runner.is_available()
    }

    pub async fn version(&self) -> io::Result<String> {
        self.runner.version().await
    }

    pub fn reset_circuit_breaker(&self) {
        self.breaker.reset();
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn stats(&self) -> ProbeStatsSnapshot {
        self.stats.snapshot(self.breaker.state(), self.breaker.failures())
    }
}

fn breaker_outcome(err: &RetryError<ProbeError>) -> Outcome {
    match err {
        RetryError::Cancelled { .. } => Outcome::Ignored,
        RetryError::Exhausted { source, .. } if source.is_cancellation() => Outcome::Ignored,
        RetryError::Exhausted { .. } => Outcome::Failure,
    }
}

fn probe_error(err: CircuitBreakerError<RetryError<ProbeError>>) -> ProbeError {
    match err {
        CircuitBreakerError::Open => ProbeError::CircuitOpen,
        CircuitBreakerError::Inner(RetryError::Cancelled { .. }) => ProbeError::RetryCancelled(Box::new(ProbeError::Cancelled)),
        CircuitBreakerError::Inner(RetryError::Exhausted { source, .. }) if source.is_cancellation() => {
            ProbeError::RetryCancelled(Box::new(source))
        }
        CircuitBreakerError::Inner(RetryError::Exhausted { attempts, source }) => ProbeError::Exhausted {
            attempts,
            source: Box::new(source),
        },
    }
}
