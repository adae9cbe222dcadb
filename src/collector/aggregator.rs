//! Collection aggregator.
//!
//! # Responsibilities
//! - Obtain exactly one result per configured target each cycle
//! - Bound the cycle by a deadline
//! - Fold results into a `CollectionSnapshot`

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::collector::snapshot::CollectionSnapshot;
use crate::config::ExporterConfig;
use crate::probe::{CommandRunner, ProbeError, ProbeExecutor, ProbeResult, ProbeStatsSnapshot};

/// How targets are probed within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMode {
    /// One target at a time; at most one command process alive.
    #[default]
    Serial,
    /// All targets at once through the executor's fan-out.
    Concurrent,
}

impl std::fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionMode::Serial => write!(f, "serial"),
            CollectionMode::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Turns the configured targets into one snapshot per cycle.
#[derive(Debug, Clone)]
pub struct Collector {
    targets: Vec<String>,
    executor: ProbeExecutor,
    mode: CollectionMode,
    cycle_timeout: Duration,
}

impl Collector {
    pub fn new(targets: Vec<String>, executor: ProbeExecutor, mode: CollectionMode, cycle_timeout: Duration) -> Self {
        Self {
            targets,
            executor,
            mode,
            cycle_timeout,
        }
    }

    /// Build a collector, with its own executor and breaker, for `config`.
    pub fn from_config(config: &ExporterConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let executor = ProbeExecutor::new(runner, config.probe_settings());
        Self::new(
            config.mount_points.clone(),
            executor,
            config.collection.mode,
            config.collection.timeout(),
        )
    }

    /// Run one collection cycle.
    ///
    /// Cancelling `cancel`, or hitting the cycle deadline, cancels every
    /// outstanding probe; their slots report a cancellation error.
    pub async fn collect(&self, cancel: &CancellationToken) -> CollectionSnapshot {
        let started = Instant::now();
        let cycle = cancel.child_token();
        let _stop_timer = cycle.clone().drop_guard();
        self.arm_deadline(&cycle);

        let results = match self.mode {
            CollectionMode::Serial => self.collect_serial(&cycle).await,
            CollectionMode::Concurrent => self.executor.check_many(&cycle, &self.targets).await,
        };

        let snapshot = CollectionSnapshot::new(results, started.elapsed());
        tracing::debug!(
            targets = snapshot.len(),
            healthy = snapshot.healthy,
            elapsed_ms = snapshot.elapsed.as_millis() as u64,
            mode = %self.mode,
            "Collection cycle finished"
        );
        snapshot
    }

    async fn collect_serial(&self, cycle: &CancellationToken) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let result = if cycle.is_cancelled() {
                ProbeResult::failed(target.as_str(), ProbeError::Cancelled, Duration::ZERO)
            } else {
                self.executor.check(cycle, target).await
            };
            results.push(result);
        }
        results
    }

    /// Cancel `cycle` once the deadline passes; the timer ends with the cycle.
    fn arm_deadline(&self, cycle: &CancellationToken) {
        let cycle = cycle.clone();
        let deadline = self.cycle_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = cycle.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    tracing::warn!(timeout = ?deadline, "Collection cycle deadline exceeded, cancelling probes");
                    cycle.cancel();
                }
            }
        });
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn mode(&self) -> CollectionMode {
        self.mode
    }

    pub fn executor(&self) -> &ProbeExecutor {
        &self.executor
    }

    /// Liveness: can the command be run at all.
    pub fn is_command_available(&self) -> bool {
        self.executor.is_available()
    }

    pub fn stats(&self) -> ProbeStatsSnapshot {
        self.executor.stats()
    }
}
