//! Probe statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::resilience::circuit_breaker::CircuitState;

/// Lock-free counters shared by every clone of an executor.
#[derive(Debug, Default)]
pub struct ProbeStats {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    attempts: AtomicU64,
    trips: AtomicU64,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_check(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// One command invocation, retries included.
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// The circuit breaker entered `Open`.
    pub fn record_trip(&self) {
        self.trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, breaker_state: CircuitState, breaker_failures: u32) -> ProbeStatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        let attempts = self.attempts.load(Ordering::Relaxed);

        ProbeStatsSnapshot {
            total_calls: total,
            successful_calls: successful,
            failed_calls: self.failed.load(Ordering::Relaxed),
            retry_attempts: attempts,
            circuit_breaker_trips: self.trips.load(Ordering::Relaxed),
            success_rate: ratio(successful, total),
            retry_rate: ratio(attempts, total),
            circuit_breaker_state: breaker_state,
            circuit_breaker_failures: breaker_failures,
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Point-in-time copy of the counters plus breaker state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeStatsSnapshot {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub retry_attempts: u64,
    pub circuit_breaker_trips: u64,
    pub success_rate: f64,
    pub retry_rate: f64,
    #[serde(serialize_with = "serialize_state")]
    pub circuit_breaker_state: CircuitState,
    pub circuit_breaker_failures: u32,
}

fn serialize_state<S: serde::Serializer>(state: &CircuitState, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(state)
}
