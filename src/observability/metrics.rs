//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Map a collection snapshot onto Prometheus gauges
//! - Export probe statistics and circuit breaker state
//! - Keep the per-target success counter across scrapes of the same target
//!
//! # Metrics
//! - `mount_exporter_mount_point_status` (gauge): 1=mounted, 0 otherwise, labelled with attributes and error
//! - `mount_exporter_scrape_duration_seconds` (gauge): time spent on one target
//! - `mount_exporter_scrape_success_total` (counter): error-free probes per target
//! - `mount_exporter_up` (gauge): 1=every probe error-free, 0 otherwise
//! - `mount_exporter_total_scrape_duration_seconds` (gauge): whole cycle
//! - `mount_exporter_probe_*` (counters/gauges): executor statistics
//! - `mount_exporter_circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - No global recorder is installed; recorders are scoped with `with_local_recorder`
//! - Per-cycle values come from a fresh recorder, so stale label sets never linger
//! - Success counts are kept per target outside any recorder and written with
//!   `absolute`; a target absent from a snapshot loses its count and series

use std::collections::HashMap;
use std::sync::Mutex;

use metrics::{counter, describe_counter, describe_gauge, gauge, with_local_recorder, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::collector::CollectionSnapshot;
use crate::probe::{MountStatus, ProbeStatsSnapshot};

/// Content type of the Prometheus text format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

const MOUNT_POINT_STATUS: &str = "mount_exporter_mount_point_status";
const SCRAPE_DURATION: &str = "mount_exporter_scrape_duration_seconds";
const SCRAPE_SUCCESS: &str = "mount_exporter_scrape_success_total";
const UP: &str = "mount_exporter_up";
const TOTAL_SCRAPE_DURATION: &str = "mount_exporter_total_scrape_duration_seconds";
const PROBE_CALLS: &str = "mount_exporter_probe_calls_total";
const PROBE_SUCCESSES: &str = "mount_exporter_probe_successful_calls_total";
const PROBE_FAILURES: &str = "mount_exporter_probe_failed_calls_total";
const PROBE_ATTEMPTS: &str = "mount_exporter_probe_attempts_total";
const PROBE_SUCCESS_RATE: &str = "mount_exporter_probe_success_rate";
const PROBE_RETRY_RATE: &str = "mount_exporter_probe_retry_rate";
const BREAKER_STATE: &str = "mount_exporter_circuit_breaker_state";
const BREAKER_FAILURES: &str = "mount_exporter_circuit_breaker_failures";
const BREAKER_TRIPS: &str = "mount_exporter_circuit_breaker_trips_total";

/// Renders snapshots in the Prometheus text format.
pub struct MetricsExporter {
    successes: Mutex<HashMap<String, u64>>,
}

impl Default for MetricsExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter").finish_non_exhaustive()
    }
}

impl MetricsExporter {
    pub fn new() -> Self {
        Self {
            successes: Mutex::new(HashMap::new()),
        }
    }

    /// Render one cycle's snapshot and the executor statistics.
    ///
    /// Bumps the success count of every error-free result as a side effect.
    pub fn render(&self, snapshot: &CollectionSnapshot, stats: &ProbeStatsSnapshot) -> String {
        let successes = self.count_successes(snapshot);

        let recorder = PrometheusBuilder::new().build_recorder();
        with_local_recorder(&recorder, || {
            describe_metrics();
            record_snapshot(snapshot);
            for (target, total) in successes {
                counter!(SCRAPE_SUCCESS, "mount_point" => target).absolute(total);
            }
            record_stats(stats);
        });
        recorder.handle().render()
    }

    /// Update per-target success counts and forget targets no longer probed.
    fn count_successes(&self, snapshot: &CollectionSnapshot) -> Vec<(String, u64)> {
        let mut successes = match self.successes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        successes.retain(|target, _| snapshot.results.iter().any(|r| &r.target == target));

        snapshot
            .results
            .iter()
            .map(|result| {
                let total = successes.entry(result.target.clone()).or_insert(0);
                if result.is_ok() {
                    *total += 1;
                }
                (result.target.clone(), *total)
            })
            .collect()
    }
}

fn describe_metrics() {
    describe_gauge!(MOUNT_POINT_STATUS, "Mount point availability status (1=mounted, 0=not mounted)");
    describe_gauge!(SCRAPE_DURATION, Unit::Seconds, "Time spent scraping mount point status");
    describe_gauge!(UP, "Whether the mount exporter is healthy (1=healthy, 0=unhealthy)");
    describe_counter!(SCRAPE_SUCCESS, "Total number of successful scrapes");
    describe_gauge!(TOTAL_SCRAPE_DURATION, Unit::Seconds, "Total time spent scraping all mount points");
    describe_counter!(PROBE_CALLS, "Total mount point checks");
    describe_counter!(PROBE_SUCCESSES, "Checks that finished without an error");
    describe_counter!(PROBE_FAILURES, "Checks that finished with an error");
    describe_counter!(PROBE_ATTEMPTS, "Command invocations, retries included");
    describe_gauge!(PROBE_SUCCESS_RATE, "Successful checks divided by total checks");
    describe_gauge!(PROBE_RETRY_RATE, "Command invocations divided by total checks");
    describe_gauge!(BREAKER_STATE, "Circuit breaker state (0=closed, 1=half-open, 2=open)");
    describe_gauge!(BREAKER_FAILURES, "Consecutive failures counted by the circuit breaker");
    describe_counter!(BREAKER_TRIPS, "Times the circuit breaker opened");
}

fn record_snapshot(snapshot: &CollectionSnapshot) {
    for result in &snapshot.results {
        let error = match (&result.error, result.status) {
            (Some(e), _) => e.to_string(),
            (None, MountStatus::Unknown) => "unknown status".to_string(),
            (None, _) => String::new(),
        };
        let info = result.info.clone().unwrap_or_default();

        gauge!(
            MOUNT_POINT_STATUS,
            "mount_point" => result.target.clone(),
            "target" => info.target,
            "fs_type" => info.fs_type,
            "source" => info.source,
            "error" => error,
        )
        .set(result.status_value());
        gauge!(SCRAPE_DURATION, "mount_point" => result.target.clone()).set(result.elapsed.as_secs_f64());
    }

    gauge!(UP).set(if snapshot.healthy { 1.0 } else { 0.0 });
    gauge!(TOTAL_SCRAPE_DURATION).set(snapshot.elapsed.as_secs_f64());
}

fn record_stats(stats: &ProbeStatsSnapshot) {
    counter!(PROBE_CALLS).absolute(stats.total_calls);
    counter!(PROBE_SUCCESSES).absolute(stats.successful_calls);
    counter!(PROBE_FAILURES).absolute(stats.failed_calls);
    counter!(PROBE_ATTEMPTS).absolute(stats.retry_attempts);
    counter!(BREAKER_TRIPS).absolute(stats.circuit_breaker_trips);
    gauge!(PROBE_SUCCESS_RATE).set(stats.success_rate);
    gauge!(PROBE_RETRY_RATE).set(stats.retry_rate);
    gauge!(BREAKER_STATE).set(stats.circuit_breaker_state.as_gauge());
    gauge!(BREAKER_FAILURES).set(f64::from(stats.circuit_breaker_failures));
}
