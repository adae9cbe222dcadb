//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the exporter.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::CollectionMode;
use crate::probe::ProbeSettings;
use crate::resilience::backoff::{Backoff, BackoffStrategy};
use crate::resilience::circuit_breaker::CircuitBreakerConfig;

/// Root configuration for the exporter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ExporterConfig {
    /// Absolute paths whose mount status is reported.
    pub mount_points: Vec<String>,

    /// HTTP listener and metrics path.
    pub server: ServerConfig,

    /// External command settings.
    pub probe: ProbeConfig,

    /// Retry policy for failed probe attempts.
    pub retry: RetryConfig,

    /// Circuit breaker guarding the command.
    pub circuit_breaker: BreakerConfig,

    /// Per-cycle aggregation settings.
    pub collection: CollectionConfig,

    pub logging: LoggingConfig,
}

impl ExporterConfig {
    /// Listener address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Executor tunables derived from the probe, retry and breaker sections.
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            timeout: Duration::from_millis(self.probe.timeout_ms),
            max_attempts: self.retry.max_attempts,
            backoff: Backoff {
                strategy: self.retry.strategy,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
                multiplier: self.retry.multiplier,
                jitter: self.retry.jitter,
            },
            breaker: CircuitBreakerConfig {
                name: format!("{}-circuit-breaker", self.probe.command),
                max_failures: self.circuit_breaker.max_failures,
                reset_timeout: Duration::from_secs(self.circuit_breaker.reset_timeout_secs),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the metrics are served on; must start with `/`.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Program name or path of the mount inspection command.
    pub command: String,
    /// Deadline for one invocation, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: "findmnt".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub strategy: BackoffStrategy,
    /// Fraction of each delay added as random jitter.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            multiplier: 2.0,
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub max_failures: u32,
    pub reset_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub mode: CollectionMode,
    /// Deadline for a whole collection cycle.
    pub timeout_secs: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            mode: CollectionMode::Serial,
            timeout_secs: 30,
        }
    }
}

impl CollectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `debug`, `info`, `warn`, `error`, `fatal`.
    pub level: String,
    /// `json` or `text`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}
