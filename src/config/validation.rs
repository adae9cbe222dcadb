//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, jitter in range)
//! - Check every mount point is an absolute path
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ExporterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ExporterConfig;

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "fatal"];
pub const LOG_FORMATS: &[&str] = &["json", "text"];

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ExporterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be between 1 and 65535, got 0"));
    }
    if config.server.path.is_empty() {
        errors.push(ValidationError::new("server.path", "cannot be empty"));
    } else if !config.server.path.starts_with('/') {
        errors.push(ValidationError::new(
            "server.path",
            format!("must start with '/', got {}", config.server.path),
        ));
    } else if let Some(reason) = route_conflict(&config.server.path) {
        errors.push(ValidationError::new(
            "server.path",
            format!("{reason}, got {}", config.server.path),
        ));
    }

    if config.probe.command.trim().is_empty() {
        errors.push(ValidationError::new("probe.command", "cannot be empty"));
    }
    if config.probe.timeout_ms == 0 {
        errors.push(ValidationError::new("probe.timeout_ms", "must be positive"));
    }

    if config.mount_points.is_empty() {
        errors.push(ValidationError::new("mount_points", "at least one mount point must be configured"));
    }
    for mount_point in &config.mount_points {
        if mount_point.is_empty() {
            errors.push(ValidationError::new("mount_points", "mount point cannot be empty"));
        } else if !mount_point.starts_with('/') {
            errors.push(ValidationError::new(
                "mount_points",
                format!("mount point must be absolute path, got {mount_point}"),
            ));
        }
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
    }
    if retry.max_delay_ms < retry.initial_delay_ms {
        errors.push(ValidationError::new(
            "retry.max_delay_ms",
            format!("must not be below initial_delay_ms ({})", retry.initial_delay_ms),
        ));
    }
    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        errors.push(ValidationError::new(
            "retry.multiplier",
            format!("must be at least 1.0, got {}", retry.multiplier),
        ));
    }
    if !(0.0..=1.0).contains(&retry.jitter) {
        errors.push(ValidationError::new(
            "retry.jitter",
            format!("must be between 0 and 1, got {}", retry.jitter),
        ));
    }

    if config.circuit_breaker.max_failures == 0 {
        errors.push(ValidationError::new("circuit_breaker.max_failures", "must be at least 1"));
    }
    if config.collection.timeout_secs == 0 {
        errors.push(ValidationError::new("collection.timeout_secs", "must be positive"));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ValidationError::new(
            "logging.level",
            format!("invalid log level {}, must be one of: {}", config.logging.level, LOG_LEVELS.join(", ")),
        ));
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ValidationError::new(
            "logging.format",
            format!("invalid log format {}, must be one of: {}", config.logging.format, LOG_FORMATS.join(", ")),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Why the router would refuse `path` as a literal route, if it would.
fn route_conflict(path: &str) -> Option<&'static str> {
    if path.contains(['{', '}']) {
        return Some("must not contain '{' or '}'");
    }
    if path.split('/').any(|segment| segment.starts_with([':', '*'])) {
        return Some("segments must not start with ':' or '*'");
    }
    None
}
