//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::schema::ExporterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Locations searched when no config path is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["config.toml", "/etc/mount-exporter/config.toml"];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("invalid value in {var}: {value}")]
    Env { var: &'static str, value: String },
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Read a config file and apply environment overrides, without validating.
///
/// `None` or a missing file yields the defaults.
pub fn read_config(path: Option<&Path>) -> Result<ExporterConfig, ConfigError> {
    let mut config = match path {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                ExporterConfig::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        },
        None => ExporterConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    Ok(config)
}

/// Load, override and validate configuration.
pub fn load_config(path: Option<&Path>) -> Result<ExporterConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `MOUNT_EXPORTER_*` overrides; empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut ExporterConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|value| !value.is_empty());

    if let Some(host) = get("MOUNT_EXPORTER_HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("MOUNT_EXPORTER_PORT") {
        config.server.port = port.parse().map_err(|_| ConfigError::Env {
            var: "MOUNT_EXPORTER_PORT",
            value: port.clone(),
        })?;
    }
    if let Some(path) = get("MOUNT_EXPORTER_PATH") {
        config.server.path = path;
    }
    if let Some(timeout) = get("MOUNT_EXPORTER_TIMEOUT") {
        config.probe.timeout_ms = timeout.parse().map_err(|_| ConfigError::Env {
            var: "MOUNT_EXPORTER_TIMEOUT",
            value: timeout.clone(),
        })?;
    }
    if let Some(level) = get("MOUNT_EXPORTER_LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(())
}

/// Pick the config file: the explicit path if given, else the first default
/// location that exists.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ExporterConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("MOUNT_EXPORTER_HOST", "127.0.0.1"),
                ("MOUNT_EXPORTER_PORT", "9100"),
                ("MOUNT_EXPORTER_PATH", "/probe"),
                ("MOUNT_EXPORTER_TIMEOUT", "750"),
                ("MOUNT_EXPORTER_LOG_LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.address(), "127.0.0.1:9100");
        assert_eq!(config.server.path, "/probe");
        assert_eq!(config.probe.timeout_ms, 750);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_override_ignored() {
        let mut config = ExporterConfig::default();
        apply_env_overrides(&mut config, env(&[("MOUNT_EXPORTER_HOST", "")])).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = ExporterConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("MOUNT_EXPORTER_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "MOUNT_EXPORTER_PORT", .. }));
        assert_eq!(err.to_string(), "invalid value in MOUNT_EXPORTER_PORT: http");
    }

    #[test]
    fn test_validation_error_lists_all() {
        let err = ConfigError::Validation(vec![
            ValidationError {
                field: "server.port",
                message: "bad".into(),
            },
            ValidationError {
                field: "logging.level",
                message: "worse".into(),
            },
        ]);
        assert_eq!(err.to_string(), "validation failed: server.port: bad, logging.level: worse");
    }

    #[test]
    fn test_explicit_path_wins_discovery() {
        let explicit = Path::new("/tmp/custom.toml");
        assert_eq!(discover_config_path(Some(explicit)), Some(explicit.to_path_buf()));
    }
}
