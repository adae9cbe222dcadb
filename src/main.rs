//! mount-exporter binary.
//!
//! Loads configuration, serves metrics over HTTP and reloads the
//! configuration file when it changes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use mount_exporter::config::{discover_config_path, read_config, validate_config, ConfigError, ConfigWatcher};
use mount_exporter::http::apply_reloads;
use mount_exporter::lifecycle::{spawn_supervised, wait_for_signal};
use mount_exporter::observability::init_logging;
use mount_exporter::probe::FindmntRunner;
use mount_exporter::{Collector, ExporterConfig, HttpServer, Shutdown};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prometheus exporter reporting whether mount points are mounted.
#[derive(Debug, Parser)]
#[command(name = "mount-exporter", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (debug, info, warn, error, fatal); overrides the config file.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn build_collector(config: &ExporterConfig) -> Collector {
    Collector::from_config(config, Arc::new(FindmntRunner::new(config.probe.command.clone())))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = discover_config_path(cli.config.as_deref());
    let mut config = read_config(config_path.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("failed to initialise logging: {e}");
    }

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(field = error.field, error = %error.message, "Invalid configuration");
        }
        return Err(ConfigError::Validation(errors).into());
    }

    tracing::info!(
        version = VERSION,
        config = ?config_path,
        address = %config.address(),
        path = %config.server.path,
        mount_points = config.mount_points.len(),
        mode = %config.collection.mode,
        "mount-exporter starting"
    );

    let collector = build_collector(&config);
    if collector.is_command_available() {
        match collector.executor().version().await {
            Ok(version) => tracing::info!(command = %config.probe.command, version = %version, "Probe command found"),
            Err(e) => tracing::warn!(command = %config.probe.command, error = %e, "Could not read probe command version"),
        }
    } else {
        tracing::warn!(command = %config.probe.command, "Probe command not found, health checks will fail");
    }

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, collector, VERSION, shutdown.clone());

    // Dropped after the server stops, ending file notifications.
    let _watcher = match config_path.as_deref() {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            match watcher.run() {
                Ok(watcher) => {
                    spawn_supervised(
                        "config-reload",
                        apply_reloads(updates, server.collector(), config.clone(), shutdown.clone(), build_collector),
                    );
                    Some(watcher)
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Config hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let listener = TcpListener::bind(config.address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
