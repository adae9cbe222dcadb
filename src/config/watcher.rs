//! Configuration file watcher for hot reload.
//!
//! Publishes the latest valid configuration on a `watch` channel. Rewrites
//! that leave the parsed config unchanged, and files that fail to load, do
//! not wake receivers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;

use crate::config::loader::load_config;
use crate::config::schema::ExporterConfig;

/// Polling interval for backends without native notifications.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Watches one config file and publishes each accepted revision.
pub struct ConfigWatcher {
    path: PathBuf,
    latest: watch::Sender<ExporterConfig>,
}

impl ConfigWatcher {
    /// Watch `path`, starting from the already loaded `current` config.
    pub fn new(path: &Path, current: ExporterConfig) -> (Self, watch::Receiver<ExporterConfig>) {
        let (latest, updates) = watch::channel(current);
        let watcher = Self {
            path: path.to_path_buf(),
            latest,
        };
        (watcher, updates)
    }

    /// Start watching. Notifications stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, latest } = self;
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches_content(&event.kind) => publish(&reload_path, &latest),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn touches_content(kind: &EventKind) -> bool {
    kind.is_modify() || kind.is_create()
}

/// Reload `path` and publish it if it differs from the current revision.
fn publish(path: &Path, latest: &watch::Sender<ExporterConfig>) {
    let config = match load_config(Some(path)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Config reload rejected, keeping current configuration");
            return;
        }
    };

    let changed = latest.send_if_modified(|current| {
        if *current == config {
            return false;
        }
        *current = config;
        true
    });
    if changed {
        tracing::info!(path = %path.display(), "Config file changed, publishing update");
    } else {
        tracing::debug!(path = %path.display(), "Config file rewritten without changes");
    }
}
