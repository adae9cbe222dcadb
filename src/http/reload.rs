//! Applying configuration updates.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::collector::Collector;
use crate::config::ExporterConfig;
use crate::lifecycle::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("config update channel closed")]
    ChannelClosed,
}

/// Swap in a collector built by `build` for every config update until shutdown.
///
/// Server settings cannot change without a restart; a changed listener or
/// metrics path is logged and otherwise ignored.
pub async fn apply_reloads<F>(
    mut updates: watch::Receiver<ExporterConfig>,
    collector: Arc<ArcSwap<Collector>>,
    current: ExporterConfig,
    shutdown: Shutdown,
    build: F,
) -> Result<(), ReloadError>
where
    F: Fn(&ExporterConfig) -> Collector,
{
    let mut current = current;
    loop {
        let config = tokio::select! {
            _ = shutdown.wait() => return Ok(()),
            changed = updates.changed() => match changed {
                Ok(()) => updates.borrow_and_update().clone(),
                Err(_) => return Err(ReloadError::ChannelClosed),
            },
        };

        if config == current {
            tracing::debug!("Config unchanged, skipping reload");
            continue;
        }
        if config.server != current.server {
            tracing::warn!("Server settings changed; restart required for them to take effect");
        }

        collector.store(Arc::new(build(&config)));
        tracing::info!(
            mount_points = config.mount_points.len(),
            mode = %config.collection.mode,
            "Configuration reloaded"
        );
        current = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectionMode;
    use crate::probe::{FindmntRunner, ProbeExecutor};
    use std::time::Duration;

    fn build(config: &ExporterConfig) -> Collector {
        Collector::from_config(config, Arc::new(FindmntRunner::default()))
    }

    fn config(mount_points: &[&str]) -> ExporterConfig {
        ExporterConfig {
            mount_points: mount_points.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_update_swaps_collector() {
        let initial = config(&["/data"]);
        let handle = Arc::new(ArcSwap::from_pointee(build(&initial)));
        let (tx, rx) = watch::channel(initial.clone());
        let shutdown = Shutdown::new();

        let task = tokio::spawn(apply_reloads(rx, handle.clone(), initial, shutdown.clone(), build));

        let mut updated = config(&["/data", "/srv"]);
        updated.collection.mode = CollectionMode::Concurrent;
        tx.send(updated).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while handle.load().targets().len() != 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(handle.load().targets(), ["/data", "/srv"]);
        assert_eq!(handle.load().mode(), CollectionMode::Concurrent);

        shutdown.trigger();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_closed_channel_is_an_error() {
        let initial = config(&["/data"]);
        let executor = ProbeExecutor::new(Arc::new(FindmntRunner::default()), initial.probe_settings());
        let collector = Collector::new(initial.mount_points.clone(), executor, CollectionMode::Serial, Duration::from_secs(1));
        let (tx, rx) = watch::channel(initial.clone());
        drop(tx);

        let result = apply_reloads(rx, Arc::new(ArcSwap::from_pointee(collector)), initial, Shutdown::new(), build).await;
        assert!(matches!(result, Err(ReloadError::ChannelClosed)));
    }
}
