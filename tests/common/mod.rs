//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use mount_exporter::config::ExporterConfig;
use mount_exporter::lifecycle::Shutdown;
use mount_exporter::probe::{CommandOutput, CommandRunner, ProbeExecutor};
use mount_exporter::{Collector, HttpServer};

/// What the fake command does for one target.
#[derive(Clone, Debug)]
#[allow(dead_code)]
pub enum Reply {
    Mounted { fs_type: &'static str, source: &'static str },
    NotFound,
    Fail(&'static str),
    Hang,
}

/// Command runner answering from a per-target table.
pub struct FakeFindmnt {
    replies: Mutex<HashMap<String, Vec<Reply>>>,
    available: bool,
    calls: AtomicU32,
}

#[allow(dead_code)]
impl FakeFindmnt {
    pub fn new() -> Arc<Self> {
        Self::with_availability(true)
    }

    pub fn with_availability(available: bool) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(HashMap::new()),
            available,
            calls: AtomicU32::new(0),
        })
    }

    /// Queue replies for `target`; the last one repeats forever.
    pub fn script(&self, target: &str, replies: Vec<Reply>) {
        self.replies.lock().unwrap().insert(target.to_string(), replies);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self, target: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(target) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) => queue.first().cloned().unwrap_or(Reply::NotFound),
            None => Reply::NotFound,
        }
    }
}

#[async_trait]
impl CommandRunner for FakeFindmnt {
    async fn run(&self, target: &str) -> io::Result<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_reply(target) {
            Reply::Mounted { fs_type, source } => {
                Ok(CommandOutput::success(format!("{target} {fs_type} rw,relatime {source}\n")))
            }
            Reply::NotFound => Ok(CommandOutput::exit(1, "")),
            Reply::Fail(stderr) => Ok(CommandOutput::exit(2, stderr)),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(CommandOutput::success(""))
            }
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn version(&self) -> io::Result<String> {
        Ok("findmnt from util-linux 2.39.3".to_string())
    }
}

/// Config with fast retries, suitable for tests.
#[allow(dead_code)]
pub fn test_config(mount_points: &[&str]) -> ExporterConfig {
    let mut config = ExporterConfig {
        mount_points: mount_points.iter().map(|m| m.to_string()).collect(),
        ..Default::default()
    };
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.probe.timeout_ms = 200;
    config.retry.initial_delay_ms = 5;
    config.retry.max_delay_ms = 20;
    config.retry.jitter = 0.0;
    config.collection.timeout_secs = 5;
    config
}

#[allow(dead_code)]
pub fn collector_for(config: &ExporterConfig, runner: Arc<FakeFindmnt>) -> Collector {
    let executor = ProbeExecutor::new(runner, config.probe_settings());
    Collector::new(
        config.mount_points.clone(),
        executor,
        config.collection.mode,
        config.collection.timeout(),
    )
}

/// Start an exporter on an ephemeral port; returns its address.
#[allow(dead_code)]
pub async fn start_exporter(config: &ExporterConfig, runner: Arc<FakeFindmnt>, shutdown: Shutdown) -> SocketAddr {
    let server = HttpServer::new(config, collector_for(config, runner), "test-version", shutdown);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });
    addr
}
