//! Prometheus exporter for mount point status.
//!
//! # Architecture Overview
//!
//! ```text
//!     Scrape ──▶ http ──▶ collector ──▶ probe executor ──▶ findmnt
//!                  │           │              │
//!                  │           │              ├─ resilience::circuit_breaker
//!                  │           │              ├─ resilience::retries + backoff
//!                  │           │              └─ resilience::timeouts
//!                  │           ▼
//!                  └──── observability::metrics ──▶ Prometheus text
//!
//!     config (TOML + env) ──▶ watcher ──▶ collector swap
//!     lifecycle: shutdown token, signals, supervised tasks
//! ```

pub mod collector;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod resilience;

pub use collector::{CollectionSnapshot, Collector};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
