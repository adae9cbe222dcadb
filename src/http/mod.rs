//! HTTP exposition subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: trace, timeout, security headers)
//!     → handlers.rs
//!         metrics path → one collection cycle → Prometheus text
//!         /health, /healthz → command availability
//!         / → index
//!
//! Config update (reload.rs):
//!     validated ExporterConfig → fresh Collector → atomic swap
//! ```
//!
//! # Design Decisions
//! - Every scrape runs a full cycle; there is no background polling
//! - The collector is swapped whole, so a scrape sees one consistent config
//! - Scrapes observe the shutdown token and stop probing when it fires

pub mod handlers;
pub mod reload;
pub mod server;

pub use handlers::AppState;
pub use reload::{apply_reloads, ReloadError};
pub use server::HttpServer;
