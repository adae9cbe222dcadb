//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Each scrape:
//!     CollectionSnapshot + probe statistics
//!     → metrics.rs (Prometheus text exposition)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing, text for development
//! - No global metrics recorder; the exporter owns its recorders
//! - Per-target gauges are rebuilt every cycle so removed targets vanish

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::MetricsExporter;
