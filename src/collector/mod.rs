//! Collection subsystem.
//!
//! # Data Flow
//! ```text
//! Scrape request
//!     → aggregator.rs: one probe per configured target
//!         serial:     targets checked one after another
//!         concurrent: ProbeExecutor::check_many
//!     → snapshot.rs: ordered results + overall health + elapsed
//!     → metrics exporter
//! ```
//!
//! # Design Decisions
//! - A snapshot supersedes the previous one; nothing is merged across cycles
//! - One target's failure never aborts the others
//! - The cycle deadline cancels outstanding probes instead of discarding results

pub mod aggregator;
pub mod snapshot;

pub use aggregator::{CollectionMode, Collector};
pub use snapshot::CollectionSnapshot;
