//! Mount point probing subsystem.
//!
//! # Data Flow
//! ```text
//! check(target):
//!     → breaker rejects? → Unknown + CircuitOpen (no command run)
//!     → circuit breaker admits
//!         → retry policy
//!             → invoke_once: command.rs under a deadline
//!             → parse.rs classifies the output
//!     → ProbeResult (types.rs), counted in stats.rs
//!
//! check_many(targets):
//!     one task per target → results placed by index
//! ```
//!
//! # Design Decisions
//! - `check` never fails; every error ends up inside the `ProbeResult`
//! - "Target not found" is a successful `NotMounted` probe, not a failure
//! - The command runner is a trait so the executor can be tested without `findmnt`

pub mod command;
pub mod error;
pub mod executor;
pub mod parse;
pub mod stats;
pub mod types;

pub use command::{CommandOutput, CommandRunner, FindmntRunner};
pub use error::ProbeError;
pub use executor::{ProbeExecutor, ProbeSettings};
pub use stats::{ProbeStats, ProbeStatsSnapshot};
pub use types::{MountInfo, MountStatus, ProbeResult};
