//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Probe of one mount point:
//!     → circuit_breaker.rs (reject fast while open, admit one trial when half-open)
//!     → retries.rs (re-run transient failures, waiting backoff.rs delays)
//!     → timeouts.rs (bound each attempt, abort on cancellation)
//! ```
//!
//! # Design Decisions
//! - Every external command runs under a deadline
//! - Only transient failures are retried
//! - One breaker guards the whole probe surface, shared across targets
//! - Waits observe cancellation so shutdown is never delayed by a backoff

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;
