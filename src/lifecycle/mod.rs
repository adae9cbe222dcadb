//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → cancel token → server stops accepting
//!     → in-flight collections cancelled → watcher dropped → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Background units (supervisor.rs):
//!     spawned task returns Err → logged, never escalated
//! ```
//!
//! # Design Decisions
//! - One cancellation token is the single shutdown source
//! - Background failures are values, not panics
//! - Resources are released by dropping their owners in order

pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use supervisor::spawn_supervised;
