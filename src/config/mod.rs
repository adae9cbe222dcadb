//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read, parse, environment overrides)
//!     → validation.rs (semantic checks, every error reported)
//!     → ExporterConfig (validated, immutable)
//!     → passed by value into the collector and server
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads + validates new config
//!     → server builds a fresh collector and swaps it in
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - An invalid reload is logged and the running config is kept

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{discover_config_path, load_config, read_config, ConfigError};
pub use schema::{
    BreakerConfig, CollectionConfig, ExporterConfig, LoggingConfig, ProbeConfig, RetryConfig, ServerConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
