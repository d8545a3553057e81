//! Typed configuration for Warden.
//!
//! This crate provides:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//! - A debounced file watcher used to hot-reload rule files
//!
//! # Example
//!
//! ```no_run
//! use warden_config::ConfigLoader;
//!
//! # fn main() -> Result<(), warden_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("warden.toml")?
//!     .with_env_prefix("WARDEN")
//!     .load()?;
//!
//! let engine_config = config.engine.to_engine_config();
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [engine]
//! role_prefix = "ROLE"
//! key_separator = "|"
//! fetch_timeout_ms = 5000
//! empty_table_on_startup_failure = false
//! role_hierarchy = """
//! ROLE_ADMIN > ROLE_MANAGER
//! ROLE_MANAGER > ROLE_USER
//! """
//!
//! [source]
//! kind = "file"          # "file" | "http" | "inline"
//! path = "rules.toml"
//!
//! [reload]
//! watch = true
//! debounce_ms = 500
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = false
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY`, for example:
//!
//! - `WARDEN__ENGINE__FETCH_TIMEOUT_MS=2000`
//! - `WARDEN__ENGINE__ROLE_HIERARCHY="ROLE_ADMIN > ROLE_USER;ROLE_USER > ROLE_GUEST"`
//! - `WARDEN__TELEMETRY__METRICS__ENABLED=true`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;
mod watcher;

pub use config::{WardenConfig, WardenConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    EngineSection, LogFormat, LoggingSection, MetricsSection, ReloadSection, SourceKind,
    SourceSection, TelemetrySection,
};
pub use watcher::{
    FileChangeEvent, FileChangeKind, FileWatcher, FileWatcherBuilder, FileWatcherConfig,
};
