//! Structured logging for Warden.
//!
//! Reloads are logged at `info`, failed reloads at `warn`, and each
//! decision at `debug` under the `warden_authz::engine` target. Per-decision
//! output is off unless [`LogConfig::decisions`] is set or the filter asks
//! for it, so production can run at `info` without per-request noise.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_telemetry::logging::{LogConfig, init_logging};
//!
//! init_logging(&LogConfig::production())?;
//!
//! tracing::info!(generation = 3, rules = 12, "rule table published");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter directive that surfaces per-decision events.
pub const DECISION_DIRECTIVE: &str = "warden_authz::engine=debug";

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Install a subscriber at all.
    pub enabled: bool,

    /// Base filter directive (`info`, `warden_authz=debug,warn`).
    ///
    /// `RUST_LOG` replaces it when set.
    pub filter: String,

    /// Output encoding.
    pub format: LogFormat,

    /// Log every decision regardless of the base filter.
    pub decisions: bool,

    /// Include source file and line.
    pub with_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: "info".to_string(),
            format: LogFormat::Json,
            decisions: false,
            with_location: false,
        }
    }
}

impl LogConfig {
    /// Pretty output with per-decision logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            filter: "debug".to_string(),
            format: LogFormat::Pretty,
            decisions: true,
            with_location: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// The effective filter: `RUST_LOG` if set, else [`filter`](Self::filter),
    /// with [`DECISION_DIRECTIVE`] appended when `decisions` is on.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::InvalidFilter` if the directive does not
    /// parse.
    pub fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        self.directive_filter()
    }

    fn directive_filter(&self) -> TelemetryResult<EnvFilter> {
        let directive = if self.decisions {
            format!("{},{DECISION_DIRECTIVE}", self.filter)
        } else {
            self.filter.clone()
        };
        EnvFilter::try_new(&directive).map_err(|e| TelemetryError::invalid_filter(directive, e))
    }
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for a bad directive, or
/// `TelemetryError::SubscriberInstalled` if a global subscriber is
/// already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = config.env_filter()?;
    let layer = tracing_subscriber::fmt::layer()
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(filter))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(layer.pretty().with_filter(filter))
            .try_init(),
    };

    installed.map_err(|e| TelemetryError::SubscriberInstalled(e.to_string()))
}
