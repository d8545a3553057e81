//! Observability for Warden.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output and
//!   `RUST_LOG`-style filtering
//! - **Metrics**: decision and reload metrics via the `metrics` crate,
//!   optionally exported in Prometheus format
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `warden_decisions_total` | Counter | `allowed`, `matched` |
//! | `warden_reloads_total` | Counter | `outcome` |
//! | `warden_reload_duration_seconds` | Histogram | - |
//! | `warden_rule_table_size` | Gauge | - |
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::builder()
//!         .log_filter("info")
//!         .log_decisions(true)
//!         .metrics_addr("0.0.0.0:9090")
//!         .build();
//!
//!     init_telemetry(&config).expect("telemetry");
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat, DECISION_DIRECTIVE};
pub use metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
