//! Prometheus metrics for Warden.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `warden_decisions_total` | Counter | `allowed`, `matched` | Authorization decisions |
//! | `warden_reloads_total` | Counter | `outcome` | Rule table reload attempts |
//! | `warden_reload_duration_seconds` | Histogram | - | Fetch + compile + publish time |
//! | `warden_rule_table_size` | Gauge | - | Rules in the active table |
//!
//! Recording functions are no-ops until a recorder is installed, so the
//! engine can call them unconditionally.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Decision counter name.
pub const DECISIONS_TOTAL: &str = "warden_decisions_total";
/// Reload counter name.
pub const RELOADS_TOTAL: &str = "warden_reloads_total";
/// Reload duration histogram name.
pub const RELOAD_DURATION_SECONDS: &str = "warden_reload_duration_seconds";
/// Active table size gauge name.
pub const RULE_TABLE_SIZE: &str = "warden_rule_table_size";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Histogram buckets for reload duration, in seconds.
    pub reload_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            // 5ms .. 30s; reloads include a network or disk fetch
            reload_buckets: vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        }
    }
}

/// Installs the Prometheus recorder and spawns its HTTP listener.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` if `addr` does not parse, or
/// `TelemetryError::Exporter` if the exporter cannot be built or a
/// global recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::invalid_address(&config.addr, e))?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(RELOAD_DURATION_SECONDS.to_string()),
            &config.reload_buckets,
        )
        .map_err(TelemetryError::exporter)?
        .build()
        .map_err(TelemetryError::exporter)?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(TelemetryError::exporter)?;

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::warn!(error = ?e, "metrics exporter stopped");
        }
    });

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    tracing::info!(addr = %addr, "prometheus exporter listening");
    Ok(())
}

/// Returns the global metrics handle if initialized.
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(DECISIONS_TOTAL, "Authorization decisions by outcome");
    describe_counter!(RELOADS_TOTAL, "Rule table reload attempts by outcome");
    describe_histogram!(
        RELOAD_DURATION_SECONDS,
        "Time to fetch, compile and publish a rule table"
    );
    describe_gauge!(RULE_TABLE_SIZE, "Number of rules in the active table");
}

/// Records one authorization decision.
///
/// `matched` is false when no rule matched and the default applied.
pub fn record_decision(allowed: bool, matched: bool) {
    counter!(
        DECISIONS_TOTAL,
        "allowed" => allowed.to_string(),
        "matched" => matched.to_string()
    )
    .increment(1);
}

/// Records a reload attempt.
///
/// # Arguments
///
/// * `outcome` - `"success"`, `"invalid"` or `"unavailable"`
/// * `duration` - Wall time of the attempt
pub fn record_reload(outcome: &'static str, duration: Duration) {
    counter!(RELOADS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(RELOAD_DURATION_SECONDS).record(duration.as_secs_f64());
}

/// Sets the active table size gauge.
pub fn set_rule_table_size(rules: usize) {
    gauge!(RULE_TABLE_SIZE).set(rules as f64);
}
