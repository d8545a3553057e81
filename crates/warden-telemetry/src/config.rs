//! Telemetry configuration.

use crate::logging::{LogConfig, LogFormat};
use crate::metrics::MetricsConfig;

/// Logging plus metrics settings, installed together by
/// [`init_telemetry`](crate::init_telemetry).
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    /// Installs nothing. Useful for tests and embedders that own the
    /// global subscriber.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            logging: LogConfig {
                enabled: false,
                ..LogConfig::default()
            },
            metrics: MetricsConfig::default(),
        }
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Replaces the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Sets the base log filter directive.
    #[must_use]
    pub fn log_filter(mut self, directive: impl Into<String>) -> Self {
        self.config.logging.filter = directive.into();
        self
    }

    /// Sets the output encoding.
    #[must_use]
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Logs every decision.
    #[must_use]
    pub fn log_decisions(mut self, enabled: bool) -> Self {
        self.config.logging.decisions = enabled;
        self
    }

    /// Replaces the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Serves Prometheus metrics on `addr`.
    #[must_use]
    pub fn metrics_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.metrics.enabled = true;
        self.config.metrics.addr = addr.into();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        self.config
    }
}
