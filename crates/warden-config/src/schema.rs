//! Configuration schema types.
//!
//! Every section rejects unknown fields and fills absent ones from
//! defaults, so a file only needs the settings it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_authz::{EngineConfig, RuleRecord};
use warden_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

/// Engine settings.
///
/// # Example
///
/// ```
/// use warden_config::EngineSection;
///
/// let section: EngineSection = toml::from_str(r#"
///     fetch_timeout_ms = 1500
///     role_hierarchy = "ROLE_ADMIN > ROLE_USER"
/// "#).unwrap();
///
/// let engine = section.to_engine_config();
/// assert_eq!(engine.fetch_timeout.as_millis(), 1500);
/// assert_eq!(engine.role_prefix, "ROLE");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Prefix that marks a requirement as a plain authority.
    #[serde(default = "default_role_prefix")]
    pub role_prefix: String,

    /// Separator between discriminator and pattern in a match key.
    #[serde(default = "default_key_separator")]
    pub key_separator: String,

    /// Upper bound on one rule-source fetch.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Start with an empty table when the source is down at startup.
    #[serde(default)]
    pub empty_table_on_startup_failure: bool,

    /// Role chains, one per line (`ROLE_A > ROLE_B`).
    #[serde(default)]
    pub role_hierarchy: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            role_prefix: default_role_prefix(),
            key_separator: default_key_separator(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            empty_table_on_startup_failure: false,
            role_hierarchy: String::new(),
        }
    }
}

impl EngineSection {
    /// The engine configuration these settings describe.
    #[must_use]
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_role_prefix(self.role_prefix.clone())
            .with_key_separator(self.key_separator.clone())
            .with_fetch_timeout(Duration::from_millis(self.fetch_timeout_ms))
            .with_empty_table_on_startup_failure(self.empty_table_on_startup_failure)
    }
}

fn default_role_prefix() -> String {
    warden_authz::config::DEFAULT_ROLE_PREFIX.to_string()
}

fn default_key_separator() -> String {
    warden_authz::config::DEFAULT_KEY_SEPARATOR.to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

/// Where rules come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A TOML or JSON rule document on disk.
    #[default]
    File,
    /// A JSON rule document served over HTTP.
    Http,
    /// Rules listed in this configuration.
    Inline,
}

impl SourceKind {
    /// The name used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Http => "http",
            Self::Inline => "inline",
        }
    }
}

/// Rule source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    /// Source kind.
    #[serde(default)]
    pub kind: SourceKind,

    /// Rule document path (`file`).
    #[serde(default)]
    pub path: Option<String>,

    /// Rule document URL (`http`).
    #[serde(default)]
    pub url: Option<String>,

    /// Rules (`inline`).
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
}

/// Hot-reload settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReloadSection {
    /// Reload when the rule file changes.
    #[serde(default)]
    pub watch: bool,

    /// Quiet period before a burst of changes triggers one reload.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ReloadSection {
    fn default() -> Self {
        Self {
            watch: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl ReloadSection {
    /// The debounce period.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_debounce_ms() -> u64 {
    500
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or filter directive (`info`, `warden_authz=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Log every authorization decision at `debug`.
    #[serde(default)]
    pub decisions: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
            decisions: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Serve Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,

    /// Listener address for the exporter.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Telemetry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Logging.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl TelemetrySection {
    /// The telemetry configuration these settings describe.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let logging = LogConfig {
            enabled: self.logging.enabled,
            filter: self.logging.level.clone(),
            format: match self.logging.format {
                LogFormat::Json => warden_telemetry::LogFormat::Json,
                LogFormat::Pretty => warden_telemetry::LogFormat::Pretty,
            },
            decisions: self.logging.decisions,
            with_location: self.logging.include_location,
        };
        let metrics = MetricsConfig {
            enabled: self.metrics.enabled,
            addr: self.metrics.addr.clone(),
            ..MetricsConfig::default()
        };

        TelemetryConfig::builder()
            .logging(logging)
            .metrics(metrics)
            .build()
    }
}

fn default_true() -> bool {
    true
}
