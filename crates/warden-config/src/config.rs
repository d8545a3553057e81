//! Main configuration types.
//!
//! This module provides the top-level [`WardenConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, EngineSection, LogFormat, ReloadSection, SourceKind, SourceSection,
    TelemetrySection,
};

/// Complete Warden configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use warden_config::{SourceKind, WardenConfig};
///
/// let config = WardenConfig::default();
/// assert_eq!(config.engine.role_prefix, "ROLE");
/// assert_eq!(config.source.kind, SourceKind::File);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineSection,

    /// Rule source.
    #[serde(default)]
    pub source: SourceSection,

    /// Hot reload.
    #[serde(default)]
    pub reload: ReloadSection,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl WardenConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> WardenConfigBuilder {
        WardenConfigBuilder::new()
    }

    /// Validate cross-field constraints.
    ///
    /// Syntax of the role hierarchy and of inline rules is checked when the
    /// engine is built, not here.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `engine.role_prefix` is empty
    /// - `engine.fetch_timeout_ms` is zero
    /// - a `file` source has no `path`, or an `http` source has no `url`
    /// - metrics are enabled with an unparsable address
    /// - `reload.watch` is set for a source other than `file`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.role_prefix.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "engine.role_prefix",
                "must not be empty",
            ));
        }

        if self.engine.key_separator.is_empty() {
            return Err(ConfigError::invalid_value(
                "engine.key_separator",
                "must not be empty",
            ));
        }

        if self.engine.fetch_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "engine.fetch_timeout_ms",
                "must be greater than zero",
            ));
        }

        match self.source.kind {
            SourceKind::File if is_blank(self.source.path.as_deref()) => {
                return Err(ConfigError::missing_field("source.path"));
            }
            SourceKind::Http if is_blank(self.source.url.as_deref()) => {
                return Err(ConfigError::missing_field("source.url"));
            }
            _ => {}
        }

        if self.telemetry.metrics.enabled
            && self
                .telemetry
                .metrics
                .addr
                .parse::<std::net::SocketAddr>()
                .is_err()
        {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", self.telemetry.metrics.addr),
            ));
        }

        if self.reload.watch && self.source.kind != SourceKind::File {
            return Err(ConfigError::conflict(format!(
                "reload.watch requires a 'file' source, got '{}'",
                self.source.kind.as_str()
            )));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, watched rule file, and an
    /// empty table if the source is missing at startup.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::WardenConfig;
    ///
    /// let config = WardenConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// assert!(config.reload.watch);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.logging.decisions = true;

        config.engine.fetch_timeout_ms = 30_000;
        config.engine.empty_table_on_startup_failure = true;

        config.source.path = Some("rules.toml".to_string());
        config.reload.watch = true;

        config
    }

    /// Production preset: JSON logs, metrics on, startup source failures
    /// are fatal.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::{LogFormat, WardenConfig};
    ///
    /// let config = WardenConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// assert!(config.telemetry.metrics.enabled);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.metrics.enabled = true;

        config.engine.empty_table_on_startup_failure = false;

        config
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Builder for [`WardenConfig`].
#[derive(Debug, Default)]
pub struct WardenConfigBuilder {
    engine: Option<EngineSection>,
    source: Option<SourceSection>,
    reload: Option<ReloadSection>,
    telemetry: Option<TelemetrySection>,
}

impl WardenConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine section.
    #[must_use]
    pub fn engine(mut self, engine: EngineSection) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the source section.
    #[must_use]
    pub fn source(mut self, source: SourceSection) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the reload section.
    #[must_use]
    pub fn reload(mut self, reload: ReloadSection) -> Self {
        self.reload = Some(reload);
        self
    }

    /// Set the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> WardenConfig {
        WardenConfig {
            engine: self.engine.unwrap_or_default(),
            source: self.source.unwrap_or_default(),
            reload: self.reload.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<WardenConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
