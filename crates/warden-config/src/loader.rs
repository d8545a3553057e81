//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{ConfigError, LogFormat, SourceKind, WardenConfig};

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "WARDEN";

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables (`PREFIX__SECTION__KEY`)
///
/// # Example
///
/// ```no_run
/// use warden_config::ConfigLoader;
///
/// # fn main() -> Result<(), warden_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_file("warden.toml")?
///     .with_env_prefix("WARDEN")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: WardenConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: WardenConfig::default(),
            env_prefix: None,
        }
    }

    /// Start from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = WardenConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = WardenConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension (`.toml` or `.json`). Sections
    /// absent from the file take their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        debug!(path = %path.display(), "loaded configuration file");

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or
    /// `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::{ConfigLoader, SourceKind};
    ///
    /// let toml = r#"
    ///     [source]
    ///     kind = "http"
    ///     url = "http://policy.internal/rules.json"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.source.kind, SourceKind::Http);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content).map_err(|e| ConfigError::parse("<string>", e))?,
            "json" => {
                serde_json::from_str(content).map_err(|e| ConfigError::parse("<string>", e))?
            }
            _ => return Err(ConfigError::unsupported_format(format)),
        };
        Ok(self)
    }

    /// Apply environment overrides named `PREFIX__SECTION__KEY` on load.
    ///
    /// For example, with prefix `WARDEN`:
    /// - `WARDEN__ENGINE__FETCH_TIMEOUT_MS=2000`
    /// - `WARDEN__SOURCE__KIND=http`
    /// - `WARDEN__TELEMETRY__LOGGING__LEVEL=debug`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file in the working directory, if one
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::Dotenv(e.to_string())),
        }
        Ok(self)
    }

    /// Finalize: apply environment overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or the final
    /// configuration is invalid.
    pub fn load(mut self) -> Result<WardenConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> WardenConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<WardenConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let origin = path.display().to_string();
        match extension.as_deref() {
            Some("toml") => toml::from_str(content).map_err(|e| ConfigError::parse(origin, e)),
            Some("json") => serde_json::from_str(content).map_err(|e| ConfigError::parse(origin, e)),
            _ => Err(ConfigError::unsupported_format(origin)),
        }
    }

    fn apply_env_overrides<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if key.starts_with(&marker) {
                self.apply_env_var(&key, &value, prefix)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["ENGINE", "ROLE_PREFIX"] => config.engine.role_prefix = value.to_string(),
            ["ENGINE", "KEY_SEPARATOR"] => config.engine.key_separator = value.to_string(),
            ["ENGINE", "FETCH_TIMEOUT_MS"] => {
                config.engine.fetch_timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["ENGINE", "EMPTY_TABLE_ON_STARTUP_FAILURE"] => {
                config.engine.empty_table_on_startup_failure = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            // Chains separated by ';' since env values are single-line.
            ["ENGINE", "ROLE_HIERARCHY"] => {
                config.engine.role_hierarchy = value.replace(';', "\n");
            }

            ["SOURCE", "KIND"] => {
                config.source.kind = match value.to_lowercase().as_str() {
                    "file" => SourceKind::File,
                    "http" => SourceKind::Http,
                    "inline" => SourceKind::Inline,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'file', 'http', or 'inline'",
                        ))
                    }
                };
            }
            ["SOURCE", "PATH"] => config.source.path = non_empty(value),
            ["SOURCE", "URL"] => config.source.url = non_empty(value),

            ["RELOAD", "WATCH"] => {
                config.reload.watch = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["RELOAD", "DEBOUNCE_MS"] => {
                config.reload.debounce_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                config.telemetry.logging.include_location = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["TELEMETRY", "LOGGING", "DECISIONS"] => {
                config.telemetry.logging.decisions = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => {
                config.telemetry.metrics.addr = value.to_string();
            }

            _ => debug!(var = key, "ignoring unrecognized configuration override"),
        }

        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
