//! Configuration for the authorization engine.

use std::time::Duration;

/// Default role prefix.
pub const DEFAULT_ROLE_PREFIX: &str = "ROLE";

/// Default separator between a rule key's discriminator and its pattern.
pub const DEFAULT_KEY_SEPARATOR: &str = "|";

/// Configuration for [`AuthorizationEngine`](crate::AuthorizationEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Requirements starting with this prefix are authority requirements;
    /// everything else is an expression.
    pub role_prefix: String,
    /// Separator in raw match keys; only the text after it is the pattern.
    pub key_separator: String,
    /// Upper bound on one rule source fetch.
    pub fetch_timeout: Duration,
    /// Start with an empty table instead of failing when the source is
    /// unavailable at startup.
    pub empty_table_on_startup_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            role_prefix: DEFAULT_ROLE_PREFIX.to_string(),
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
            fetch_timeout: Duration::from_secs(5),
            empty_table_on_startup_failure: false,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role prefix.
    pub fn with_role_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.role_prefix = prefix.into();
        self
    }

    /// Set the match key separator.
    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Start with an empty table when the source is down at startup.
    pub fn with_empty_table_on_startup_failure(mut self, enabled: bool) -> Self {
        self.empty_table_on_startup_failure = enabled;
        self
    }

    /// Create a production configuration.
    ///
    /// Startup fails if rules cannot be loaded: with default-allow, an
    /// empty table would permit every request.
    pub fn production() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            empty_table_on_startup_failure: false,
            ..Self::default()
        }
    }

    /// Create a development configuration.
    pub fn development() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            empty_table_on_startup_failure: true,
            ..Self::default()
        }
    }
}
