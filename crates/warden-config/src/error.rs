//! Configuration error types.

use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, validating or watching configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// A configuration file that was asked for does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A configuration file exists but could not be read.
    #[error("failed to read configuration file: {path}")]
    Read {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Text did not deserialize into [`WardenConfig`](crate::WardenConfig),
    /// including unknown fields.
    #[error("failed to parse {origin}: {reason}")]
    Parse {
        /// File path or `<string>`.
        origin: String,
        /// Deserializer message, with line and column when known.
        reason: String,
    },

    /// Only TOML and JSON are understood.
    #[error("unsupported configuration format for {origin}: expected toml or json")]
    UnsupportedFormat {
        /// File path or the format name that was passed.
        origin: String,
    },

    /// A value is present but unusable.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A value required by another setting is absent.
    #[error("missing required configuration field: {field}")]
    MissingField {
        /// Dotted path of the field.
        field: String,
    },

    /// Two individually valid settings cannot be combined.
    #[error("conflicting configuration: {0}")]
    Conflict(String),

    /// An override variable could not be parsed.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParse {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// A `.env` file exists but is malformed.
    #[error("failed to load .env file: {0}")]
    Dotenv(String),

    /// The file watcher could not be set up.
    #[error("file watcher error: {message}")]
    Watcher {
        /// What went wrong.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error from any deserializer error.
    pub fn parse(origin: impl Into<String>, reason: impl Display) -> Self {
        Self::Parse {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(origin: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            origin: origin.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParse {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Creates a watcher error.
    pub fn watcher(message: impl Into<String>) -> Self {
        Self::Watcher {
            message: message.into(),
        }
    }

    /// The dotted field path this error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } | Self::MissingField { field } => Some(field),
            _ => None,
        }
    }
}
