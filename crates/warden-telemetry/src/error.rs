//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the global logging and metrics hooks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TelemetryError {
    /// A log filter directive did not parse.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// The directive as configured.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global `tracing` subscriber is already set.
    #[error("log subscriber already installed: {0}")]
    SubscriberInstalled(String),

    /// The metrics listener address did not parse.
    #[error("invalid metrics address `{addr}`: {reason}")]
    InvalidAddress {
        /// The address as configured.
        addr: String,
        /// Parser message.
        reason: String,
    },

    /// The Prometheus exporter could not be built or installed.
    #[error("metrics exporter failed: {0}")]
    Exporter(String),
}

impl TelemetryError {
    /// Creates an invalid filter error.
    pub fn invalid_filter(directive: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidFilter {
            directive: directive.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an invalid address error.
    pub fn invalid_address(addr: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidAddress {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an exporter error.
    pub fn exporter(reason: impl ToString) -> Self {
        Self::Exporter(reason.to_string())
    }

    /// Returns true if a global hook was already in place.
    ///
    /// Tests and embedders that initialize telemetry twice can ignore
    /// this case.
    pub const fn is_already_installed(&self) -> bool {
        matches!(self, Self::SubscriberInstalled(_))
    }
}
