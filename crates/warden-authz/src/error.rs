//! Error types for the authorization crate.

use thiserror::Error;
use warden_router::PatternError;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors that can occur while building rule tables or deciding access.
///
/// Expression evaluation itself never fails; everything that can go wrong
/// with a rule is reported when the table is compiled.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// A rule's path pattern did not parse.
    #[error("rule {order_key}: invalid pattern: {source}")]
    InvalidPattern {
        /// Order key of the offending rule.
        order_key: String,
        /// Underlying pattern error.
        #[source]
        source: PatternError,
    },

    /// A rule's requirement could not be classified or compiled.
    #[error("rule {order_key}: invalid requirement `{requirement}`: {message}")]
    InvalidRequirement {
        /// Order key of the offending rule.
        order_key: String,
        /// The raw requirement text.
        requirement: String,
        /// What was wrong with it.
        message: String,
    },

    /// Any other configuration problem (role hierarchy, rule documents).
    #[error("configuration error: {0}")]
    Config(String),

    /// The rule source could not be read or did not answer in time.
    #[error("rule source {origin} unavailable: {message}")]
    SourceUnavailable {
        /// Which source failed (path, URL or name).
        origin: String,
        /// Error message.
        message: String,
    },

    /// Access denied by the rule table.
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Reason for denial.
        reason: String,
    },
}

impl AuthzError {
    /// Create an invalid pattern error.
    pub fn invalid_pattern(order_key: impl Into<String>, source: PatternError) -> Self {
        Self::InvalidPattern {
            order_key: order_key.into(),
            source,
        }
    }

    /// Create an invalid requirement error.
    pub fn invalid_requirement(
        order_key: impl Into<String>,
        requirement: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRequirement {
            order_key: order_key.into(),
            requirement: requirement.into(),
            message: message.into(),
        }
    }

    /// Create a source unavailable error.
    pub fn source_unavailable(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create an access denied error.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Check if this is an access denied error.
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Check if this is a configuration error.
    ///
    /// Retrying a reload will not help until the rule data is fixed.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern { .. } | Self::InvalidRequirement { .. } | Self::Config(_)
        )
    }

    /// Check if this is a retryable error.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}
