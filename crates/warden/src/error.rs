//! Facade error type.

use thiserror::Error;
use warden_authz::AuthzError;
use warden_config::ConfigError;
use warden_telemetry::TelemetryError;

/// Any error raised while assembling or running Warden.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WardenError {
    /// Configuration could not be loaded, validated or watched.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine rejected its rules or could not reach its source.
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Logging or metrics could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

impl WardenError {
    /// Returns true if retrying later may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Authz(e) if e.is_retryable())
    }
}

/// Result alias for facade operations.
pub type WardenResult<T> = Result<T, WardenError>;
