//! Errors raised while assembling Vigil.

use thiserror::Error;
use vigil_config::ConfigError;
use vigil_telemetry::TelemetryError;

/// Setup failures.
#[derive(Debug, Error)]
pub enum VigilError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be set up.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Result type for setup operations.
pub type VigilResult<T> = Result<T, VigilError>;
