//! Structured logging for Vigil.
//!
//! ```text
//! LogConfig ──▶ init_logging ──▶ EnvFilter + fmt layer (JSON | pretty) ──▶ stdout
//! ```
//!
//! Presets:
//!
//! | Preset | Level | Format | Span events |
//! |--------|-------|--------|-------------|
//! | [`LogConfig::production`] (default) | `info` | JSON | off |
//! | [`LogConfig::development`] | `debug` | pretty | new + close |

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
