//! Typed configuration for Vigil.
//!
//! [`VigilConfig`] holds everything a service needs to wire up
//! authorization:
//!
//! - [`ServiceSection`] - service and organisation names, which locate the
//!   policy bundle
//! - [`AuthorizationSection`] - entity type naming and claim mapping
//! - [`StoreSection`] - artifact store backend
//! - [`LoggingSection`] - log output
//!
//! Load it with [`ConfigLoader`] (defaults → file → env):
//!
//! ```no_run
//! use vigil_config::ConfigLoader;
//!
//! # fn main() -> Result<(), vigil_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("vigil.toml")?
//!     .with_service_env()
//!     .with_env_prefix("VIGIL")
//!     .load()?;
//!
//! println!("policies at {}", config.service_config().policy_location());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! name = "orders"
//! organisation = "acme"
//!
//! [authorization]
//! namespace = "OrderService::"
//! principal_type = "User"
//! resource_type = "Order"
//! role_type = "Role"
//! username_claim = "cognito:username"
//! roles_claim = "cognito:groups"
//!
//! [store]
//! kind = "http"
//! endpoint = "https://policy-store.internal"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::{ConfigLoader, ORGANISATION_NAME_VAR, SERVICE_NAME_VAR};
pub use schema::{
    AuthorizationSection, LogFormat, LoggingSection, ServiceSection, StoreKind, StoreSection,
    VigilConfig, DEFAULT_ROLES_CLAIM, DEFAULT_USERNAME_CLAIM,
};
