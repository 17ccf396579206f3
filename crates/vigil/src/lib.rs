//! # Vigil
//!
//! **Policy-based authorization for HTTP services**
//!
//! Vigil loads a service's policy bundle (policy text plus schema) from an
//! artifact store, keeps it cached, and answers "may this caller perform
//! this action on this resource?" through a pluggable decision engine.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil::prelude::*;
//!
//! let config = ConfigLoader::new()
//!     .with_file("vigil.toml")?
//!     .with_service_env()
//!     .with_env_prefix("VIGIL")
//!     .load()?;
//! vigil::init_logging(&config)?;
//!
//! let vigil = Vigil::from_config(&config, Arc::new(CedarEngine::new()))?;
//!
//! let response = vigil
//!     .handle(request, |ctx, _req| {
//!         let authorization = ctx.authorization();
//!         Box::pin(async move {
//!             // authorization.authorize(&AuthorizationRequest::new()...)
//!         })
//!     })
//!     .await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → RequestId → Authorization → Handler ──▶ AuthorizationService
//!                            │                            │
//!                            ▼                            ▼
//!                      ServiceCache ──▶ ArtifactStore   DecisionEngine
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod error;

pub use app::Vigil;
pub use error::{VigilError, VigilResult};

pub use vigil_authz as authz;
pub use vigil_config as config;
pub use vigil_middleware as middleware;
pub use vigil_telemetry as telemetry;

/// Install logging as described by the `[logging]` section.
///
/// # Errors
///
/// Returns [`VigilError::Telemetry`] if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &vigil_config::VigilConfig) -> VigilResult<()> {
    vigil_telemetry::init_logging(&config.log_config())?;
    Ok(())
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{Vigil, VigilError, VigilResult};

    #[cfg(feature = "cedar")]
    pub use vigil_authz::CedarEngine;
    pub use vigil_authz::{
        AuthorizationRequest, AuthzError, AuthzResult, DecisionEngine, Entity, EntityRef,
        UserIdentity,
    };
    pub use vigil_config::{ConfigLoader, VigilConfig};
    pub use vigil_middleware::stages::result_response;
    pub use vigil_middleware::{
        AuthClaims, BoxFuture, MiddlewareContext, Request, RequestAuthorization, RequestId,
        Response, ResponseExt,
    };
}
