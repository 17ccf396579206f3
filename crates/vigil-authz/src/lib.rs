//! Vigil Authorization - policy bundle cache and decision service
//!
//! This crate decides whether an authenticated caller may perform an action
//! on a resource. Policy evaluation is delegated to a [`DecisionEngine`];
//! this crate owns everything around it:
//!
//! - Loading a service's (policy, schema) bundle from an [`ArtifactStore`]
//! - Caching the resulting [`AuthorizationService`] with forced refresh
//! - Validating checks and building the entity graph
//! - Interpreting the engine's outcome
//!
//! # Architecture
//!
//! ```text
//!                      ┌────────────────────────────┐
//!                      │   Artifact store           │
//!                      │   {org}-auth-policy-store  │
//!                      └──────────┬─────────────────┘
//!                                 │ policies.cedar, schema.cedarschema
//!                      ┌──────────▼─────────────────┐
//!                      │   ServiceCache             │
//!                      │   (BundleLoader + swap)    │
//!                      └──────────┬─────────────────┘
//!                                 │ Arc<AuthorizationService>
//!    UserIdentity      ┌──────────▼─────────────────┐
//!    + request  ──────►│   AuthorizationService     │
//!                      │   (validate, entity graph) │
//!                      └──────────┬─────────────────┘
//!                                 │ DecisionRequest
//!                      ┌──────────▼─────────────────┐
//!                      │   DecisionEngine           │
//!                      └──────────┬─────────────────┘
//!                                 ▼
//!                         EngineOutcome → bool
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vigil_authz::{
//!     AuthorizationConfig, AuthorizationRequest, InMemoryArtifactStore, ServiceCache,
//!     ServiceConfig, StaticEngine, UserIdentity,
//! };
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemoryArtifactStore::new());
//! store.insert("acme-auth-policy-store", "orders/policy/policies.cedar", "permit(principal, action, resource);");
//! store.insert("acme-auth-policy-store", "orders/policy/schema.cedarschema", "namespace OrderService {}");
//!
//! let cache = ServiceCache::new(store, Arc::new(StaticEngine::allow_all()));
//! let config = AuthorizationConfig::new("User", "Order", "Role").with_namespace("OrderService::");
//! let service = cache
//!     .get_service(&config, &ServiceConfig::new("orders", "acme"), false)
//!     .await?;
//!
//! let caller = UserIdentity::new("alice", ["admin"]);
//! let request = AuthorizationRequest::new().with_action("getOrder").with_resource("o-1");
//! assert!(service.is_authorized(Some(&caller), &request)?);
//! # Ok::<(), vigil_authz::AuthzError>(())
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bundle;
pub mod cache;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod identity;
pub mod request;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use bundle::{BundleLoader, PolicyBundle, SchemaSource};
pub use cache::{CacheStats, ServiceCache};
pub use config::{AuthorizationConfig, ServiceConfig};
#[cfg(feature = "cedar")]
pub use engine::CedarEngine;
pub use engine::{Decision, DecisionEngine, EngineError, EngineOutcome, FnEngine, JsonEngine, StaticEngine};
pub use entity::{AttrValue, Entity, EntityGraph, EntityRef};
pub use error::{AuthzError, AuthzResult, StoreError, StoreResult};
pub use identity::UserIdentity;
pub use request::{AuthorizationRequest, DecisionRequest};
pub use service::AuthorizationService;
pub use store::{ArtifactStore, BoxFuture, FileArtifactStore, HttpArtifactStore, InMemoryArtifactStore};
