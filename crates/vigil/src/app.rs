//! Composition root.
//!
//! [`Vigil`] turns a [`VigilConfig`] into a ready request pipeline:
//!
//! ```text
//! VigilConfig ──▶ ArtifactStore ──▶ ServiceCache ──▶ AuthorizationMiddleware
//!                                                          │
//!                          Pipeline: RequestId → Authorization → handler
//! ```
//!
//! One `Vigil` owns one [`ServiceCache`]; clone the `Arc<Vigil>` into every
//! request task rather than building several.

use std::sync::Arc;

use tracing::info;
use vigil_authz::{
    ArtifactStore, DecisionEngine, FileArtifactStore, HttpArtifactStore, InMemoryArtifactStore,
    ServiceCache,
};
use vigil_config::{StoreKind, VigilConfig};
use vigil_middleware::{
    AuthorizationMiddleware, BoxFuture, ClaimsMapping, MiddlewareContext, Pipeline, Request,
    RequestIdMiddleware, Response,
};

use crate::error::VigilResult;

/// Wired-up authorization for one service.
#[derive(Debug)]
pub struct Vigil {
    config: VigilConfig,
    store: Arc<dyn ArtifactStore>,
    cache: Arc<ServiceCache>,
    pipeline: Pipeline,
}

impl Vigil {
    /// Build from configuration, creating the store named by `[store]`.
    ///
    /// A `memory` store starts empty; use [`Vigil::with_store`] to supply a
    /// populated one.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Config`](crate::VigilError::Config) if the
    /// configuration does not validate.
    pub fn from_config(config: &VigilConfig, engine: Arc<dyn DecisionEngine>) -> VigilResult<Self> {
        config.validate()?;
        let store = build_store(config);
        Ok(Self::assemble(config.clone(), store, engine))
    }

    /// Build from configuration with an explicit store, ignoring `[store]`.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Config`](crate::VigilError::Config) if the
    /// configuration does not validate.
    pub fn with_store(
        config: &VigilConfig,
        store: Arc<dyn ArtifactStore>,
        engine: Arc<dyn DecisionEngine>,
    ) -> VigilResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config.clone(), store, engine))
    }

    fn assemble(
        config: VigilConfig,
        store: Arc<dyn ArtifactStore>,
        engine: Arc<dyn DecisionEngine>,
    ) -> Self {
        let cache = Arc::new(ServiceCache::new(Arc::clone(&store), engine));

        let request_id = if config.authorization.trust_incoming_request_id {
            RequestIdMiddleware::trust_incoming()
        } else {
            RequestIdMiddleware::new()
        };
        let authorization = AuthorizationMiddleware::new(
            Arc::clone(&cache),
            config.authorization_config(),
            config.service_config(),
        )
        .with_claims_mapping(ClaimsMapping::new(
            config.authorization.username_claim.clone(),
            config.authorization.roles_claim.clone(),
        ));

        let pipeline = Pipeline::builder()
            .add_stage(request_id)
            .add_stage(authorization)
            .build();

        info!(
            service = %config.service.name,
            location = %config.service_config().policy_location(),
            store = ?config.store.kind,
            "vigil assembled"
        );

        Self {
            config,
            store,
            cache,
            pipeline,
        }
    }

    /// Run a request through the pipeline into `handler`.
    ///
    /// The handler sees a context carrying the caller identity and the
    /// authorization service; see
    /// [`MiddlewareContext::authorization`](vigil_middleware::MiddlewareContext::authorization).
    pub async fn handle<H>(&self, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send,
    {
        self.pipeline.handle(request, handler).await
    }

    /// The configuration this instance was built from.
    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    /// The artifact store.
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// The shared service cache.
    pub fn cache(&self) -> &Arc<ServiceCache> {
        &self.cache
    }

    /// The request pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

fn build_store(config: &VigilConfig) -> Arc<dyn ArtifactStore> {
    match config.store.kind {
        StoreKind::Memory => Arc::new(InMemoryArtifactStore::new()),
        StoreKind::File => Arc::new(FileArtifactStore::new(
            config.store.root.clone().unwrap_or_default(),
        )),
        StoreKind::Http => Arc::new(HttpArtifactStore::new(
            config.store.endpoint.clone().unwrap_or_default(),
        )),
    }
}
