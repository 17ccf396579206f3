//! Authorization middleware stage.
//!
//! Runs before the protected handler and makes sure a ready
//! [`AuthorizationService`](vigil_authz::AuthorizationService) is available
//! to it. It does not decide anything itself; handlers run the actual
//! checks through [`MiddlewareContext::authorization`].
//!
//! Per request:
//!
//! 1. A `cedar-refresh: true` header forces a policy bundle reload
//! 2. The caller identity is read from the request's [`AuthClaims`] and
//!    stored in the context
//! 3. The service is resolved from the shared [`ServiceCache`] and stored
//!    in the context
//!
//! If step 3 fails the handler is not called and the error is rendered
//! with [`authz_error_response`].

use std::sync::Arc;

use tracing::{debug, error};
use vigil_authz::{AuthorizationConfig, ServiceCache, ServiceConfig};

use crate::claims::{AuthClaims, ClaimsMapping};
use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::error_mapping::authz_error_response;
use crate::types::{Request, Response};

/// Header that forces a policy bundle reload.
pub const REFRESH_HEADER: &str = "cedar-refresh";

/// Middleware that resolves the authorization service for each request.
#[derive(Debug, Clone)]
pub struct AuthorizationMiddleware {
    cache: Arc<ServiceCache>,
    config: AuthorizationConfig,
    service: ServiceConfig,
    claims: ClaimsMapping,
}

impl AuthorizationMiddleware {
    /// Creates the stage over a shared cache.
    pub fn new(cache: Arc<ServiceCache>, config: AuthorizationConfig, service: ServiceConfig) -> Self {
        Self {
            cache,
            config,
            service,
            claims: ClaimsMapping::default(),
        }
    }

    /// Use custom claim names for username and roles.
    #[must_use]
    pub fn with_claims_mapping(mut self, claims: ClaimsMapping) -> Self {
        self.claims = claims;
        self
    }

    /// Whether the request asks for a bundle reload.
    pub fn refresh_requested(request: &Request) -> bool {
        request
            .headers()
            .get(REFRESH_HEADER)
            .is_some_and(|value| value.as_bytes() == b"true")
    }
}

impl Middleware for AuthorizationMiddleware {
    fn name(&self) -> &'static str {
        "authorization"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let refresh = Self::refresh_requested(&request);

            if let Some(claims) = request.extensions().get::<AuthClaims>() {
                let identity = self.claims.identity(claims);
                debug!(
                    request_id = %ctx.request_id(),
                    username = %identity.username,
                    roles = identity.roles.len(),
                    "caller identity established"
                );
                ctx.set_user_identity(identity);
            }

            match self.cache.get_service(&self.config, &self.service, refresh).await {
                Ok(service) => {
                    ctx.set_authorization_service(service);
                    next.run(ctx, request).await
                }
                Err(err) => {
                    error!(
                        request_id = %ctx.request_id(),
                        service = %self.service.service_name,
                        refresh,
                        error = %err,
                        "failed to initialise authorization service"
                    );
                    authz_error_response(&err, ctx.request_id())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;
    use vigil_authz::{InMemoryArtifactStore, StaticEngine};

    const LOCATION: &str = "acme-auth-policy-store";

    fn store() -> Arc<InMemoryArtifactStore> {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(LOCATION, "orders/policy/policies.cedar", "permit(principal, action, resource);");
        store.insert(LOCATION, "orders/policy/schema.cedarschema", "namespace OrderService {}");
        store
    }

    fn middleware(store: Arc<InMemoryArtifactStore>) -> AuthorizationMiddleware {
        let cache = Arc::new(ServiceCache::new(store, Arc::new(StaticEngine::allow_all())));
        AuthorizationMiddleware::new(
            cache,
            AuthorizationConfig::new("User", "Order", "Role").with_namespace("OrderService::"),
            ServiceConfig::new("orders", "acme"),
        )
    }

    fn request(refresh: Option<&str>, claims: Option<AuthClaims>) -> Request {
        let mut builder = HttpRequest::builder().uri("/orders/o-1");
        if let Some(value) = refresh {
            builder = builder.header(REFRESH_HEADER, value);
        }
        let mut request = builder.body(Full::new(Bytes::new())).unwrap();
        if let Some(claims) = claims {
            request.extensions_mut().insert(claims);
        }
        request
    }

    fn ok(_ctx: &mut MiddlewareContext, _req: Request) -> BoxFuture<'static, Response> {
        Box::pin(async {
            HttpResponse::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::new()))
                .unwrap()
        })
    }

    #[test]
    fn test_refresh_only_on_exact_true() {
        assert!(AuthorizationMiddleware::refresh_requested(&request(Some("true"), None)));
        assert!(!AuthorizationMiddleware::refresh_requested(&request(Some("TRUE"), None)));
        assert!(!AuthorizationMiddleware::refresh_requested(&request(Some("1"), None)));
        assert!(!AuthorizationMiddleware::refresh_requested(&request(None, None)));
    }

    #[tokio::test]
    async fn test_sets_identity_and_service() {
        let middleware = middleware(store());
        let mut ctx = MiddlewareContext::new();
        let claims = AuthClaims::default()
            .with_claim("cognito:username", "alice")
            .with_claim("cognito:groups", serde_json::json!(["admin"]));

        let response = middleware
            .process(&mut ctx, request(None, Some(claims)), Next::handler(ok))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.user_identity().unwrap().username, "alice");
        assert!(ctx.authorization_service().is_some());
    }

    #[tokio::test]
    async fn test_refresh_header_reloads_bundle() {
        let store = store();
        let middleware = middleware(Arc::clone(&store));

        let mut ctx = MiddlewareContext::new();
        middleware.process(&mut ctx, request(None, None), Next::handler(ok)).await;
        let mut ctx = MiddlewareContext::new();
        middleware.process(&mut ctx, request(None, None), Next::handler(ok)).await;
        assert_eq!(store.calls().len(), 2);

        let mut ctx = MiddlewareContext::new();
        middleware
            .process(&mut ctx, request(Some("true"), None), Next::handler(ok))
            .await;
        assert_eq!(store.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_load_failure_short_circuits() {
        let middleware = middleware(Arc::new(InMemoryArtifactStore::new()));
        let mut ctx = MiddlewareContext::new();

        let response = middleware
            .process(
                &mut ctx,
                request(None, None),
                Next::handler(|_ctx, _req| -> BoxFuture<'static, Response> {
                    panic!("handler must not run")
                }),
            )
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(ctx.authorization_service().is_none());
    }
}
