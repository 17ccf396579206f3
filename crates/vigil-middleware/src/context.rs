//! Per-request middleware context.
//!
//! The [`MiddlewareContext`] carries everything one request accumulates on
//! its way through the pipeline: its request id, the caller identity pushed
//! by the authorization stage, the authorization service handle, and typed
//! extensions. Nothing in it is shared between requests.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;
use vigil_authz::{AuthorizationRequest, AuthorizationService, AuthzResult, UserIdentity};

/// Unique identifier of one request (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned handle for running authorization checks from a handler.
///
/// Produced by [`MiddlewareContext::authorization`] once the authorization
/// stage has run; it can be moved into the handler's future.
#[derive(Debug, Clone)]
pub struct RequestAuthorization {
    service: Arc<AuthorizationService>,
    identity: Option<UserIdentity>,
}

impl RequestAuthorization {
    /// Create a handle for `identity` over `service`.
    pub fn new(service: Arc<AuthorizationService>, identity: Option<UserIdentity>) -> Self {
        Self { service, identity }
    }

    /// The caller identity, if the request carried claims.
    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// The authorization service.
    pub fn service(&self) -> &Arc<AuthorizationService> {
        &self.service
    }

    /// Check the request for this caller.
    pub fn is_authorized(&self, request: &AuthorizationRequest) -> AuthzResult<bool> {
        self.service.is_authorized(self.identity.as_ref(), request)
    }

    /// Check the request for this caller, turning a deny into an error.
    pub fn authorize(&self, request: &AuthorizationRequest) -> AuthzResult<()> {
        self.service.authorize(self.identity.as_ref(), request)
    }
}

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use vigil_authz::UserIdentity;
/// use vigil_middleware::context::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_user_identity(UserIdentity::new("alice", ["admin"]));
///
/// assert_eq!(ctx.user_identity().unwrap().username, "alice");
/// assert!(ctx.authorization().is_none());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    user_identity: Option<UserIdentity>,
    authorization_service: Option<Arc<AuthorizationService>>,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            user_identity: None,
            authorization_service: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Sets the request ID.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the caller identity, if one was established.
    #[must_use]
    pub fn user_identity(&self) -> Option<&UserIdentity> {
        self.user_identity.as_ref()
    }

    /// Sets the caller identity for this request.
    pub fn set_user_identity(&mut self, identity: UserIdentity) {
        self.user_identity = Some(identity);
    }

    /// Returns the authorization service resolved for this request.
    #[must_use]
    pub fn authorization_service(&self) -> Option<&Arc<AuthorizationService>> {
        self.authorization_service.as_ref()
    }

    /// Sets the authorization service for this request.
    pub fn set_authorization_service(&mut self, service: Arc<AuthorizationService>) {
        self.authorization_service = Some(service);
    }

    /// An owned authorization handle, once the service is resolved.
    #[must_use]
    pub fn authorization(&self) -> Option<RequestAuthorization> {
        self.authorization_service
            .as_ref()
            .map(|service| RequestAuthorization::new(Arc::clone(service), self.user_identity.clone()))
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_authz::{AuthorizationConfig, AuthzError, PolicyBundle, StaticEngine};

    fn service() -> Arc<AuthorizationService> {
        Arc::new(AuthorizationService::new(
            AuthorizationConfig::new("User", "Order", "Role"),
            PolicyBundle::new("permit(principal, action, resource);", "{}", "acme-auth-policy-store"),
            Arc::new(StaticEngine::allow_all()),
        ))
    }

    #[test]
    fn test_new_context_has_no_identity() {
        let ctx = MiddlewareContext::new();
        assert!(ctx.user_identity().is_none());
        assert!(ctx.authorization_service().is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(MiddlewareContext::new().request_id(), MiddlewareContext::new().request_id());
    }

    #[test]
    fn test_authorization_handle_uses_context_identity() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_authorization_service(service());

        let request = AuthorizationRequest::new().with_action("getOrder").with_resource("o-1");
        let anonymous = ctx.authorization().unwrap();
        assert!(matches!(
            anonymous.is_authorized(&request),
            Err(AuthzError::MissingAuthenticatedUserDetails)
        ));

        ctx.set_user_identity(UserIdentity::new("alice", ["admin"]));
        let authorization = ctx.authorization().unwrap();
        assert!(authorization.is_authorized(&request).unwrap());
        assert!(authorization.authorize(&request).is_ok());
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct Tenant(&'static str);

        let mut ctx = MiddlewareContext::new();
        assert!(!ctx.has_extension::<Tenant>());

        ctx.set_extension(Tenant("acme"));
        assert_eq!(ctx.get_extension::<Tenant>(), Some(&Tenant("acme")));

        assert_eq!(ctx.remove_extension::<Tenant>(), Some(Tenant("acme")));
        assert!(!ctx.has_extension::<Tenant>());
    }
}
