//! The authorization service: validation, request construction and
//! decision interpretation over one loaded policy bundle.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::bundle::PolicyBundle;
use crate::config::AuthorizationConfig;
use crate::engine::{DecisionEngine, EngineOutcome};
use crate::entity::EntityGraph;
use crate::error::{AuthzError, AuthzResult};
use crate::identity::UserIdentity;
use crate::request::{AuthorizationRequest, DecisionRequest};

/// Answers authorization checks against one immutable policy bundle.
///
/// Instances are created by [`ServiceCache`](crate::ServiceCache) and shared
/// as `Arc<AuthorizationService>`; a refresh installs a new instance rather
/// than mutating this one.
#[derive(Debug)]
pub struct AuthorizationService {
    config: AuthorizationConfig,
    bundle: PolicyBundle,
    engine: Arc<dyn DecisionEngine>,
}

impl AuthorizationService {
    /// Create a service over a loaded bundle.
    pub fn new(config: AuthorizationConfig, bundle: PolicyBundle, engine: Arc<dyn DecisionEngine>) -> Self {
        Self {
            config,
            bundle,
            engine,
        }
    }

    /// Entity type configuration this service was built for.
    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    /// The policy bundle this service evaluates against.
    pub fn bundle(&self) -> &PolicyBundle {
        &self.bundle
    }

    /// Validate a check and build the engine request.
    ///
    /// Validation stops at the first failure, in this order: caller
    /// identity, action, resource.
    pub fn decision_request(
        &self,
        identity: Option<&UserIdentity>,
        request: &AuthorizationRequest,
    ) -> AuthzResult<DecisionRequest> {
        let identity = identity
            .filter(|identity| identity.is_complete())
            .ok_or(AuthzError::MissingAuthenticatedUserDetails)?;
        let action = request.action().ok_or(AuthzError::MissingAuthorizationAction)?;
        let resource = request
            .resource()
            .ok_or(AuthzError::MissingAuthorizationResource)?;

        let graph = EntityGraph::new(&self.config, identity);
        Ok(DecisionRequest {
            principal: graph.principal_ref(),
            action: self.config.action_ref(action),
            resource: self.config.resource_ref(resource),
            context: request.context().clone(),
            policy_text: self.bundle.policy_text.clone(),
            schema: self.bundle.schema.clone(),
            entities: graph.assemble(request.entities()),
        })
    }

    /// Check whether the caller may perform the request's action on its resource.
    ///
    /// Returns `Ok(true)` only for an allow decision. Engine failures are
    /// returned as [`AuthzError::DecisionEngine`].
    #[instrument(skip_all, fields(action = request.action(), resource = request.resource()))]
    pub fn is_authorized(
        &self,
        identity: Option<&UserIdentity>,
        request: &AuthorizationRequest,
    ) -> AuthzResult<bool> {
        let decision_request = self.decision_request(identity, request)?;
        debug!(
            principal = %decision_request.principal,
            action = %decision_request.action,
            resource = %decision_request.resource,
            entities = decision_request.entities.len(),
            "authorization request built"
        );

        match self.engine.evaluate(&decision_request) {
            EngineOutcome::Success { response } => {
                let allowed = response.decision.is_allow();
                info!(decision = %response.decision, allowed, "authorization decision");
                Ok(allowed)
            }
            EngineOutcome::Failure { errors } => {
                warn!(errors = errors.len(), "decision engine failure");
                Err(AuthzError::decision_engine(errors.iter().map(|e| e.message.as_str())))
            }
        }
    }

    /// Like [`is_authorized`](Self::is_authorized), but a deny is an
    /// [`AuthzError::AccessDenied`].
    pub fn authorize(&self, identity: Option<&UserIdentity>, request: &AuthorizationRequest) -> AuthzResult<()> {
        if self.is_authorized(identity, request)? {
            return Ok(());
        }

        let reason = format!(
            "User is not authorised to perform the {} action on {} with id {}",
            request.action().unwrap_or_default(),
            self.config.resource_type.to_lowercase(),
            request.resource().unwrap_or_default(),
        );
        debug!(%reason, "access denied");
        Err(AuthzError::access_denied(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FnEngine, StaticEngine};
    use crate::entity::{Entity, EntityRef};

    fn service(engine: Arc<dyn DecisionEngine>) -> AuthorizationService {
        let config = AuthorizationConfig::new("User", "Order", "Role").with_namespace("Svc::");
        let bundle = PolicyBundle::new("permit(principal, action, resource);", "namespace Svc {}", "acme-auth-policy-store");
        AuthorizationService::new(config, bundle, engine)
    }

    fn caller() -> UserIdentity {
        UserIdentity::new("u1", ["admin"])
    }

    #[test]
    fn test_validation_order() {
        let service = service(Arc::new(StaticEngine::allow_all()));
        let empty = AuthorizationRequest::new();

        let err = service.is_authorized(None, &empty).unwrap_err();
        assert!(matches!(err, AuthzError::MissingAuthenticatedUserDetails));

        let no_roles = UserIdentity::new("u1", Vec::<String>::new());
        let err = service.is_authorized(Some(&no_roles), &empty).unwrap_err();
        assert!(matches!(err, AuthzError::MissingAuthenticatedUserDetails));

        let err = service.is_authorized(Some(&caller()), &empty).unwrap_err();
        assert!(matches!(err, AuthzError::MissingAuthorizationAction));

        let action_only = AuthorizationRequest::new().with_action("get");
        let err = service.is_authorized(Some(&caller()), &action_only).unwrap_err();
        assert!(matches!(err, AuthzError::MissingAuthorizationResource));

        let resource_only = AuthorizationRequest::new().with_resource("r1");
        let err = service.is_authorized(Some(&caller()), &resource_only).unwrap_err();
        assert!(matches!(err, AuthzError::MissingAuthorizationAction));
    }

    #[test]
    fn test_decision_request_refs() {
        let service = service(Arc::new(StaticEngine::allow_all()));
        let request = AuthorizationRequest::new().with_action("get").with_resource("r1");

        let built = service.decision_request(Some(&caller()), &request).unwrap();

        assert_eq!(built.principal, EntityRef::new("Svc::User", "u1"));
        assert_eq!(built.action, EntityRef::new("Svc::Action", "get"));
        assert_eq!(built.resource, EntityRef::new("Svc::Order", "r1"));
        assert_eq!(built.policy_text, "permit(principal, action, resource);");
        assert_eq!(built.entities.len(), 2);
    }

    #[test]
    fn test_engine_sees_supplied_entities_between_principal_and_roles() {
        let engine = FnEngine::new(|request: &DecisionRequest| {
            let types: Vec<&str> = request
                .entities
                .iter()
                .map(|e| e.uid.entity_type.as_str())
                .collect();
            if types == ["Svc::User", "Svc::Order", "Svc::Role"] {
                EngineOutcome::allow()
            } else {
                EngineOutcome::deny()
            }
        });
        let service = service(Arc::new(engine));
        let request = AuthorizationRequest::new()
            .with_action("get")
            .with_resource("r1")
            .add_entity(Entity::new(EntityRef::new("Svc::Order", "r1")));

        assert!(service.is_authorized(Some(&caller()), &request).unwrap());
    }

    #[test]
    fn test_decision_mapping() {
        let request = AuthorizationRequest::new().with_action("get").with_resource("r1");

        let allow = service(Arc::new(StaticEngine::allow_all()));
        assert!(allow.is_authorized(Some(&caller()), &request).unwrap());

        let deny = service(Arc::new(StaticEngine::deny_all()));
        assert!(!deny.is_authorized(Some(&caller()), &request).unwrap());

        let other = service(Arc::new(StaticEngine::new(EngineOutcome::success("NotApplicable".into()))));
        assert!(!other.is_authorized(Some(&caller()), &request).unwrap());

        let failing = service(Arc::new(StaticEngine::new(EngineOutcome::failure([
            "entity does not conform to schema",
            "unknown action",
        ]))));
        let err = failing.is_authorized(Some(&caller()), &request).unwrap_err();
        assert!(matches!(err, AuthzError::DecisionEngine { .. }));
        assert_eq!(err.to_string(), "entity does not conform to schema\nunknown action");
    }

    #[test]
    fn test_authorize_denial_message() {
        let service = service(Arc::new(StaticEngine::deny_all()));
        let request = AuthorizationRequest::new().with_action("getOrder").with_resource("o-42");

        let err = service.authorize(Some(&caller()), &request).unwrap_err();
        assert!(err.is_access_denied());
        assert_eq!(
            err.to_string(),
            "access denied: User is not authorised to perform the getOrder action on order with id o-42"
        );
    }

    #[test]
    fn test_authorize_allows() {
        let service = service(Arc::new(StaticEngine::allow_all()));
        let request = AuthorizationRequest::new().with_action("getOrder").with_resource("o-42");
        assert!(service.authorize(Some(&caller()), &request).is_ok());
    }
}
