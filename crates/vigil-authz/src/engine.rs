//! Decision engine adapters.
//!
//! The decision engine is opaque: it receives a [`DecisionRequest`] and
//! answers with an [`EngineOutcome`]. Engine faults are reported as
//! [`EngineOutcome::Failure`] values, never as panics.
//!
//! The outcome's serde form is the engine's result JSON:
//!
//! ```json
//! {"type": "success", "response": {"decision": "allow"}}
//! {"type": "failure", "errors": [{"message": "..."}]}
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::request::DecisionRequest;

/// A decision reported by the engine.
///
/// Decisions are matched case-insensitively; anything that is neither
/// allow nor deny is kept verbatim in [`Decision::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request is permitted.
    Allow,
    /// The request is denied.
    Deny,
    /// Any other decision value.
    Other(String),
}

impl Decision {
    /// Whether this is an allow decision.
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for Decision {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "allow" => Self::Allow,
            "deny" => Self::Deny,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Decision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from(value.as_str()))
    }
}

/// Body of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResponse {
    /// The decision.
    pub decision: Decision,
}

/// An error reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    /// Error message.
    pub message: String,
}

/// Result of one engine evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineOutcome {
    /// The engine evaluated the request.
    Success {
        /// Evaluation response.
        response: EngineResponse,
    },
    /// The engine could not evaluate the request.
    Failure {
        /// Reported errors.
        errors: Vec<EngineError>,
    },
}

impl EngineOutcome {
    /// A successful evaluation with the given decision.
    pub const fn success(decision: Decision) -> Self {
        Self::Success {
            response: EngineResponse { decision },
        }
    }

    /// A successful allow.
    pub const fn allow() -> Self {
        Self::success(Decision::Allow)
    }

    /// A successful deny.
    pub const fn deny() -> Self {
        Self::success(Decision::Deny)
    }

    /// A failed evaluation.
    pub fn failure<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Failure {
            errors: messages
                .into_iter()
                .map(|m| EngineError { message: m.into() })
                .collect(),
        }
    }
}

/// Evaluates decision requests.
pub trait DecisionEngine: Send + Sync + std::fmt::Debug {
    /// Evaluate one request. Called exactly once per authorization check.
    fn evaluate(&self, request: &DecisionRequest) -> EngineOutcome;
}

/// Engine that answers every request with the same outcome.
#[derive(Debug, Clone)]
pub struct StaticEngine {
    outcome: EngineOutcome,
}

impl StaticEngine {
    /// Create an engine returning `outcome`.
    pub const fn new(outcome: EngineOutcome) -> Self {
        Self { outcome }
    }

    /// Engine that allows everything.
    pub const fn allow_all() -> Self {
        Self::new(EngineOutcome::allow())
    }

    /// Engine that denies everything.
    pub const fn deny_all() -> Self {
        Self::new(EngineOutcome::deny())
    }
}

impl DecisionEngine for StaticEngine {
    fn evaluate(&self, _request: &DecisionRequest) -> EngineOutcome {
        self.outcome.clone()
    }
}

/// Engine backed by a closure over the typed request.
pub struct FnEngine<F> {
    f: F,
}

impl<F> FnEngine<F>
where
    F: Fn(&DecisionRequest) -> EngineOutcome + Send + Sync,
{
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnEngine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEngine").finish_non_exhaustive()
    }
}

impl<F> DecisionEngine for FnEngine<F>
where
    F: Fn(&DecisionRequest) -> EngineOutcome + Send + Sync,
{
    fn evaluate(&self, request: &DecisionRequest) -> EngineOutcome {
        (self.f)(request)
    }
}

/// Engine speaking the JSON call contract.
///
/// The request is encoded with [`DecisionRequest::to_call_json`], handed to
/// the wrapped function, and the returned JSON is decoded as an
/// [`EngineOutcome`]. Undecodable results become failures.
pub struct JsonEngine<F> {
    call: F,
}

impl<F> JsonEngine<F>
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    /// Wrap a JSON-in, JSON-out engine entry point.
    pub const fn new(call: F) -> Self {
        Self { call }
    }
}

impl<F> std::fmt::Debug for JsonEngine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonEngine").finish_non_exhaustive()
    }
}

impl<F> DecisionEngine for JsonEngine<F>
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn evaluate(&self, request: &DecisionRequest) -> EngineOutcome {
        let result = (self.call)(&request.to_call_json());
        serde_json::from_value(result)
            .unwrap_or_else(|e| EngineOutcome::failure([format!("invalid engine response: {e}")]))
    }
}

#[cfg(feature = "cedar")]
mod cedar {
    use std::str::FromStr;

    use cedar_policy::{
        Authorizer, Context, Decision as CedarDecision, Entities, EntityUid, PolicySet, Request,
        Schema,
    };
    use tracing::warn;

    use super::{Decision, DecisionEngine, EngineOutcome};
    use crate::bundle::SchemaSource;
    use crate::request::DecisionRequest;

    /// In-process engine backed by the `cedar-policy` crate.
    ///
    /// Policies, schema, entities and context are parsed per request, and
    /// the request is validated against the schema. Any parse or validation
    /// error is reported as a failure outcome.
    #[derive(Debug)]
    pub struct CedarEngine {
        authorizer: Authorizer,
    }

    impl Default for CedarEngine {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CedarEngine {
        /// Create an engine.
        pub fn new() -> Self {
            Self {
                authorizer: Authorizer::new(),
            }
        }

        fn try_evaluate(&self, request: &DecisionRequest) -> Result<EngineOutcome, String> {
            let schema = match &request.schema {
                SchemaSource::Json(value) => Schema::from_json_value(value.clone())
                    .map_err(|e| format!("invalid schema: {e}"))?,
                SchemaSource::Human(text) => Schema::from_cedarschema_str(text)
                    .map(|(schema, _warnings)| schema)
                    .map_err(|e| format!("invalid schema: {e}"))?,
            };

            let policies = PolicySet::from_str(&request.policy_text)
                .map_err(|e| format!("invalid policies: {e}"))?;

            let entities_json =
                serde_json::to_value(&request.entities).map_err(|e| e.to_string())?;
            let entities = Entities::from_json_value(entities_json, Some(&schema))
                .map_err(|e| format!("invalid entities: {e}"))?;

            let principal = entity_uid(&request.principal)?;
            let action = entity_uid(&request.action)?;
            let resource = entity_uid(&request.resource)?;

            let context_json = serde_json::to_value(&request.context).map_err(|e| e.to_string())?;
            let context = Context::from_json_value(context_json, Some((&schema, &action)))
                .map_err(|e| format!("invalid context: {e}"))?;

            let cedar_request = Request::new(principal, action, resource, context, Some(&schema))
                .map_err(|e| format!("invalid request: {e}"))?;

            let response = self
                .authorizer
                .is_authorized(&cedar_request, &policies, &entities);

            for error in response.diagnostics().errors() {
                warn!(error = %error, "policy evaluation error");
            }

            let decision = match response.decision() {
                CedarDecision::Allow => Decision::Allow,
                CedarDecision::Deny => Decision::Deny,
            };
            Ok(EngineOutcome::success(decision))
        }
    }

    fn entity_uid(reference: &crate::entity::EntityRef) -> Result<EntityUid, String> {
        let json = serde_json::to_value(reference).map_err(|e| e.to_string())?;
        EntityUid::from_json(json).map_err(|e| format!("invalid entity reference {reference}: {e}"))
    }

    impl DecisionEngine for CedarEngine {
        fn evaluate(&self, request: &DecisionRequest) -> EngineOutcome {
            self.try_evaluate(request)
                .unwrap_or_else(|message| EngineOutcome::failure([message]))
        }
    }
}

#[cfg(feature = "cedar")]
pub use cedar::CedarEngine;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::SchemaSource;
    use crate::entity::EntityRef;
    use indexmap::IndexMap;

    fn request() -> DecisionRequest {
        DecisionRequest {
            principal: EntityRef::new("Svc::User", "u1"),
            action: EntityRef::new("Svc::Action", "get"),
            resource: EntityRef::new("Svc::Order", "r1"),
            context: IndexMap::new(),
            policy_text: "permit(principal, action, resource);".to_string(),
            schema: SchemaSource::Human("namespace Svc {}".to_string()),
            entities: vec![],
        }
    }

    #[test]
    fn test_decision_case_insensitive() {
        let outcome: EngineOutcome =
            serde_json::from_str(r#"{"type":"success","response":{"decision":"Allow"}}"#).unwrap();
        assert_eq!(outcome, EngineOutcome::allow());

        let outcome: EngineOutcome =
            serde_json::from_str(r#"{"type":"success","response":{"decision":"DENY"}}"#).unwrap();
        assert_eq!(outcome, EngineOutcome::deny());
    }

    #[test]
    fn test_unknown_decision_is_kept() {
        let outcome: EngineOutcome =
            serde_json::from_str(r#"{"type":"success","response":{"decision":"abstain"}}"#).unwrap();
        match outcome {
            EngineOutcome::Success { response } => {
                assert_eq!(response.decision, Decision::Other("abstain".to_string()));
                assert!(!response.decision.is_allow());
            }
            EngineOutcome::Failure { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn test_failure_json() {
        let outcome = EngineOutcome::failure(["bad schema", "bad entity"]);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({
                "type": "failure",
                "errors": [{"message": "bad schema"}, {"message": "bad entity"}]
            })
        );
    }

    #[test]
    fn test_fn_engine_sees_request() {
        let engine = FnEngine::new(|request: &DecisionRequest| {
            if request.principal.id == "u1" {
                EngineOutcome::allow()
            } else {
                EngineOutcome::deny()
            }
        });
        assert_eq!(engine.evaluate(&request()), EngineOutcome::allow());
    }

    #[test]
    fn test_json_engine_receives_call_contract() {
        let engine = JsonEngine::new(|call: &Value| {
            assert_eq!(call["enableRequestValidation"], serde_json::json!(true));
            assert_eq!(call["slice"]["templateInstantiations"], serde_json::json!([]));
            serde_json::json!({"type": "success", "response": {"decision": "allow"}})
        });
        assert_eq!(engine.evaluate(&request()), EngineOutcome::allow());
    }

    #[test]
    fn test_json_engine_undecodable_result() {
        let engine = JsonEngine::new(|_: &Value| serde_json::json!({"unexpected": true}));
        match engine.evaluate(&request()) {
            EngineOutcome::Failure { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.starts_with("invalid engine response"));
            }
            EngineOutcome::Success { .. } => panic!("expected failure"),
        }
    }

    #[cfg(feature = "cedar")]
    mod cedar_engine {
        use super::*;
        use crate::entity::Entity;

        const SCHEMA: &str = r"
            namespace Svc {
                entity Role;
                entity User in [Role];
                entity Order;
                action get appliesTo { principal: [User], resource: [Order] };
            }
        ";

        fn cedar_request(policy: &str) -> DecisionRequest {
            DecisionRequest {
                principal: EntityRef::new("Svc::User", "u1"),
                action: EntityRef::new("Svc::Action", "get"),
                resource: EntityRef::new("Svc::Order", "r1"),
                context: IndexMap::new(),
                policy_text: policy.to_string(),
                schema: SchemaSource::Human(SCHEMA.to_string()),
                entities: vec![
                    Entity::new(EntityRef::new("Svc::User", "u1"))
                        .with_parent(EntityRef::new("Svc::Role", "admin")),
                    Entity::new(EntityRef::new("Svc::Order", "r1")),
                    Entity::new(EntityRef::new("Svc::Role", "admin")),
                ],
            }
        }

        #[test]
        fn test_role_permit() {
            let outcome = CedarEngine::new().evaluate(&cedar_request(
                r#"permit(principal in Svc::Role::"admin", action == Svc::Action::"get", resource);"#,
            ));
            assert_eq!(outcome, EngineOutcome::allow());
        }

        #[test]
        fn test_default_deny() {
            let outcome = CedarEngine::new().evaluate(&cedar_request(
                r#"permit(principal in Svc::Role::"sales", action, resource);"#,
            ));
            assert_eq!(outcome, EngineOutcome::deny());
        }

        #[test]
        fn test_bad_policy_is_failure() {
            let outcome = CedarEngine::new().evaluate(&cedar_request("permit(principal"));
            assert!(matches!(outcome, EngineOutcome::Failure { .. }));
        }
    }
}
