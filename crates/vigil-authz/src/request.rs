//! Authorization requests.
//!
//! [`AuthorizationRequest`] is the per-check builder filled in by business
//! code. [`DecisionRequest`] is the immutable value that crosses into the
//! decision engine once validation has passed.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::bundle::SchemaSource;
use crate::entity::{AttrValue, Entity, EntityRef};

/// Builder for a single authorization check.
///
/// Each method consumes the builder and returns the updated value.
///
/// ```
/// use vigil_authz::{AuthorizationRequest, Entity, EntityRef};
///
/// let request = AuthorizationRequest::new()
///     .with_action("getOrder")
///     .with_resource("o-1")
///     .add_entity(Entity::new(EntityRef::new("OrderService::Order", "o-1")));
///
/// assert_eq!(request.action(), Some("getOrder"));
/// assert_eq!(request.entities().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizationRequest {
    action: Option<String>,
    resource: Option<String>,
    entities: Vec<Entity>,
    context: IndexMap<String, AttrValue>,
}

impl AuthorizationRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the action name.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set the resource id.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Append an entity.
    pub fn add_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Replace all entities.
    pub fn with_entities(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.entities = entities.into_iter().collect();
        self
    }

    /// Replace the context.
    pub fn with_context(mut self, context: IndexMap<String, AttrValue>) -> Self {
        self.context = context;
        self
    }

    /// Set a single context value.
    pub fn with_context_value(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// The action, if set and non-empty.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|a| !a.is_empty())
    }

    /// The resource id, if set and non-empty.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref().filter(|r| !r.is_empty())
    }

    /// Caller-supplied entities, in call order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Request context.
    pub fn context(&self) -> &IndexMap<String, AttrValue> {
        &self.context
    }
}

/// A validated request ready for the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRequest {
    /// The caller.
    pub principal: EntityRef,
    /// The action being performed.
    pub action: EntityRef,
    /// The resource being accessed.
    pub resource: EntityRef,
    /// Request context.
    pub context: IndexMap<String, AttrValue>,
    /// Policy text from the bundle.
    pub policy_text: String,
    /// Schema from the bundle.
    pub schema: SchemaSource,
    /// Entity graph: principal, supplied entities, then roles.
    pub entities: Vec<Entity>,
}

impl DecisionRequest {
    /// Encode as the decision engine's call payload.
    ///
    /// ```json
    /// { "principal": {...}, "action": {...}, "resource": {...},
    ///   "context": {...}, "schema": {"json": ...} | {"human": "..."},
    ///   "enableRequestValidation": true,
    ///   "slice": { "policies": "...", "entities": [...],
    ///              "templateInstantiations": [] } }
    /// ```
    pub fn to_call_json(&self) -> Value {
        json!({
            "principal": self.principal,
            "action": self.action,
            "resource": self.resource,
            "context": self.context,
            "schema": self.schema,
            "enableRequestValidation": true,
            "slice": {
                "policies": self.policy_text,
                "entities": self.entities,
                "templateInstantiations": [],
            },
        })
    }
}
