//! Entities and the entity graph handed to the decision engine.
//!
//! The JSON shape of an [`Entity`] is the decision engine's wire format:
//!
//! ```json
//! { "uid": { "type": "Svc::User", "id": "u1" },
//!   "attrs": {},
//!   "parents": [ { "type": "Svc::Role", "id": "admin" } ] }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AuthorizationConfig;
use crate::identity::UserIdentity;

/// Attribute value in the decision engine's entity JSON format.
pub type AttrValue = Value;

/// Typed entity identifier. Two refs are the same entity iff type and id match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// Fully qualified entity type.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Entity id.
    pub id: String,
}

impl EntityRef {
    /// Create a new entity reference.
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Encode this reference as an attribute value (`{"__entity": {...}}`).
    pub fn to_attr_value(&self) -> AttrValue {
        serde_json::json!({
            "__entity": {
                "type": self.entity_type,
                "id": self.id,
            }
        })
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::\"{}\"", self.entity_type, self.id)
    }
}

/// A node in the authorization entity graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity identifier.
    pub uid: EntityRef,
    /// Attributes, in insertion order.
    #[serde(default)]
    pub attrs: IndexMap<String, AttrValue>,
    /// Group/role memberships.
    #[serde(default)]
    pub parents: Vec<EntityRef>,
}

impl Entity {
    /// Create an entity with no attributes and no parents.
    pub fn new(uid: EntityRef) -> Self {
        Self {
            uid,
            attrs: IndexMap::new(),
            parents: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Add an attribute referencing another entity.
    pub fn with_entity_attr(self, name: impl Into<String>, target: &EntityRef) -> Self {
        self.with_attr(name, target.to_attr_value())
    }

    /// Add a parent.
    pub fn with_parent(mut self, parent: EntityRef) -> Self {
        self.parents.push(parent);
        self
    }
}

/// Derives the principal and role entities for one caller.
#[derive(Debug, Clone, Copy)]
pub struct EntityGraph<'a> {
    config: &'a AuthorizationConfig,
    identity: &'a UserIdentity,
}

impl<'a> EntityGraph<'a> {
    /// Create a graph constructor for the given caller.
    pub const fn new(config: &'a AuthorizationConfig, identity: &'a UserIdentity) -> Self {
        Self { config, identity }
    }

    /// Reference to the caller's principal entity.
    pub fn principal_ref(&self) -> EntityRef {
        self.config.principal_ref(self.identity.username.as_str())
    }

    /// The principal entity; its parents are the caller's roles.
    pub fn principal(&self) -> Entity {
        Entity {
            uid: self.principal_ref(),
            attrs: IndexMap::new(),
            parents: self
                .identity
                .roles
                .iter()
                .map(|role| self.config.role_ref(role.as_str()))
                .collect(),
        }
    }

    /// One entity per caller role, without attributes or parents.
    pub fn roles(&self) -> Vec<Entity> {
        self.identity
            .roles
            .iter()
            .map(|role| Entity::new(self.config.role_ref(role.as_str())))
            .collect()
    }

    /// The full entity list: principal, then `supplied` in order, then roles.
    ///
    /// Duplicate uids are passed through untouched.
    pub fn assemble(&self, supplied: &[Entity]) -> Vec<Entity> {
        let roles = self.roles();
        let mut entities = Vec::with_capacity(1 + supplied.len() + roles.len());
        entities.push(self.principal());
        entities.extend_from_slice(supplied);
        entities.extend(roles);
        entities
    }
}
