//! Static configuration supplied by the consuming service.

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;

/// Suffix appended to the organisation name to form the policy store location.
pub const POLICY_STORE_SUFFIX: &str = "auth-policy-store";

/// Name of the action entity type (before namespacing).
pub const ACTION_TYPE: &str = "Action";

/// Entity type naming for a service's authorization model.
///
/// Every type name is prefixed with the optional `namespace`, so with
/// `namespace = "OrderService::"` and `principal_type = "User"` the principal
/// entity type is `OrderService::User`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// Optional prefix for every entity type (e.g. `"OrderService::"`).
    #[serde(default)]
    pub namespace: Option<String>,
    /// Entity type of the authenticated caller.
    pub principal_type: String,
    /// Entity type of the resource being accessed.
    pub resource_type: String,
    /// Entity type of the caller's roles.
    pub role_type: String,
}

impl AuthorizationConfig {
    /// Create a configuration without a namespace.
    pub fn new(
        principal_type: impl Into<String>,
        resource_type: impl Into<String>,
        role_type: impl Into<String>,
    ) -> Self {
        Self {
            namespace: None,
            principal_type: principal_type.into(),
            resource_type: resource_type.into(),
            role_type: role_type.into(),
        }
    }

    /// Set the namespace prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Prefix a type name with the namespace.
    pub fn qualify(&self, type_name: &str) -> String {
        format!("{}{}", self.namespace.as_deref().unwrap_or_default(), type_name)
    }

    /// Fully qualified principal entity type.
    pub fn principal_entity_type(&self) -> String {
        self.qualify(&self.principal_type)
    }

    /// Fully qualified resource entity type.
    pub fn resource_entity_type(&self) -> String {
        self.qualify(&self.resource_type)
    }

    /// Fully qualified role entity type.
    pub fn role_entity_type(&self) -> String {
        self.qualify(&self.role_type)
    }

    /// Fully qualified action entity type.
    pub fn action_entity_type(&self) -> String {
        self.qualify(ACTION_TYPE)
    }

    /// Reference to a principal with the given id.
    pub fn principal_ref(&self, id: impl Into<String>) -> EntityRef {
        EntityRef::new(self.principal_entity_type(), id)
    }

    /// Reference to a resource with the given id.
    pub fn resource_ref(&self, id: impl Into<String>) -> EntityRef {
        EntityRef::new(self.resource_entity_type(), id)
    }

    /// Reference to a role with the given name.
    pub fn role_ref(&self, role: impl Into<String>) -> EntityRef {
        EntityRef::new(self.role_entity_type(), role)
    }

    /// Reference to an action with the given name.
    pub fn action_ref(&self, action: impl Into<String>) -> EntityRef {
        EntityRef::new(self.action_entity_type(), action)
    }
}

/// Identifies where a service's policy bundle lives in the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name of the service; first segment of every artifact key.
    pub service_name: String,
    /// Name of the organisation owning the policy store.
    pub organisation_name: String,
}

impl ServiceConfig {
    /// Create a new service configuration.
    pub fn new(service_name: impl Into<String>, organisation_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            organisation_name: organisation_name.into(),
        }
    }

    /// Store location holding this service's bundle.
    pub fn policy_location(&self) -> String {
        format!("{}-{}", self.organisation_name, POLICY_STORE_SUFFIX)
    }

    /// Key prefix under which the bundle artifacts are stored.
    pub fn policy_key_prefix(&self) -> String {
        format!("{}/policy", self.service_name)
    }
}
