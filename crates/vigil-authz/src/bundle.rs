//! Policy bundle loading.
//!
//! A service's bundle is a policy text and a schema text stored side by side
//! in the artifact store:
//!
//! ```text
//! {organisation}-auth-policy-store/
//!     {service}/policy/policies.cedar
//!     {service}/policy/schema.cedarschema
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::ServiceConfig;
use crate::error::{AuthzError, AuthzResult};
use crate::store::ArtifactStore;

/// File name of the policy artifact.
pub const POLICY_FILE: &str = "policies.cedar";

/// File name of the schema artifact.
pub const SCHEMA_FILE: &str = "schema.cedarschema";

/// Schema in whichever form the decision engine should read it.
///
/// Serializes as `{"json": ...}` or `{"human": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSource {
    /// Schema text that parsed as JSON.
    Json(Value),
    /// Schema text in the human-readable schema syntax.
    Human(String),
}

impl SchemaSource {
    /// Classify schema text: JSON when it parses as JSON, human-readable otherwise.
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).map_or_else(|_| Self::Human(text.to_string()), Self::Json)
    }

    /// Whether the schema is in JSON form.
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// A loaded (policy, schema) pair. Never partially populated.
#[derive(Debug, Clone)]
pub struct PolicyBundle {
    /// Policy text.
    pub policy_text: String,
    /// Raw schema text.
    pub schema_text: String,
    /// Schema as handed to the decision engine.
    pub schema: SchemaSource,
    /// Store location the bundle was read from.
    pub location: String,
    /// When the bundle was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl PolicyBundle {
    /// Build a bundle from its two artifacts.
    pub fn new(
        policy_text: impl Into<String>,
        schema_text: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let schema_text = schema_text.into();
        Self {
            policy_text: policy_text.into(),
            schema: SchemaSource::parse(&schema_text),
            schema_text,
            location: location.into(),
            loaded_at: Utc::now(),
        }
    }
}

/// Loads policy bundles from an artifact store.
#[derive(Debug, Clone)]
pub struct BundleLoader {
    store: Arc<dyn ArtifactStore>,
}

impl BundleLoader {
    /// Create a loader reading from `store`.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Load the bundle for a service.
    ///
    /// The policy is fetched first; the schema is only fetched once the
    /// policy came back non-empty.
    pub async fn load(&self, service: &ServiceConfig) -> AuthzResult<PolicyBundle> {
        let location = service.policy_location();
        let prefix = service.policy_key_prefix();
        info!(location = %location, service = %service.service_name, "loading policy bundle");

        let policy_key = format!("{prefix}/{POLICY_FILE}");
        let policy_text = match self.store.fetch(&policy_key, &location).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => {
                error!(location = %location, key = %policy_key, "policy artifact is missing or empty");
                return Err(AuthzError::missing_policy(None));
            }
            Err(e) => {
                error!(location = %location, key = %policy_key, error = %e, "policy fetch failed");
                return Err(AuthzError::missing_policy(Some(e)));
            }
        };

        let schema_key = format!("{prefix}/{SCHEMA_FILE}");
        let schema_text = match self.store.fetch(&schema_key, &location).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => {
                error!(location = %location, key = %schema_key, "schema artifact is missing or empty");
                return Err(AuthzError::missing_schema(None));
            }
            Err(e) => {
                error!(location = %location, key = %schema_key, error = %e, "schema fetch failed");
                return Err(AuthzError::missing_schema(Some(e)));
            }
        };

        let bundle = PolicyBundle::new(policy_text, schema_text, location);
        debug!(
            policy_bytes = bundle.policy_text.len(),
            schema_json = bundle.schema.is_json(),
            "policy bundle loaded"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FetchCall, InMemoryArtifactStore};

    const LOCATION: &str = "acme-auth-policy-store";
    const POLICY_KEY: &str = "orders/policy/policies.cedar";
    const SCHEMA_KEY: &str = "orders/policy/schema.cedarschema";

    fn service() -> ServiceConfig {
        ServiceConfig::new("orders", "acme")
    }

    fn call(key: &str) -> FetchCall {
        FetchCall {
            key: key.to_string(),
            location: LOCATION.to_string(),
        }
    }

    #[test]
    fn test_schema_source_json() {
        let schema = SchemaSource::parse(r#"{"Svc": {"entityTypes": {}, "actions": {}}}"#);
        assert!(schema.is_json());
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            serde_json::json!({"json": {"Svc": {"entityTypes": {}, "actions": {}}}})
        );
    }

    #[test]
    fn test_schema_source_human() {
        let text = "namespace Svc { entity User; }";
        let schema = SchemaSource::parse(text);
        assert_eq!(schema, SchemaSource::Human(text.to_string()));
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            serde_json::json!({"human": text})
        );
    }

    #[tokio::test]
    async fn test_load_fetches_policy_then_schema() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(LOCATION, POLICY_KEY, "permit(principal, action, resource);");
        store.insert(LOCATION, SCHEMA_KEY, "namespace Svc { }");

        let before = Utc::now();
        let bundle = BundleLoader::new(store.clone()).load(&service()).await.unwrap();

        assert!(bundle.loaded_at >= before && bundle.loaded_at <= Utc::now());
        assert_eq!(bundle.policy_text, "permit(principal, action, resource);");
        assert_eq!(bundle.location, LOCATION);
        assert!(!bundle.schema.is_json());
        assert_eq!(store.calls(), vec![call(POLICY_KEY), call(SCHEMA_KEY)]);
    }

    #[tokio::test]
    async fn test_empty_policy_skips_schema() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(LOCATION, POLICY_KEY, "");
        store.insert(LOCATION, SCHEMA_KEY, "namespace Svc { }");

        let err = BundleLoader::new(store.clone()).load(&service()).await.unwrap_err();

        assert!(matches!(err, AuthzError::MissingAuthorizationPolicy { source: None }));
        assert_eq!(store.calls(), vec![call(POLICY_KEY)]);
    }

    #[tokio::test]
    async fn test_policy_failure_skips_schema() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.fail(LOCATION, POLICY_KEY, "connection refused");

        let err = BundleLoader::new(store.clone()).load(&service()).await.unwrap_err();

        assert!(matches!(err, AuthzError::MissingAuthorizationPolicy { source: Some(_) }));
        assert!(err.is_storage_failure());
        assert_eq!(store.calls(), vec![call(POLICY_KEY)]);
    }

    #[tokio::test]
    async fn test_absent_schema() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(LOCATION, POLICY_KEY, "permit(principal, action, resource);");

        let err = BundleLoader::new(store).load(&service()).await.unwrap_err();
        assert!(matches!(err, AuthzError::MissingAuthorizationSchema { source: None }));
    }

    #[tokio::test]
    async fn test_schema_failure() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(LOCATION, POLICY_KEY, "permit(principal, action, resource);");
        store.fail(LOCATION, SCHEMA_KEY, "throttled");

        let err = BundleLoader::new(store).load(&service()).await.unwrap_err();
        assert!(matches!(err, AuthzError::MissingAuthorizationSchema { source: Some(_) }));
    }
}
