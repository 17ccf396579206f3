//! Configuration schema types.
//!
//! Every section rejects unknown fields and fills missing ones with
//! defaults.

use serde::{Deserialize, Serialize};
use vigil_authz::{AuthorizationConfig, ServiceConfig};
use vigil_telemetry::LogConfig;

use crate::ConfigError;

/// Default claim holding the caller's username.
pub const DEFAULT_USERNAME_CLAIM: &str = "cognito:username";

/// Default claim holding the caller's roles.
pub const DEFAULT_ROLES_CLAIM: &str = "cognito:groups";

/// Complete Vigil configuration.
///
/// ```
/// use vigil_config::VigilConfig;
///
/// let config: VigilConfig = toml::from_str(r#"
///     [service]
///     name = "orders"
///     organisation = "acme"
///
///     [authorization]
///     namespace = "OrderService::"
///     resource_type = "Order"
/// "#).unwrap();
///
/// assert_eq!(config.service_config().policy_location(), "acme-auth-policy-store");
/// assert_eq!(config.authorization_config().resource_entity_type(), "OrderService::Order");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct VigilConfig {
    /// The protected service.
    #[serde(default)]
    pub service: ServiceSection,

    /// Entity type naming and claim mapping.
    #[serde(default)]
    pub authorization: AuthorizationSection,

    /// Where policy bundles are fetched from.
    #[serde(default)]
    pub store: StoreSection,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl VigilConfig {
    /// Local development preset: pretty debug logs, file store under `./policies`.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.file_line_info = true;
        config.store.kind = StoreKind::File;
        config.store.root = Some("policies".to_string());
        config
    }

    /// Production preset: JSON logs at `info`, HTTP store.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.store.kind = StoreKind::Http;
        config
    }

    /// Check the configuration is complete and consistent.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        required("service.name", &self.service.name)?;
        required("service.organisation", &self.service.organisation)?;
        required("authorization.principal_type", &self.authorization.principal_type)?;
        required("authorization.resource_type", &self.authorization.resource_type)?;
        required("authorization.role_type", &self.authorization.role_type)?;
        required("authorization.username_claim", &self.authorization.username_claim)?;
        required("authorization.roles_claim", &self.authorization.roles_claim)?;

        match self.store.kind {
            StoreKind::Memory => {}
            StoreKind::File => {
                if self.store.root.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::missing_field("store.root"));
                }
            }
            StoreKind::Http => {
                let endpoint = self
                    .store
                    .endpoint
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| ConfigError::missing_field("store.endpoint"))?;
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(ConfigError::invalid_value(
                        "store.endpoint",
                        format!("must be an http(s) URL: {endpoint}"),
                    ));
                }
            }
        }

        if self.logging.enabled {
            vigil_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Entity type naming for the authorization service.
    pub fn authorization_config(&self) -> AuthorizationConfig {
        let section = &self.authorization;
        let config = AuthorizationConfig::new(
            section.principal_type.clone(),
            section.resource_type.clone(),
            section.role_type.clone(),
        );
        match section.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => config.with_namespace(namespace),
            _ => config,
        }
    }

    /// Location of the service's policy bundle.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(self.service.name.clone(), self.service.organisation.clone())
    }

    /// Logging setup for `vigil-telemetry`.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            json_format: self.logging.format == LogFormat::Json,
            span_events: self.logging.span_events,
            file_line_info: self.logging.file_line_info,
            thread_ids: false,
            include_target: true,
            service_name: self.service.name.clone(),
        }
    }
}

fn required(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::missing_field(field))
    } else {
        Ok(())
    }
}

/// The protected service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    /// Service name; first segment of every bundle key.
    #[serde(default)]
    pub name: String,

    /// Organisation owning the policy store.
    #[serde(default)]
    pub organisation: String,
}

/// Entity type naming and claim mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationSection {
    /// Prefix for every entity type, e.g. `OrderService::`.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Entity type of the caller.
    #[serde(default = "default_principal_type")]
    pub principal_type: String,

    /// Entity type of the protected resource.
    #[serde(default)]
    pub resource_type: String,

    /// Entity type of the caller's roles.
    #[serde(default = "default_role_type")]
    pub role_type: String,

    /// Claim holding the username.
    #[serde(default = "default_username_claim")]
    pub username_claim: String,

    /// Claim holding the roles.
    #[serde(default = "default_roles_claim")]
    pub roles_claim: String,

    /// Keep valid incoming `x-request-id` headers.
    #[serde(default)]
    pub trust_incoming_request_id: bool,
}

impl Default for AuthorizationSection {
    fn default() -> Self {
        Self {
            namespace: None,
            principal_type: default_principal_type(),
            resource_type: String::new(),
            role_type: default_role_type(),
            username_claim: default_username_claim(),
            roles_claim: default_roles_claim(),
            trust_incoming_request_id: false,
        }
    }
}

fn default_principal_type() -> String {
    "User".to_string()
}

fn default_role_type() -> String {
    "Role".to_string()
}

fn default_username_claim() -> String {
    DEFAULT_USERNAME_CLAIM.to_string()
}

fn default_roles_claim() -> String {
    DEFAULT_ROLES_CLAIM.to_string()
}

/// Artifact store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process store, empty until populated.
    #[default]
    Memory,
    /// Directory tree on local disk.
    File,
    /// Object store reachable over HTTP.
    Http,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "http" => Ok(Self::Http),
            _ => Err("expected 'memory', 'file' or 'http'".to_string()),
        }
    }
}

/// Where policy bundles are fetched from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Backend kind.
    #[serde(default)]
    pub kind: StoreKind,

    /// Root directory for the `file` store.
    #[serde(default)]
    pub root: Option<String>,

    /// Base URL for the `http` store.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Whether logging is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line.
    #[serde(default)]
    pub file_line_info: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            file_line_info: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
