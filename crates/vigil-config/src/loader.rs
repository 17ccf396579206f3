//! Layered configuration loading.
//!
//! Layers, later ones winning:
//!
//! 1. Built-in defaults or a preset
//! 2. A TOML or JSON file
//! 3. `SERVICE_NAME` / `ORGANISATION_NAME` (opt-in with
//!    [`ConfigLoader::with_service_env`])
//! 4. Prefixed overrides, `PREFIX__SECTION__KEY`
//!
//! A `.env` file loaded with [`ConfigLoader::with_dotenv`] feeds layers 3
//! and 4 without replacing variables already set in the process.

use std::env;
use std::fs;
use std::path::Path;

use crate::schema::{LogFormat, StoreKind};
use crate::{ConfigError, VigilConfig};

/// Bare variable naming the protected service.
pub const SERVICE_NAME_VAR: &str = "SERVICE_NAME";

/// Bare variable naming the organisation.
pub const ORGANISATION_NAME_VAR: &str = "ORGANISATION_NAME";

/// Configuration loader.
///
/// ```no_run
/// use vigil_config::ConfigLoader;
///
/// # fn main() -> Result<(), vigil_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("vigil.toml")?
///     .with_dotenv()?
///     .with_service_env()
///     .with_env_prefix("VIGIL")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: VigilConfig,
    env_prefix: Option<String>,
    service_env: bool,
}

impl ConfigLoader {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from [`VigilConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = VigilConfig::development();
        self
    }

    /// Start from [`VigilConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = VigilConfig::production();
        self
    }

    /// Load a `.toml` or `.json` file, replacing the current configuration.
    ///
    /// Sections and fields missing from the file take their defaults.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.config = parse(&content, format).map_err(|e| match e {
            ConfigError::ValidationError(_) => ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            )),
            other => other,
        })?;

        Ok(self)
    }

    /// Like [`with_file`](Self::with_file) but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration text in `format` (`toml` or `json`).
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Load `.env` from the working directory or its parents, if present.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::env_file(".env", e)),
        }
    }

    /// Load a specific env file.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_path(path).map_err(|e| ConfigError::env_file(path, e))?;
        Ok(self)
    }

    /// Read `SERVICE_NAME` and `ORGANISATION_NAME`.
    #[must_use]
    pub fn with_service_env(mut self) -> Self {
        self.service_env = true;
        self
    }

    /// Read `PREFIX__SECTION__KEY` overrides, e.g. `VIGIL__STORE__KIND=file`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply environment layers and validate.
    pub fn load(self) -> Result<VigilConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment layers without validating.
    pub fn load_unvalidated(self) -> Result<VigilConfig, ConfigError> {
        self.load_from_vars(env::vars())
    }

    fn load_from_vars<I>(mut self, vars: I) -> Result<VigilConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        if self.service_env {
            for (key, value) in &vars {
                match key.as_str() {
                    SERVICE_NAME_VAR => self.config.service.name.clone_from(value),
                    ORGANISATION_NAME_VAR => self.config.service.organisation.clone_from(value),
                    _ => {}
                }
            }
        }

        if let Some(prefix) = self.env_prefix.take() {
            let marker = format!("{prefix}__");
            for (key, value) in &vars {
                if let Some(path) = key.strip_prefix(&marker) {
                    self.apply_env_var(key, path, value)?;
                }
            }
        }

        Ok(self.config)
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVICE", "NAME"] => config.service.name = value.to_string(),
            ["SERVICE", "ORGANISATION"] => config.service.organisation = value.to_string(),

            ["AUTHORIZATION", "NAMESPACE"] => config.authorization.namespace = optional(value),
            ["AUTHORIZATION", "PRINCIPAL_TYPE"] => {
                config.authorization.principal_type = value.to_string();
            }
            ["AUTHORIZATION", "RESOURCE_TYPE"] => {
                config.authorization.resource_type = value.to_string();
            }
            ["AUTHORIZATION", "ROLE_TYPE"] => config.authorization.role_type = value.to_string(),
            ["AUTHORIZATION", "USERNAME_CLAIM"] => {
                config.authorization.username_claim = value.to_string();
            }
            ["AUTHORIZATION", "ROLES_CLAIM"] => {
                config.authorization.roles_claim = value.to_string();
            }
            ["AUTHORIZATION", "TRUST_INCOMING_REQUEST_ID"] => {
                config.authorization.trust_incoming_request_id = parse_bool(key, value)?;
            }

            ["STORE", "KIND"] => {
                config.store.kind = value
                    .parse::<StoreKind>()
                    .map_err(|reason| ConfigError::env_parse_error(key, reason))?;
            }
            ["STORE", "ROOT"] => config.store.root = optional(value),
            ["STORE", "ENDPOINT"] => config.store.endpoint = optional(value),

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => config.logging.span_events = parse_bool(key, value)?,
            ["LOGGING", "FILE_LINE_INFO"] => {
                config.logging.file_line_info = parse_bool(key, value)?;
            }

            // unknown keys are ignored
            _ => {}
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<VigilConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        _ => Err(ConfigError::validation_error(format!(
            "unsupported configuration format: {format}"
        ))),
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    const TOML: &str = r#"
        [service]
        name = "orders"
        organisation = "acme"

        [authorization]
        namespace = "OrderService::"
        resource_type = "Order"
    "#;

    #[test]
    fn test_defaults_fail_validation() {
        let err = ConfigLoader::new().load_from_vars(Vec::new()).unwrap().validate().unwrap_err();
        assert_eq!(err.field(), Some("service.name"));
    }

    #[test]
    fn test_with_string() {
        let config = ConfigLoader::new()
            .with_string(TOML, "toml")
            .unwrap()
            .load_from_vars(Vec::new())
            .unwrap();
        assert_eq!(config.service.name, "orders");
        assert_eq!(config.authorization.namespace.as_deref(), Some("OrderService::"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("name: orders", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = ConfigLoader::new()
            .with_string(TOML, "toml")
            .unwrap()
            .with_env_prefix("vigil")
            .load_from_vars(vars(&[
                ("VIGIL__STORE__KIND", "http"),
                ("VIGIL__STORE__ENDPOINT", "https://store.internal"),
                ("VIGIL__LOGGING__FORMAT", "pretty"),
                ("VIGIL__LOGGING__SPAN_EVENTS", "on"),
                ("VIGIL__AUTHORIZATION__NAMESPACE", ""),
                ("VIGIL__UNKNOWN__KEY", "ignored"),
                ("OTHER__STORE__KIND", "file"),
            ]))
            .unwrap();

        assert_eq!(config.store.kind, StoreKind::Http);
        assert_eq!(config.store.endpoint.as_deref(), Some("https://store.internal"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.span_events);
        assert_eq!(config.authorization.namespace, None);
    }

    #[test]
    fn test_invalid_override_values() {
        let err = ConfigLoader::new()
            .with_env_prefix("VIGIL")
            .load_from_vars(vars(&[("VIGIL__LOGGING__ENABLED", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "VIGIL__LOGGING__ENABLED"));

        let err = ConfigLoader::new()
            .with_env_prefix("VIGIL")
            .load_from_vars(vars(&[("VIGIL__STORE__KIND", "s3")]))
            .unwrap_err();
        assert!(err.to_string().contains("expected 'memory', 'file' or 'http'"));
    }

    #[test]
    fn test_service_env_is_opt_in() {
        let env = vars(&[("SERVICE_NAME", "orders"), ("ORGANISATION_NAME", "acme")]);

        let config = ConfigLoader::new().load_from_vars(env.clone()).unwrap();
        assert!(config.service.name.is_empty());

        let config = ConfigLoader::new().with_service_env().load_from_vars(env).unwrap();
        assert_eq!(config.service.name, "orders");
        assert_eq!(config.service.organisation, "acme");
    }

    #[test]
    fn test_prefixed_override_beats_service_env() {
        let config = ConfigLoader::new()
            .with_service_env()
            .with_env_prefix("VIGIL")
            .load_from_vars(vars(&[
                ("VIGIL__SERVICE__NAME", "billing"),
                ("SERVICE_NAME", "orders"),
            ]))
            .unwrap();
        assert_eq!(config.service.name, "billing");
    }

    #[test]
    fn test_parse_bool() {
        for v in ["true", "1", "YES", "on"] {
            assert!(parse_bool("K", v).unwrap());
        }
        for v in ["false", "0", "no", "OFF"] {
            assert!(!parse_bool("K", v).unwrap());
        }
        assert!(parse_bool("K", "2").is_err());
    }
}
