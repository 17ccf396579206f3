//! Authentication claims and their mapping to a caller identity.
//!
//! An upstream authenticator (API gateway, JWT verifier) places the verified
//! token claims into the request extensions as [`AuthClaims`]. The
//! authorization stage reads the username and role claims named by a
//! [`ClaimsMapping`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vigil_authz::UserIdentity;

/// Default claim holding the username.
pub const DEFAULT_USERNAME_CLAIM: &str = "cognito:username";

/// Default claim holding the caller's groups.
pub const DEFAULT_ROLES_CLAIM: &str = "cognito:groups";

/// Verified claims of the authenticated caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthClaims(Map<String, Value>);

impl AuthClaims {
    /// Wrap a claim map.
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Build claims from a JSON object. Returns `None` for any other JSON value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Add a claim.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Raw claim value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A string claim.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// A list claim.
    ///
    /// Accepts a JSON array of strings or a single string. Strings may be
    /// comma or whitespace separated and wrapped in brackets, as in
    /// `"admin,sales"` or `"[admin sales]"`.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(raw)) => raw
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Names the claims that carry the username and roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsMapping {
    /// Claim holding the username.
    pub username_claim: String,
    /// Claim holding the roles.
    pub roles_claim: String,
}

impl Default for ClaimsMapping {
    fn default() -> Self {
        Self {
            username_claim: DEFAULT_USERNAME_CLAIM.to_string(),
            roles_claim: DEFAULT_ROLES_CLAIM.to_string(),
        }
    }
}

impl ClaimsMapping {
    /// Create a mapping with custom claim names.
    pub fn new(username_claim: impl Into<String>, roles_claim: impl Into<String>) -> Self {
        Self {
            username_claim: username_claim.into(),
            roles_claim: roles_claim.into(),
        }
    }

    /// Extract the caller identity. Missing claims yield empty fields.
    pub fn identity(&self, claims: &AuthClaims) -> UserIdentity {
        UserIdentity::new(
            claims.string(&self.username_claim).unwrap_or_default(),
            claims.list(&self.roles_claim),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_cognito_claims() {
        let claims = AuthClaims::default()
            .with_claim("cognito:username", "alice")
            .with_claim("cognito:groups", json!(["admin", "sales"]));

        let identity = ClaimsMapping::default().identity(&claims);
        assert_eq!(identity, UserIdentity::new("alice", ["admin", "sales"]));
    }

    #[test]
    fn test_gateway_string_roles() {
        let claims = AuthClaims::default().with_claim("groups", "[admin sales]");
        assert_eq!(claims.list("groups"), vec!["admin", "sales"]);

        let claims = AuthClaims::default().with_claim("groups", "admin, sales");
        assert_eq!(claims.list("groups"), vec!["admin", "sales"]);
    }

    #[test]
    fn test_missing_claims_give_incomplete_identity() {
        let identity = ClaimsMapping::default().identity(&AuthClaims::default());
        assert!(identity.username.is_empty());
        assert!(identity.roles.is_empty());
        assert!(!identity.is_complete());
    }

    #[test]
    fn test_custom_mapping() {
        let claims = AuthClaims::from_value(json!({"sub": "u-1", "roles": ["customer"]})).unwrap();
        let identity = ClaimsMapping::new("sub", "roles").identity(&claims);
        assert_eq!(identity, UserIdentity::new("u-1", ["customer"]));
    }

    #[test]
    fn test_from_non_object() {
        assert!(AuthClaims::from_value(json!("token")).is_none());
    }
}
