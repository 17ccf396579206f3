//! Caller identity carried through an authorization check.
//!
//! A [`UserIdentity`] is produced per request (usually by the middleware from
//! authentication claims) and passed explicitly to
//! [`AuthorizationService::is_authorized`](crate::AuthorizationService::is_authorized).

use serde::{Deserialize, Serialize};

/// The authenticated caller: a username and the roles (groups) it holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Username of the caller.
    pub username: String,
    /// Roles held by the caller, in claim order.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserIdentity {
    /// Create a new identity.
    pub fn new<I, S>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the identity has both a username and at least one role.
    ///
    /// Incomplete identities fail validation with
    /// [`AuthzError::MissingAuthenticatedUserDetails`](crate::AuthzError::MissingAuthenticatedUserDetails).
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.roles.is_empty()
    }

    /// Whether the caller holds the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_identity() {
        let identity = UserIdentity::new("alice", ["admin"]);
        assert!(identity.is_complete());
        assert!(identity.has_role("admin"));
        assert!(!identity.has_role("customer"));
    }

    #[test]
    fn test_incomplete_identity() {
        assert!(!UserIdentity::default().is_complete());
        assert!(!UserIdentity::new("alice", Vec::<String>::new()).is_complete());
        assert!(!UserIdentity::new("", ["admin"]).is_complete());
    }
}
