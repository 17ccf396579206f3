//! Error types for the authorization crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Result type for artifact store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during authorization.
///
/// The validation variants are reported in a fixed order by
/// [`AuthorizationService::is_authorized`](crate::AuthorizationService::is_authorized):
/// user details first, then action, then resource.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// The caller identity has no username or no roles.
    #[error("missing authenticated user details")]
    MissingAuthenticatedUserDetails,

    /// No action was set on the authorization request.
    #[error("missing authorization action details")]
    MissingAuthorizationAction,

    /// No resource was set on the authorization request.
    #[error("missing authorization resource details")]
    MissingAuthorizationResource,

    /// The policy artifact could not be fetched or was empty.
    #[error("missing authorization policy details")]
    MissingAuthorizationPolicy {
        /// Store failure, when the fetch itself failed.
        #[source]
        source: Option<StoreError>,
    },

    /// The schema artifact could not be fetched or was empty.
    #[error("missing authorization schema details")]
    MissingAuthorizationSchema {
        /// Store failure, when the fetch itself failed.
        #[source]
        source: Option<StoreError>,
    },

    /// Artifact store failure that was not attributed to a bundle artifact.
    #[error("artifact store error: {0}")]
    Storage(#[from] StoreError),

    /// The decision engine reported a failure.
    ///
    /// The message is the engine's error messages joined with newlines.
    #[error("{message}")]
    DecisionEngine {
        /// Newline-joined engine error messages.
        message: String,
    },

    /// The decision engine denied the request.
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Reason for denial.
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthzError {
    /// Create a missing policy error, optionally caused by a store failure.
    pub fn missing_policy(source: Option<StoreError>) -> Self {
        Self::MissingAuthorizationPolicy { source }
    }

    /// Create a missing schema error, optionally caused by a store failure.
    pub fn missing_schema(source: Option<StoreError>) -> Self {
        Self::MissingAuthorizationSchema { source }
    }

    /// Create a decision engine error from the engine's reported messages.
    pub fn decision_engine<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let message = messages
            .into_iter()
            .map(|m| m.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::DecisionEngine { message }
    }

    /// Create an access denied error.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Check if this is an access denied error.
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Check if this error came from an artifact store failure.
    pub const fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::Storage(_)
                | Self::MissingAuthorizationPolicy { source: Some(_) }
                | Self::MissingAuthorizationSchema { source: Some(_) }
        )
    }

    /// Stable machine-readable code for this error kind.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingAuthenticatedUserDetails => "MISSING_AUTHENTICATED_USER_DETAILS",
            Self::MissingAuthorizationAction => "MISSING_AUTHORIZATION_ACTION",
            Self::MissingAuthorizationResource => "MISSING_AUTHORIZATION_RESOURCE",
            Self::MissingAuthorizationPolicy { .. } => "MISSING_AUTHORIZATION_POLICY",
            Self::MissingAuthorizationSchema { .. } => "MISSING_AUTHORIZATION_SCHEMA",
            Self::Storage(_) => "STORAGE_FAILURE",
            Self::DecisionEngine { .. } => "DECISION_ENGINE_FAILURE",
            Self::AccessDenied { .. } => "ACCESS_DENIED",
            Self::Config(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Errors raised by an [`ArtifactStore`](crate::store::ArtifactStore).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Key or location was empty.
    #[error("artifact key and location must be non-empty (key: {key:?}, location: {location:?})")]
    InvalidKey {
        /// Requested key.
        key: String,
        /// Requested location.
        location: String,
    },

    /// The store could not be reached or the transfer failed.
    #[error("failed to retrieve {key} from {location}: {source}")]
    Transport {
        /// Store location (bucket).
        location: String,
        /// Artifact key.
        key: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store answered with an unexpected status.
    #[error("store returned status {status} for {key} in {location}")]
    Status {
        /// Store location (bucket).
        location: String,
        /// Artifact key.
        key: String,
        /// HTTP status code.
        status: u16,
    },

    /// Filesystem error from a file-backed store.
    #[error("failed to read artifact at {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create a transport error.
    pub fn transport(
        location: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            location: location.into(),
            key: key.into(),
            source: source.into(),
        }
    }

    /// Check if this is a retryable error.
    ///
    /// Nothing in this crate retries; the predicate is for callers that wrap
    /// the store with their own policy.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { status: 500..=599, .. })
    }
}
