//! Artifact store clients.
//!
//! An [`ArtifactStore`] fetches named text artifacts (policies, schemas) from
//! a key-value blob store. A missing object is `Ok(None)`, never an error;
//! transport and store failures are [`StoreError`]s carrying the cause.
//!
//! Three implementations are provided:
//!
//! - [`InMemoryArtifactStore`]: process-local map, records every fetch
//! - [`FileArtifactStore`]: `{root}/{location}/{key}` on the local filesystem
//! - [`HttpArtifactStore`]: path-style object GET over HTTP

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::{StoreError, StoreResult};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A key-value blob store holding text artifacts.
pub trait ArtifactStore: Send + Sync + std::fmt::Debug {
    /// Fetch the artifact stored under `key` in `location`.
    ///
    /// Returns `Ok(None)` when the store has no such object.
    fn fetch<'a>(&'a self, key: &'a str, location: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>>;
}

fn validate_key(key: &str, location: &str) -> StoreResult<()> {
    if key.is_empty() || location.is_empty() {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
            location: location.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum StoredObject {
    Content(String),
    Failure(String),
}

/// A fetch recorded by [`InMemoryArtifactStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    /// Requested key.
    pub key: String,
    /// Requested location.
    pub location: String,
}

/// In-process artifact store.
///
/// Objects can be scripted to fail, and every fetch is recorded so callers
/// can assert on fetch order.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl InMemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an artifact.
    pub fn insert(&self, location: impl Into<String>, key: impl Into<String>, content: impl Into<String>) {
        self.objects
            .lock()
            .insert((location.into(), key.into()), StoredObject::Content(content.into()));
    }

    /// Make fetches of an artifact fail with a transport error.
    pub fn fail(&self, location: impl Into<String>, key: impl Into<String>, message: impl Into<String>) {
        self.objects
            .lock()
            .insert((location.into(), key.into()), StoredObject::Failure(message.into()));
    }

    /// Remove an artifact so it reads as absent.
    pub fn remove(&self, location: &str, key: &str) {
        self.objects
            .lock()
            .remove(&(location.to_string(), key.to_string()));
    }

    /// All fetches so far, in call order.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    /// Forget recorded fetches.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn fetch<'a>(&'a self, key: &'a str, location: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            validate_key(key, location)?;
            self.calls.lock().push(FetchCall {
                key: key.to_string(),
                location: location.to_string(),
            });

            let object = self
                .objects
                .lock()
                .get(&(location.to_string(), key.to_string()))
                .cloned();

            match object {
                Some(StoredObject::Content(content)) => Ok(Some(content)),
                Some(StoredObject::Failure(message)) => {
                    Err(StoreError::transport(location, key, message))
                }
                None => Ok(None),
            }
        })
    }
}

/// Artifact store backed by a directory tree.
///
/// The artifact `key` in `location` is read from `{root}/{location}/{key}`.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str, location: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(location).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                location: location.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn fetch<'a>(&'a self, key: &'a str, location: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            validate_key(key, location)?;
            let path = self.object_path(key, location)?;
            debug!(path = %path.display(), "reading artifact");

            match tokio::fs::read_to_string(&path).await {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(source) => {
                    error!(path = %path.display(), error = %source, "failed to read artifact");
                    Err(StoreError::Io { path, source })
                }
            }
        })
    }
}

/// Artifact store reached over HTTP with path-style addressing.
///
/// The artifact `key` in `location` is fetched with
/// `GET {endpoint}/{location}/{key}`. A `404` reads as absent.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpArtifactStore {
    /// Create a store for the given endpoint (e.g. `https://s3.eu-west-2.amazonaws.com`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Create a store that uses a preconfigured client.
    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// URL of an artifact.
    pub fn object_url(&self, key: &str, location: &str) -> String {
        format!("{}/{}/{}", self.endpoint, location, key.trim_start_matches('/'))
    }
}

impl ArtifactStore for HttpArtifactStore {
    fn fetch<'a>(&'a self, key: &'a str, location: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            validate_key(key, location)?;
            let url = self.object_url(key, location);
            debug!(url = %url, "fetching artifact");

            let response = self.client.get(&url).send().await.map_err(|e| {
                error!(key, location, error = %e, "failed to retrieve artifact");
                StoreError::transport(location, key, e)
            })?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                error!(key, location, status = status.as_u16(), "store rejected artifact request");
                return Err(StoreError::Status {
                    location: location.to_string(),
                    key: key.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| StoreError::transport(location, key, e))?;
            Ok(Some(body))
        })
    }
}
