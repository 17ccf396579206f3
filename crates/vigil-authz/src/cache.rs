//! Service caching.
//!
//! [`ServiceCache`] holds the single live [`AuthorizationService`]. The warm
//! path hands out the cached `Arc` without I/O; a refresh (or the first
//! call) loads a fresh bundle and swaps in a new service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::bundle::BundleLoader;
use crate::config::{AuthorizationConfig, ServiceConfig};
use crate::engine::DecisionEngine;
use crate::error::AuthzResult;
use crate::service::AuthorizationService;
use crate::store::ArtifactStore;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the cached instance.
    pub hits: u64,
    /// Bundles loaded and installed.
    pub loads: u64,
    /// Loads that failed and left the cache untouched.
    pub failed_loads: u64,
}

/// Holds the current authorization service.
///
/// Concurrent refreshes are not coalesced: each one loads its own bundle
/// and the last to finish wins. Readers always see a complete service.
#[derive(Debug)]
pub struct ServiceCache {
    loader: BundleLoader,
    engine: Arc<dyn DecisionEngine>,
    current: RwLock<Option<Arc<AuthorizationService>>>,
    hits: AtomicU64,
    loads: AtomicU64,
    failed_loads: AtomicU64,
}

impl ServiceCache {
    /// Create an empty cache loading bundles from `store`.
    pub fn new(store: Arc<dyn ArtifactStore>, engine: Arc<dyn DecisionEngine>) -> Self {
        Self {
            loader: BundleLoader::new(store),
            engine,
            current: RwLock::new(None),
            hits: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            failed_loads: AtomicU64::new(0),
        }
    }

    /// Get the service, loading it when nothing is cached or `refresh` is set.
    ///
    /// A cached instance is returned as-is even if it was built for a
    /// different configuration. A failed load returns the error and keeps
    /// the previous instance.
    #[instrument(skip_all, fields(service = %service.service_name, refresh = refresh))]
    pub async fn get_service(
        &self,
        config: &AuthorizationConfig,
        service: &ServiceConfig,
        refresh: bool,
    ) -> AuthzResult<Arc<AuthorizationService>> {
        if !refresh {
            if let Some(cached) = self.current() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("returning cached authorization service");
                return Ok(cached);
            }
        }

        let bundle = match self.loader.load(service).await {
            Ok(bundle) => bundle,
            Err(e) => {
                self.failed_loads.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "policy bundle load failed; keeping previous service");
                return Err(e);
            }
        };

        let loaded = Arc::new(AuthorizationService::new(
            config.clone(),
            bundle,
            Arc::clone(&self.engine),
        ));
        *self.current.write() = Some(Arc::clone(&loaded));
        self.loads.fetch_add(1, Ordering::Relaxed);
        info!(
            location = %loaded.bundle().location,
            loaded_at = %loaded.bundle().loaded_at.to_rfc3339(),
            "authorization service installed"
        );

        Ok(loaded)
    }

    /// The cached service, if any.
    pub fn current(&self) -> Option<Arc<AuthorizationService>> {
        self.current.read().clone()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            failed_loads: self.failed_loads.load(Ordering::Relaxed),
        }
    }
}
