//! Caching layer for stop detail lookups.
//!
//! The configuration wizard asks for the same stop's routes twice in a row
//! (route step, then destination step). Stop details change rarely, so
//! successful lookups are kept for a short TTL. Departures are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{ApiKey, GtfsId, StopDetail};

/// Cache key: details are only shared between callers using the same key.
type DetailKey = (ApiKey, GtfsId);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 256,
        }
    }
}

/// Cache of stop details, keyed by (API key, stop id).
#[derive(Clone)]
pub struct StopDetailCache {
    details: MokaCache<DetailKey, Arc<StopDetail>>,
}

impl StopDetailCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let details = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { details }
    }

    /// Get a cached stop detail.
    pub async fn get(&self, api_key: &ApiKey, stop: &GtfsId) -> Option<Arc<StopDetail>> {
        self.details.get(&(api_key.clone(), stop.clone())).await
    }

    /// Insert a stop detail into the cache.
    pub async fn insert(&self, api_key: &ApiKey, detail: Arc<StopDetail>) {
        let key = (api_key.clone(), detail.stop.gtfs_id.clone());
        self.details.insert(key, detail).await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.details.invalidate_all();
    }
}
