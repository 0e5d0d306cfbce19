//! Proxy pool cache and selection.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{info, warn};
use parking_lot::RwLock;
use rand::Rng;

use crate::blacklist::Blacklist;
use crate::source::ProxySource;

struct CachedPool {
    bucket: u64,
    endpoints: Arc<Vec<String>>,
}

/// Cached list of proxy endpoints, fetched at most once per time bucket.
///
/// Freshness is keyed by the wall-clock bucket (unix seconds divided by the
/// window) instead of an explicit timer: every read within one bucket sees
/// the same list, and the first read of a new bucket replaces it wholesale.
/// An empty fetch result is cached like any other so a dead source is not
/// hammered for the rest of its window.
///
/// Concurrent readers racing into a stale bucket may both fetch; the later
/// write wins. The lock is only ever held around the pointer swap, never
/// across the fetch.
pub struct ProxyPool {
    source: Box<dyn ProxySource>,
    blacklist: Arc<Blacklist>,
    window: Duration,
    cached: RwLock<Option<CachedPool>>,
}

impl ProxyPool {
    pub fn new(source: Box<dyn ProxySource>, blacklist: Arc<Blacklist>, window: Duration) -> Self {
        Self {
            source,
            blacklist,
            window,
            cached: RwLock::new(None),
        }
    }

    /// Bucket index for the current wall-clock time.
    pub fn current_bucket(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        now.as_secs() / self.window.as_secs().max(1)
    }

    /// Proxy list for the current bucket, fetching if stale.
    pub async fn endpoints(&self) -> Arc<Vec<String>> {
        self.endpoints_for_bucket(self.current_bucket()).await
    }

    /// Proxy list for `bucket`: a cache hit when the stored list carries the
    /// same bucket (even an empty one), otherwise one fetch replaces the
    /// stored list.
    pub async fn endpoints_for_bucket(&self, bucket: u64) -> Arc<Vec<String>> {
        if let Some(cached) = self.cached.read().as_ref() {
            if cached.bucket == bucket {
                return Arc::clone(&cached.endpoints);
            }
        }

        let endpoints = Arc::new(self.fetch_filtered().await);
        *self.cached.write() = Some(CachedPool {
            bucket,
            endpoints: Arc::clone(&endpoints),
        });
        endpoints
    }

    /// Drop the cached list so the next read re-fetches regardless of bucket.
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }

    /// Force a fetch now and return the new pool size.
    pub async fn refresh(&self) -> usize {
        self.invalidate();
        self.endpoints().await.len()
    }

    /// One endpoint chosen uniformly at random from the non-blacklisted
    /// subset of `endpoints`, or `None` when no viable proxy remains and the
    /// caller should go direct. Selection is memoryless: consecutive picks
    /// may return the same endpoint.
    pub fn pick(&self, endpoints: &[String]) -> Option<String> {
        let viable: Vec<&String> = endpoints
            .iter()
            .filter(|endpoint| !self.blacklist.contains(endpoint))
            .collect();
        if viable.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..viable.len());
        Some(viable[idx].clone())
    }

    async fn fetch_filtered(&self) -> Vec<String> {
        let raw = match self.source.fetch().await {
            Ok(list) => list,
            Err(err) => {
                warn!("Proxy list fetch failed, continuing with empty pool: {err:#}");
                return Vec::new();
            }
        };

        let total = raw.len();
        let endpoints: Vec<String> = raw
            .into_iter()
            .filter(|endpoint| !self.blacklist.contains(endpoint))
            .collect();
        info!(
            "Fetched {} proxies ({} excluded as blacklisted)",
            endpoints.len(),
            total - endpoints.len()
        );
        endpoints
    }
}
