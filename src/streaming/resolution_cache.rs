//! TTL cache for manifest resolution results
//!
//! Keyed by the original (unresolved) URL. Expiry is checked lazily on read:
//! there is no background sweep, a stale entry is evicted the next time its
//! key is looked up and overwritten by the following successful resolution.
//!
//! Time is read from `tokio::time::Instant`, so tests running with a paused
//! clock can step past the TTL deterministically.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::manifest::ResolutionResult;
use crate::config::defaults::DEFAULT_RESOLUTION_CACHE_TTL;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ResolutionResult,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResolutionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION_CACHE_TTL)
    }
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `url`, flagged as cached. Stale entries are evicted.
    pub fn get(&self, url: &str) -> Option<ResolutionResult> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(url) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                let mut result = entry.result.clone();
                result.cached = true;
                Some(result)
            }
            Some(_) => {
                debug!("Resolution cache entry expired for {}", url);
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, url: &str, result: ResolutionResult) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            url.to_string(),
            CacheEntry {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, including ones not yet found stale
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}
