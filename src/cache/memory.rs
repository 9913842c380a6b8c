//! In-memory LRU cache with a TTL bound
//!
//! Entries are evicted when they are the least recently used one and the store is
//! full, or lazily when a lookup finds them older than the TTL.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use super::{CacheBackend, CacheEntry};
use crate::error::{BackendError, SetupError};
use crate::fingerprint::CacheKey;

/// Process-wide in-memory store used in the server role
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCache {
    /// Creates a store bounded to `capacity` entries, each valid for `ttl`
    pub fn new(capacity: usize, ttl: std::time::Duration) -> Result<Self, SetupError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(SetupError::ZeroCapacity)?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: chrono_ttl(ttl),
        })
    }

    /// Number of entries currently held, fresh or not
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<CacheKey, CacheEntry>>, BackendError> {
        self.entries.lock().map_err(|_| BackendError::Poisoned)
    }
}

/// Converts a std duration into a chrono one, saturating on overflow
pub(crate) fn chrono_ttl(ttl: std::time::Duration) -> Duration {
    Duration::from_std(ttl).unwrap_or(Duration::MAX)
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn has(&self, key: &CacheKey) -> Result<bool, BackendError> {
        let mut entries = self.lock()?;
        let fresh = match entries.peek(key) {
            Some(entry) => entry.is_fresh(Utc::now(), self.ttl),
            None => return Ok(false),
        };
        if !fresh {
            entries.pop(key);
        }
        Ok(fresh)
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, BackendError> {
        let mut entries = self.lock()?;
        let found = match entries.get(key) {
            Some(entry) if entry.is_fresh(Utc::now(), self.ttl) => Some(entry.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if found.is_none() {
            entries.pop(key);
        }
        Ok(found)
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), BackendError> {
        self.lock()?.put(key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), BackendError> {
        self.lock()?.pop(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.lock()?.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
