//! Cache backends for fetched payloads
//!
//! Two implementations sit behind the [`CacheBackend`] trait: an in-memory LRU store
//! with a TTL bound (server role) and a persistent store of JSON files (client role).
//! Both treat an entry as valid only while `now - cached_at < ttl`.

mod disk;
mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;
use crate::fingerprint::CacheKey;

/// A cached payload and the time it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The response body as received from the remote
    pub payload: Value,
    /// When the entry was stamped for writing
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time
    pub fn new(payload: Value) -> Self {
        Self::stamped(payload, Utc::now())
    }

    /// Creates an entry with an explicit timestamp
    pub fn stamped(payload: Value, cached_at: DateTime<Utc>) -> Self {
        Self { payload, cached_at }
    }

    /// Whether the entry is still within `ttl` at time `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at < ttl
    }
}

/// Key/value store for cached payloads
///
/// Implementations must be safe to call concurrently; concurrent writes to the
/// same key resolve last-writer-wins.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// True only if an entry exists and has not outlived the TTL
    async fn has(&self, key: &CacheKey) -> Result<bool, BackendError>;

    /// Returns the entry if `has` would be true; never returns a stale entry
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, BackendError>;

    /// Stores an entry, replacing any existing one
    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), BackendError>;

    /// Removes an entry if present
    async fn remove(&self, key: &CacheKey) -> Result<(), BackendError>;

    /// Removes every entry
    async fn clear(&self) -> Result<(), BackendError>;

    /// Short backend name for log output
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_fresh_before_ttl() {
        let now = Utc::now();
        let entry = CacheEntry::stamped(json!(1), now - Duration::minutes(29));
        assert!(entry.is_fresh(now, Duration::minutes(30)));
    }

    #[test]
    fn test_entry_stale_at_ttl_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::stamped(json!(1), now - Duration::minutes(30));
        assert!(!entry.is_fresh(now, Duration::minutes(30)));
    }

    #[test]
    fn test_entry_serializes_timestamp() {
        let entry = CacheEntry::new(json!({"data": [1, 2]}));
        let encoded = serde_json::to_string(&entry).unwrap();

        assert!(encoded.contains("\"cached_at\""));
        assert!(encoded.contains("\"payload\""));
    }
}
