//! Persistent cache backed by JSON files
//!
//! Each entry lives in `<cache_dir>/<sha256(key)>.json`; hashing keeps file names
//! short no matter how large the request body behind the key is. Files never expire
//! on their own: freshness is recomputed from `cached_at` on every lookup. A hit
//! refreshes the file's modification time, and when the number of files exceeds the
//! configured capacity the least recently used ones are removed.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::fs;

use super::memory::chrono_ttl;
use super::{CacheBackend, CacheEntry};
use crate::error::{BackendError, SetupError};
use crate::fingerprint::CacheKey;

const ENTRY_EXTENSION: &str = "json";

/// Distinguishes temporary files of concurrent writes
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Persistent store used in the client role
///
/// Stores entries in an XDG-compliant cache directory (`~/.cache/warmfetch/` on
/// Linux) unless a directory is given explicitly.
#[derive(Debug, Clone)]
pub struct DiskCache {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    capacity: usize,
    ttl: Duration,
}

impl DiskCache {
    /// Creates a store in the platform cache directory
    pub fn new(capacity: usize, ttl: std::time::Duration) -> Result<Self, SetupError> {
        let project_dirs = ProjectDirs::from("", "", "warmfetch").ok_or(SetupError::NoCacheDir)?;
        Self::with_dir(project_dirs.cache_dir().to_path_buf(), capacity, ttl)
    }

    /// Creates a store in the given directory
    pub fn with_dir(
        cache_dir: PathBuf,
        capacity: usize,
        ttl: std::time::Duration,
    ) -> Result<Self, SetupError> {
        if capacity == 0 {
            return Err(SetupError::ZeroCapacity);
        }
        Ok(Self {
            cache_dir,
            capacity,
            ttl: chrono_ttl(ttl),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the file for the given key
    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(entry_file_name(key))
    }

    /// Reads an entry regardless of its age
    async fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, BackendError> {
        let content = match fs::read_to_string(self.entry_path(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Lists entry files with their modification times
    async fn entry_files(&self) -> Result<Vec<(SystemTime, PathBuf)>, BackendError> {
        let mut files = Vec::new();
        let mut dir = match fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let modified = item
                .metadata()
                .await?
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, path));
        }
        Ok(files)
    }

    /// Removes the least recently used files until the store is within capacity
    async fn enforce_capacity(&self) -> Result<(), BackendError> {
        let mut files = self.entry_files().await?;
        if files.len() <= self.capacity {
            return Ok(());
        }
        files.sort();
        let excess = files.len() - self.capacity;
        for (_, path) in files.into_iter().take(excess) {
            tracing::debug!(path = %path.display(), "evicting cache file");
            remove_if_exists(&path).await?;
        }
        Ok(())
    }
}

/// File name for a key: hex SHA-256, well under the usual 255-byte limit
fn entry_file_name(key: &CacheKey) -> String {
    let digest = Sha256::digest(key.as_str().as_bytes());
    format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION)
}

/// Marks a file as just used by bumping its modification time
async fn touch(path: PathBuf) {
    let result = tokio::task::spawn_blocking(move || {
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)?
            .set_modified(SystemTime::now())
    })
    .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "could not refresh cache file recency"),
        Err(e) => tracing::debug!(error = %e, "recency update task failed"),
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), BackendError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl CacheBackend for DiskCache {
    async fn has(&self, key: &CacheKey) -> Result<bool, BackendError> {
        Ok(self
            .read_entry(key)
            .await?
            .is_some_and(|entry| entry.is_fresh(Utc::now(), self.ttl)))
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, BackendError> {
        let entry = self
            .read_entry(key)
            .await?
            .filter(|entry| entry.is_fresh(Utc::now(), self.ttl));
        if entry.is_some() {
            touch(self.entry_path(key)).await;
        }
        Ok(entry)
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), BackendError> {
        fs::create_dir_all(&self.cache_dir).await?;
        let json = serde_json::to_string_pretty(&entry)?;

        // Write then rename so readers never observe a partial file
        let path = self.entry_path(key);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        self.enforce_capacity().await
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), BackendError> {
        remove_if_exists(&self.entry_path(key)).await
    }

    async fn clear(&self) -> Result<(), BackendError> {
        for (_, path) in self.entry_files().await? {
            remove_if_exists(&path).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
