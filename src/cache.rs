//! File-based cache with a time-to-live.
//!
//! Each entry is a JSON file named after the SHA-256 of its key:
//!
//! ```text
//! .cache/
//! └── 3f1c...e9.json   {"cached_at": "2025-05-06T10:00:00+07:00", "content": ...}
//! ```
//!
//! Reads never fail: a missing, expired or corrupt entry is simply a miss.
//! Expired entries are deleted on read.

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct StoredEntry<T> {
    cached_at: DateTime<Local>,
    content: T,
}

#[derive(Serialize)]
struct NewEntry<'a, T> {
    cached_at: DateTime<Local>,
    content: &'a T,
}

#[derive(Debug, Clone)]
pub struct CacheManager {
    dir: PathBuf,
    ttl: Duration,
}

impl CacheManager {
    /// Open (and create if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{hash:x}.json"))
    }

    /// Fetch a live entry.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);
        let raw = fs::read(&path).await.ok()?;
        let entry: StoredEntry<T> = match serde_json::from_slice(&raw) {
            Ok(e) => e,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring unreadable cache entry");
                return None;
            }
        };

        let age = Local::now().signed_duration_since(entry.cached_at);
        let expired = age.to_std().map(|age| age > self.ttl).unwrap_or(false);
        if expired {
            debug!(key, "Cache entry expired");
            let _ = fs::remove_file(&path).await;
            return None;
        }
        debug!(key, "Cache hit");
        Some(entry.content)
    }

    /// Store a value stamped with the current time. Failures are logged only.
    pub async fn set<T: Serialize>(&self, key: &str, content: &T) {
        let path = self.entry_path(key);
        let entry = NewEntry {
            cached_at: Local::now(),
            content,
        };
        let bytes = match serde_json::to_vec(&entry) {
            Ok(b) => b,
            Err(e) => {
                warn!(key, error = %e, "Could not serialize cache entry");
                return;
            }
        };
        if let Err(e) = fs::write(&path, bytes).await {
            warn!(path = %path.display(), error = %e, "Could not write cache entry");
        }
    }

    /// Remove every cached entry, returning how many were deleted.
    pub async fn clear(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        debug!(removed, "Cache cleared");
        Ok(removed)
    }
}
