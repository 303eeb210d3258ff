//! Key-value caches with a time-to-live
//!
//! The freshness tracker only needs `get`/`put`; expiry is enforced here.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// Roughly a century; keeps the expiry timestamp representable
const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 3600;

/// String cache with per-entry expiry
pub trait Cache {
    /// Value stored under `key`, unless missing or expired
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` for `ttl_seconds`
    fn put(&mut self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
}

/// A cached value and the moment it stops being served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(value: &str, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(MAX_TTL_SECS).min(MAX_TTL_SECS);
        let ttl = Duration::seconds(ttl);
        Self {
            value: value.to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Process-local cache
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|e| e.is_live(Utc::now()))
            .map(|e| e.value.clone())
    }

    fn put(&mut self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl_seconds));
        Ok(())
    }
}

/// Cache persisted as a JSON file, rewritten on every `put`
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl FileCache {
    /// Load the cache file, or start empty if it does not exist yet
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                entries: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let entries = serde_json::from_str(&content).map_err(Error::Json)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Drop expired entries and write the file
    pub fn save(&mut self) -> Result<()> {
        let now = Utc::now();
        self.entries.retain(|_, e| e.is_live(now));
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|e| e.is_live(Utc::now()))
            .map(|e| e.value.clone())
    }

    fn put(&mut self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl_seconds));
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_get_put() {
        let mut cache = MemoryCache::new();
        assert_eq!(cache.get("k"), None);

        cache.put("k", "v", 3600).unwrap();
        assert_eq!(cache.get("k"), Some("v".to_string()));

        cache.put("k", "w", 3600).unwrap();
        assert_eq!(cache.get("k"), Some("w".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let mut cache = MemoryCache::new();
        cache.put("k", "v", 0).unwrap();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_file_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = FileCache::load(&path).unwrap();
        cache.put("guilds", "abc", 3600).unwrap();
        cache.put("stale", "old", 0).unwrap();

        let reloaded = FileCache::load(&path).unwrap();
        assert_eq!(reloaded.get("guilds"), Some("abc".to_string()));
        assert_eq!(reloaded.get("stale"), None);
    }

    #[test]
    fn test_file_cache_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(FileCache::load(&path), Err(Error::Json(_))));
    }
}
