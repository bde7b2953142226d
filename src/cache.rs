use async_trait::async_trait;
use bytes::Bytes;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{BriefError, Result};

/// Key-value storage for serialized records
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get cached content by key
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store content only if `key` is free
    ///
    /// Returns `false`, leaving the stored value untouched, when the key is
    /// already taken. The check and the write are one atomic step.
    async fn insert_if_absent(&self, key: &str, value: Bytes) -> Result<bool>;

    /// Check if a key exists in the cache
    async fn contains(&self, key: &str) -> bool;

    /// Remove a key from the cache
    async fn remove(&self, key: &str) -> Result<()>;

    /// Clear all cached content
    async fn clear(&self) -> Result<()>;
}

/// In-memory cache implementation
pub struct MemoryCache {
    store: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let store = self.store.read().await;
        Ok(store.get(key).cloned())
    }

    async fn insert_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        let mut store = self.store.write().await;
        match store.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn contains(&self, key: &str) -> bool {
        let store = self.store.read().await;
        store.contains_key(key)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut store = self.store.write().await;
        store.clear();
        Ok(())
    }
}

/// Disk-based cache implementation
///
/// Each key maps to one file named after the SHA-256 of the key.
pub struct DiskCache {
    root_dir: PathBuf,
}

impl DiskCache {
    /// Create a new disk cache at the specified directory
    pub async fn new(root_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root_dir).await?;
        Ok(Self { root_dir })
    }

    /// Convert a cache key to a safe file path
    fn key_to_path(&self, key: &str) -> PathBuf {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash_str = format!("{:x}", hasher.finalize());

        self.root_dir.join(&hash_str[..2]).join(&hash_str[2..])
    }

    async fn discard_staging(staging: &Path) {
        match fs::remove_file(staging).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %staging.display(), error = %e, "failed to remove cache staging file"),
        }
    }

    fn cache_error(action: &str, e: std::io::Error) -> BriefError {
        BriefError::Cache {
            message: format!("Failed to {} disk cache: {}", action, e),
        }
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.key_to_path(key);

        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::cache_error("read from", e)),
        }
    }

    async fn insert_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        let path = self.key_to_path(key);
        let parent = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => self.root_dir.clone(),
        };
        fs::create_dir_all(&parent).await?;

        // Write the payload aside, then link it into place; linking fails
        // when the target exists
        let staging = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&staging, &value).await {
            Self::discard_staging(&staging).await;
            return Err(Self::cache_error("write to", e));
        }

        let linked = fs::hard_link(&staging, &path).await;
        Self::discard_staging(&staging).await;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Self::cache_error("write to", e)),
        }
    }

    async fn contains(&self, key: &str) -> bool {
        let path = self.key_to_path(key);
        fs::try_exists(&path).await.unwrap_or(false)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::cache_error("remove from", e)),
        }
    }

    async fn clear(&self) -> Result<()> {
        fs::remove_dir_all(&self.root_dir).await?;
        fs::create_dir_all(&self.root_dir).await?;
        Ok(())
    }
}

/// No-op cache that doesn't cache anything
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
        Ok(None)
    }

    async fn insert_if_absent(&self, _key: &str, _value: Bytes) -> Result<bool> {
        Ok(true)
    }

    async fn contains(&self, _key: &str) -> bool {
        false
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryCache::new();
        let key = "test_key";
        let value = Bytes::from("test_value");

        assert!(!cache.contains(key).await);
        assert!(cache.get(key).await.unwrap().is_none());

        assert!(cache.insert_if_absent(key, value.clone()).await.unwrap());
        assert!(cache.contains(key).await);
        assert_eq!(cache.get(key).await.unwrap().unwrap(), value);

        cache.remove(key).await.unwrap();
        assert!(!cache.contains(key).await);

        cache.insert_if_absent("key1", Bytes::from("val1")).await.unwrap();
        cache.insert_if_absent("key2", Bytes::from("val2")).await.unwrap();
        assert_eq!(cache.len().await, 2);
        cache.clear().await.unwrap();
        assert!(!cache.contains("key1").await);
        assert!(!cache.contains("key2").await);
    }

    #[tokio::test]
    async fn test_memory_insert_if_absent_keeps_first_value() {
        let cache = MemoryCache::new();
        assert!(cache.insert_if_absent("k", Bytes::from("first")).await.unwrap());
        assert!(!cache.insert_if_absent("k", Bytes::from("second")).await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().unwrap(), Bytes::from("first"));
    }

    #[tokio::test]
    async fn test_disk_insert_if_absent_keeps_first_value() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf()).await.unwrap();

        assert!(cache.insert_if_absent("k", Bytes::from("first")).await.unwrap());
        assert!(!cache.insert_if_absent("k", Bytes::from("second")).await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().unwrap(), Bytes::from("first"));
        assert!(cache.contains("k").await);

        cache.remove("k").await.unwrap();
        assert!(!cache.contains("k").await);
        assert!(cache.insert_if_absent("k", Bytes::from("third")).await.unwrap());
    }

    async fn staging_files(root: &Path) -> Vec<String> {
        let mut found = Vec::new();
        let mut shards = fs::read_dir(root).await.unwrap();
        while let Some(shard) = shards.next_entry().await.unwrap() {
            let mut files = fs::read_dir(shard.path()).await.unwrap();
            while let Some(file) = files.next_entry().await.unwrap() {
                let name = file.file_name().to_string_lossy().into_owned();
                if name.ends_with(".tmp") {
                    found.push(name);
                }
            }
        }
        found
    }

    #[tokio::test]
    async fn test_disk_insert_leaves_no_staging_files() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf()).await.unwrap();

        cache.insert_if_absent("k", Bytes::from("first")).await.unwrap();
        cache.insert_if_absent("k", Bytes::from("second")).await.unwrap();
        assert!(staging_files(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_disk_clear() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf()).await.unwrap();
        cache.insert_if_absent("a", Bytes::from("1")).await.unwrap();
        cache.insert_if_absent("b", Bytes::from("2")).await.unwrap();

        cache.clear().await.unwrap();
        assert!(!cache.contains("a").await);
        assert!(cache.insert_if_absent("b", Bytes::from("3")).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_cache_never_stores() {
        let cache = NoCache;
        assert!(cache.insert_if_absent("k", Bytes::from("v")).await.unwrap());
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(!cache.contains("k").await);
    }
}
