//! File-based key-value store.
//!
//! Each key is written as one JSON file so cached quotes survive restarts
//! even when no Redis instance is available.

use crate::error::{FeedError, Result};
use crate::services::store::KeyValueStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

/// On-disk record. The original key is kept because file names are sanitized.
#[derive(Debug, Serialize, Deserialize)]
struct StoredValue {
    key: String,
    value: String,
    timestamp: i64,
}

/// File-based store rooted at a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| FeedError::Storage(format!("create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '^', '='], "_");
        self.dir.join(format!("{}.json", safe_key))
    }

    async fn read(&self, path: &PathBuf) -> Option<StoredValue> {
        let content = fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!("Failed to parse stored value {:?}: {}", path, e);
                None
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        Ok(self
            .read(&path)
            .await
            .filter(|stored| stored.key == key)
            .map(|stored| stored.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let stored = StoredValue {
            key: key.to_string(),
            value: value.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let content = serde_json::to_string(&stored)?;
        fs::write(self.path_for(key), content)
            .await
            .map_err(|e| FeedError::Storage(format!("write {}: {}", key, e)))?;
        debug!("Persisted {} to disk", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FeedError::Storage(format!("remove {}: {}", key, e))),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| FeedError::Storage(format!("read {}: {}", self.dir.display(), e)))?;

        let mut keys = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stored) = self.read(&path).await {
                keys.push(stored.key);
            }
        }
        Ok(keys)
    }
}
