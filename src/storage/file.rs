//! File-backed store that survives process restarts.
//!
//! The whole map is kept in memory and rewritten to a single JSON file on
//! every mutation (temp file + rename).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::storage::{KeyValueStore, StoreResult};

// == File Store ==
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl FileStore {
    /// Opens the store at `path`, loading existing contents if the file
    /// exists. Parent directories are created as needed.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let entries: HashMap<String, String> = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!("Opened file store at {} with {} keys", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota_bytes: None,
        })
    }

    /// Refuses writes that would push stored bytes past `quota_bytes`.
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        let contents = serde_json::to_string(entries)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        let previous = entries.insert(key.to_string(), value);
        if let Err(err) = self.persist(&entries).await {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.persist(&entries).await
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.lock().await.len())
    }
}
