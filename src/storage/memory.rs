//! In-process backing store, alive for as long as the process.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::storage::{KeyValueStore, StoreResult};

// == Memory Store ==
/// HashMap-backed store with an optional byte quota.
///
/// The quota counts key and value lengths of every stored pair.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that refuses writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let mut entries = self.entries.write();
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
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.entries.write().clear();
        Ok(())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryStore::new();

        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.len().await.unwrap(), 2);

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let store = MemoryStore::with_quota(10);

        store.set("k1", "12345".to_string()).await.unwrap();
        let result = store.set("k2", "12345".to_string()).await;
        assert!(matches!(result, Err(StoreError::QuotaExceeded)));

        // Overwriting an existing key only counts the new value
        store.set("k1", "12345678".to_string()).await.unwrap();
        assert_eq!(store.used_bytes(), 10);
    }
}
