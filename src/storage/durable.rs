//! Durable Storage Adapter
//!
//! Namespaced `{data, timestamp, ttl}` envelopes over a backing store.
//! Reads never fail: missing, expired, corrupt and unreachable entries all
//! read as absent. Writes recover from a full store once by sweeping
//! expired envelopes.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{CacheError, Result, StoreError};
use crate::storage::KeyValueStore;

// == Envelope ==
/// Wrapper persisted for every durable entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    /// Write time (Unix milliseconds)
    pub timestamp: u64,
    /// Lifetime in milliseconds, None = no expiry
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl<T> Envelope<T> {
    /// An envelope is gone once `now > timestamp + ttl`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.ttl {
            Some(ttl) => now_ms > self.timestamp.saturating_add(ttl),
            None => false,
        }
    }

    /// Lifetime left at `now_ms`, None if the envelope never expires.
    pub fn remaining(&self, now_ms: u64) -> Option<Duration> {
        self.ttl.map(|ttl| {
            let expires = self.timestamp.saturating_add(ttl);
            Duration::from_millis(expires.saturating_sub(now_ms))
        })
    }
}

// == Durable Storage ==
/// One durable tier: a backing store plus a key prefix.
///
/// Cloning is cheap; clones share the backing store.
#[derive(Clone)]
pub struct DurableStorage {
    store: Option<Arc<dyn KeyValueStore>>,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DurableStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStorage")
            .field("prefix", &self.prefix)
            .field("available", &self.is_available())
            .finish()
    }
}

impl DurableStorage {
    // == Constructor ==
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Some(store),
            prefix: prefix.into(),
            clock,
        }
    }

    /// A tier with no backing store; every operation is a no-op.
    pub fn unavailable(prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: None,
            prefix: prefix.into(),
            clock,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_available(&self) -> bool {
        self.backend().is_some()
    }

    fn backend(&self) -> Option<&Arc<dyn KeyValueStore>> {
        self.store.as_ref().filter(|store| store.is_available())
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Get ==
    /// Reads a live value. Expired envelopes are deleted on the way.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_envelope(key).await.map(|envelope| envelope.data)
    }

    /// Like [`get`](Self::get) but keeps the write time and TTL.
    pub async fn get_envelope<T: DeserializeOwned>(&self, key: &str) -> Option<Envelope<T>> {
        let store = self.backend()?;
        let full_key = self.namespaced(key);

        let raw = match store.get(&full_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("Durable read of '{}' failed: {}", full_key, err);
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("Unreadable envelope at '{}': {}", full_key, err);
                return None;
            }
        };

        if envelope.is_expired(self.clock.now_ms()) {
            if let Err(err) = store.remove(&full_key).await {
                warn!("Failed to drop expired '{}': {}", full_key, err);
            }
            return None;
        }
        Some(envelope)
    }

    // == Set ==
    /// Writes a value. A full store triggers one sweep of expired envelopes
    /// and a single retry; a second failure is returned.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let Some(store) = self.backend() else {
            return Ok(());
        };
        let full_key = self.namespaced(key);
        let envelope = Envelope {
            data: value,
            timestamp: self.clock.now_ms(),
            ttl: ttl.map(|ttl| ttl.as_millis() as u64),
        };
        let raw = serde_json::to_string(&envelope)?;

        match store.set(&full_key, raw.clone()).await {
            Ok(()) => Ok(()),
            Err(StoreError::QuotaExceeded) => {
                let freed = self.cleanup().await;
                debug!("Quota exceeded writing '{}', swept {} expired entries", full_key, freed);
                store.set(&full_key, raw).await.map_err(CacheError::from)
            }
            Err(err) => Err(err.into()),
        }
    }

    // == Remove ==
    pub async fn remove(&self, key: &str) -> Result<()> {
        let Some(store) = self.backend() else {
            return Ok(());
        };
        store.remove(&self.namespaced(key)).await?;
        Ok(())
    }

    // == Clear ==
    /// Removes every key in this namespace, one at a time.
    pub async fn clear(&self) -> Result<()> {
        for key in self.keys().await {
            self.remove(&key).await?;
        }
        Ok(())
    }

    // == Keys ==
    /// Logical keys (prefix stripped) in this namespace, expired or not.
    pub async fn keys(&self) -> Vec<String> {
        let Some(store) = self.backend() else {
            return Vec::new();
        };
        match store.keys().await {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
                .collect(),
            Err(err) => {
                warn!("Listing durable keys under '{}' failed: {}", self.prefix, err);
                Vec::new()
            }
        }
    }

    pub async fn size(&self) -> usize {
        self.keys().await.len()
    }

    // == Cleanup ==
    /// Deletes expired and unreadable envelopes in this namespace.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup(&self) -> usize {
        let Some(store) = self.backend() else {
            return 0;
        };
        let now = self.clock.now_ms();
        let mut removed = 0;

        for key in self.keys().await {
            let full_key = self.namespaced(&key);
            let doomed = match store.get(&full_key).await {
                Ok(Some(raw)) => serde_json::from_str::<Envelope<serde_json::Value>>(&raw)
                    .map_or(true, |envelope| envelope.is_expired(now)),
                Ok(None) => false,
                Err(err) => {
                    warn!("Durable read of '{}' failed during cleanup: {}", full_key, err);
                    false
                }
            };
            if doomed {
                match store.remove(&full_key).await {
                    Ok(()) => removed += 1,
                    Err(err) => warn!("Failed to drop '{}' during cleanup: {}", full_key, err),
                }
            }
        }
        removed
    }
}
