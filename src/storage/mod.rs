//! Storage Module
//!
//! Durable tiers: a minimal async key-value contract for backing stores,
//! two stores implementing it, and the envelope-based adapter the cache
//! tiers talk to.

mod durable;
mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;

pub use durable::{DurableStorage, Envelope};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Result type for backing stores.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Key Value Store ==
/// Raw string key-value store underneath a durable tier.
///
/// Implementations know nothing about namespaces, envelopes or expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    async fn remove(&self, key: &str) -> StoreResult<()>;

    async fn keys(&self) -> StoreResult<Vec<String>>;

    async fn clear(&self) -> StoreResult<()>;

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.keys().await?.len())
    }

    /// Whether the store can be used in the current context.
    fn is_available(&self) -> bool {
        true
    }
}
