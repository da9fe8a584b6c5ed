//! Cache Module
//!
//! Provides the in-memory eviction core: LRU ordering, TTL expiration and
//! access metrics.

mod entry;
mod lru;
mod stats;
mod store;
mod value;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruList;
pub use stats::CacheMetrics;
pub use store::MemoryCache;
pub use value::{CacheValue, ValueKind};
