//! Tiered Cache - A multi-tier in-process cache
//!
//! Provides an LRU+TTL memory tier, namespaced durable tiers, an HTTP
//! response cache and pluggable admission/eviction strategies behind one
//! façade.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod models;
pub mod storage;
pub mod strategy;
pub mod tasks;

pub use cache::{CacheEntry, CacheMetrics, CacheValue, MemoryCache, ValueKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, HttpCacheConfig};
pub use error::{CacheError, Result, StoreError};
pub use http::{HttpCache, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use manager::{CacheManager, CacheManagerBuilder};
pub use models::{KeyPattern, ManagerMetrics, SetOptions, StorageTier, WarmupEntry};
pub use storage::{DurableStorage, FileStore, KeyValueStore, MemoryStore};
pub use strategy::{CacheStrategy, Strategy, StrategyKind};
pub use tasks::{spawn_sweep_task, Sweep};
