//! Data Models Module
//!
//! Option, input and snapshot types used by the cache manager.

pub mod metrics;
pub mod options;

pub use metrics::{HttpCacheStats, ManagerMetrics};
pub use options::{KeyPattern, SetOptions, StorageTier, WarmupEntry};
