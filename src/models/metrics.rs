//! Read-only metric snapshots.

use serde::Serialize;

use crate::cache::CacheMetrics;

/// Snapshot of the HTTP response cache's memory tier.
#[derive(Debug, Clone, Serialize)]
pub struct HttpCacheStats {
    /// Responses currently held in memory
    pub size: usize,
    /// Cache keys, most recently used first
    pub keys: Vec<String>,
    pub metrics: CacheMetrics,
}

/// Aggregate snapshot returned by the cache manager.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerMetrics {
    pub memory: CacheMetrics,
    pub memory_size: usize,
    pub http: HttpCacheStats,
    /// Name of the active strategy
    pub strategy: String,
}
