//! Adaptive Strategy
//!
//! Tracks per-key access frequency and recency and flags keys that are
//! both rarely and not recently used.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::{CacheEntry, CacheValue};
use crate::strategy::Strategy;

/// Per-key access statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessStats {
    pub count: u64,
    pub last_access: u64,
}

// == Adaptive Strategy ==
/// Evicts keys accessed fewer than `threshold` times whose last access is
/// older than `window`. Keys with no statistics are always evictable.
///
/// Clones share the same statistics table.
#[derive(Debug, Clone)]
pub struct AdaptiveStrategy {
    pub threshold: u64,
    pub window: Duration,
    stats: Arc<Mutex<HashMap<String, AccessStats>>>,
}

impl Default for AdaptiveStrategy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5 * 60))
    }
}

impl AdaptiveStrategy {
    pub fn new(threshold: u64, window: Duration) -> Self {
        Self {
            threshold,
            window,
            stats: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Statistics recorded for `key`, if any.
    pub fn stats_for(&self, key: &str) -> Option<AccessStats> {
        self.stats.lock().get(key).copied()
    }

    /// Drops statistics for a key that left the cache.
    pub fn forget(&self, key: &str) {
        self.stats.lock().remove(key);
    }

    pub fn tracked_keys(&self) -> usize {
        self.stats.lock().len()
    }

    pub fn reset(&self) {
        self.stats.lock().clear();
    }
}

impl Strategy for AdaptiveStrategy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn should_cache<V: CacheValue>(&self, _key: &str, _data: &V) -> bool {
        true
    }

    fn should_evict<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool {
        match self.stats.lock().get(&entry.key) {
            Some(stats) => {
                stats.count < self.threshold
                    && now_ms.saturating_sub(stats.last_access) > self.window.as_millis() as u64
            }
            None => true,
        }
    }

    fn on_access<V>(&self, entry: &CacheEntry<V>, now_ms: u64) {
        let mut stats = self.stats.lock();
        let record = stats.entry(entry.key.clone()).or_insert(AccessStats {
            count: 0,
            last_access: now_ms,
        });
        record.count += 1;
        record.last_access = now_ms;
    }

    fn on_remove(&self, key: &str) {
        self.forget(key);
    }

    fn on_clear(&self) {
        self.reset();
    }
}
