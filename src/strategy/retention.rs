//! Retention Strategies
//!
//! TTL, LRU and LFU policies. They admit everything and only differ in
//! which resident entries they flag for eviction.

use std::time::Duration;

use crate::cache::{CacheEntry, CacheValue};
use crate::strategy::Strategy;

// == TTL Strategy ==
/// Flags entries whose TTL has elapsed.
///
/// Entries written without a TTL fall back to `fallback_ttl` when one is
/// configured; otherwise they are never flagged.
#[derive(Debug, Clone, Default)]
pub struct TtlStrategy {
    pub fallback_ttl: Option<Duration>,
}

impl TtlStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(ttl: Duration) -> Self {
        Self {
            fallback_ttl: Some(ttl),
        }
    }
}

impl Strategy for TtlStrategy {
    fn name(&self) -> &'static str {
        "ttl"
    }

    fn should_cache<V: CacheValue>(&self, _key: &str, _data: &V) -> bool {
        true
    }

    fn should_evict<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool {
        match (entry.ttl, self.fallback_ttl) {
            (Some(_), _) => entry.is_expired(now_ms),
            (None, Some(fallback)) => entry.age_ms(now_ms) > fallback.as_millis() as u64,
            (None, None) => false,
        }
    }
}

// == LRU Strategy ==
/// Flags entries that have not been read or written for `max_idle`.
#[derive(Debug, Clone)]
pub struct LruStrategy {
    pub max_idle: Duration,
}

impl Default for LruStrategy {
    fn default() -> Self {
        Self {
            max_idle: Duration::from_secs(30 * 60),
        }
    }
}

impl Strategy for LruStrategy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn should_cache<V: CacheValue>(&self, _key: &str, _data: &V) -> bool {
        true
    }

    fn should_evict<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool {
        entry.idle_ms(now_ms) > self.max_idle.as_millis() as u64
    }
}

// == LFU Strategy ==
/// Flags entries older than `min_age` that were accessed fewer than
/// `min_access_count` times since their last write.
#[derive(Debug, Clone)]
pub struct LfuStrategy {
    pub min_access_count: u64,
    pub min_age: Duration,
}

impl Default for LfuStrategy {
    fn default() -> Self {
        Self {
            min_access_count: 2,
            min_age: Duration::from_secs(10 * 60),
        }
    }
}

impl Strategy for LfuStrategy {
    fn name(&self) -> &'static str {
        "lfu"
    }

    fn should_cache<V: CacheValue>(&self, _key: &str, _data: &V) -> bool {
        true
    }

    fn should_evict<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool {
        entry.access_count < self.min_access_count
            && entry.age_ms(now_ms) > self.min_age.as_millis() as u64
    }
}
