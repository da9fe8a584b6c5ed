//! Memory Cache Module
//!
//! Eviction core combining a key index with an arena-backed recency list,
//! LRU capacity eviction and per-entry TTL expiration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheMetrics, LruList};
use crate::clock::{system_clock, Clock};

// == Memory Cache ==
/// Bounded in-memory cache with LRU eviction and TTL support.
///
/// The index maps keys to arena slots in the recency list; both are updated
/// together by every mutating operation.
pub struct MemoryCache<V> {
    /// Key to list slot
    index: HashMap<String, usize>,
    /// Recency list owning every entry
    list: LruList<V>,
    /// Performance counters
    metrics: CacheMetrics,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL applied when `set` is given none
    default_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl<V> std::fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("size", &self.index.len())
            .field("max_size", &self.max_size)
            .field("default_ttl", &self.default_ttl)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl<V: Clone> MemoryCache<V> {
    // == Constructor ==
    /// Creates a new MemoryCache with the given capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries (at least 1)
    /// * `default_ttl` - TTL for entries written without one; None = no expiry
    pub fn new(max_size: usize, default_ttl: Option<Duration>) -> Self {
        Self::with_clock(max_size, default_ttl, system_clock())
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(max_size: usize, default_ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        Self {
            index: HashMap::new(),
            list: LruList::new(),
            metrics: CacheMetrics::new(),
            max_size: max_size.max(1),
            default_ttl,
            clock,
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed and counted as misses. A hit moves the
    /// entry to the head of the recency list.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.data)
    }

    /// Like [`get`](Self::get) but returns the whole entry after bookkeeping.
    pub fn get_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now_ms();
        let Some(&idx) = self.index.get(key) else {
            self.metrics.record_miss();
            return None;
        };

        let expired = self
            .list
            .get(idx)
            .map_or(true, |entry| entry.is_expired(now));
        if expired {
            self.index.remove(key);
            self.list.remove(idx);
            self.metrics.record_miss();
            return None;
        }

        let entry = self.list.get_mut(idx).map(|entry| {
            entry.touch(now);
            entry.clone()
        });
        self.list.move_to_front(idx);
        self.metrics.record_hit();
        entry
    }

    // == Set ==
    /// Stores a value, overwriting and resetting any existing entry.
    ///
    /// A new key that pushes the cache past `max_size` evicts the tail;
    /// the evicted key is returned.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `data` - The value to store
    /// * `ttl` - Optional TTL (uses the default TTL if None)
    pub fn set(&mut self, key: impl Into<String>, data: V, ttl: Option<Duration>) -> Option<String> {
        let key = key.into();
        let now = self.clock.now_ms();
        let ttl = ttl.or(self.default_ttl);
        self.metrics.record_set();

        if let Some(&idx) = self.index.get(&key) {
            if let Some(entry) = self.list.get_mut(idx) {
                entry.rewrite(data, now, ttl);
            }
            self.list.move_to_front(idx);
            return None;
        }

        let idx = self.list.push_front(CacheEntry::new(key.clone(), data, now, ttl));
        self.index.insert(key, idx);

        if self.index.len() > self.max_size {
            return self.evict_tail();
        }
        None
    }

    fn evict_tail(&mut self) -> Option<String> {
        let tail = self.list.tail()?;
        let entry = self.list.remove(tail)?;
        self.index.remove(&entry.key);
        self.metrics.record_eviction();
        Some(entry.key)
    }

    // == Remove ==
    /// Removes an entry by key. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(idx) => {
                self.list.remove(idx);
                self.metrics.record_delete();
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Drops every entry and resets all counters.
    pub fn clear(&mut self) {
        self.index.clear();
        self.list.clear();
        self.metrics = CacheMetrics::new();
    }

    // == Cleanup ==
    /// Removes all expired entries without touching recency.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        self.drain_expired().len()
    }

    /// Like [`cleanup`](Self::cleanup) but returns the removed keys.
    pub fn drain_expired(&mut self) -> Vec<String> {
        let now = self.clock.now_ms();
        self.remove_where(|entry| entry.is_expired(now))
    }

    /// Evicts every entry the predicate flags, counting each as an eviction.
    /// Returns the evicted keys.
    pub fn evict_where<F>(&mut self, pred: F) -> Vec<String>
    where
        F: FnMut(&CacheEntry<V>) -> bool,
    {
        let removed = self.remove_where(pred);
        for _ in &removed {
            self.metrics.record_eviction();
        }
        removed
    }

    fn remove_where<F>(&mut self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&CacheEntry<V>) -> bool,
    {
        let doomed: Vec<(String, usize)> = self
            .list
            .iter()
            .filter(|&(_, entry)| pred(entry))
            .map(|(idx, entry)| (entry.key.clone(), idx))
            .collect();

        doomed
            .into_iter()
            .map(|(key, idx)| {
                self.index.remove(&key);
                self.list.remove(idx);
                key
            })
            .collect()
    }

    /// Looks at an entry without recording an access or checking expiry.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.index.get(key).and_then(|&idx| self.list.get(idx))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Keys ==
    /// Keys ordered from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.list.iter().map(|(_, entry)| entry.key.clone()).collect()
    }

    // == Size ==
    pub fn size(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns a snapshot of the counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.clone()
    }
}
