//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support and
//! access bookkeeping.

use std::time::Duration;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key this entry is stored under
    pub key: String,
    /// The stored value
    pub data: V,
    /// Time of the last write (Unix milliseconds)
    pub timestamp: u64,
    /// Lifetime from `timestamp`, None = never expires by TTL
    pub ttl: Option<Duration>,
    /// Number of writes and reads since the last write
    pub access_count: u64,
    /// Time of the last write or read (Unix milliseconds)
    pub last_access: u64,
}

impl CacheEntry<()> {
    /// Builds a metadata-only entry, used where only bookkeeping matters.
    pub fn meta(key: impl Into<String>, now_ms: u64, ttl: Option<Duration>) -> Self {
        CacheEntry::new(key, (), now_ms, ttl)
    }
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry written at `now_ms`.
    ///
    /// # Arguments
    /// * `key` - The key the entry lives under
    /// * `data` - The value to store
    /// * `now_ms` - Current time in Unix milliseconds
    /// * `ttl` - Optional lifetime
    pub fn new(key: impl Into<String>, data: V, now_ms: u64, ttl: Option<Duration>) -> Self {
        Self {
            key: key.into(),
            data,
            timestamp: now_ms,
            ttl,
            access_count: 1,
            last_access: now_ms,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once strictly more than `ttl` has elapsed since
    /// `timestamp`. Entries without a TTL never expire.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.ttl {
            Some(ttl) => now_ms.saturating_sub(self.timestamp) > ttl.as_millis() as u64,
            None => false,
        }
    }

    // == Rewrite ==
    /// Replaces the value in place, resetting the write time and access count.
    pub fn rewrite(&mut self, data: V, now_ms: u64, ttl: Option<Duration>) {
        self.data = data;
        self.timestamp = now_ms;
        self.ttl = ttl;
        self.access_count = 1;
        self.last_access = now_ms;
    }

    // == Touch ==
    /// Records a read.
    pub fn touch(&mut self, now_ms: u64) {
        self.access_count += 1;
        self.last_access = now_ms;
    }

    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self, now_ms: u64) -> Option<Duration> {
        self.ttl.map(|ttl| {
            let elapsed = Duration::from_millis(now_ms.saturating_sub(self.timestamp));
            ttl.saturating_sub(elapsed)
        })
    }

    /// Milliseconds since the last write or read.
    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_access)
    }

    /// Milliseconds since the last write.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_000_000;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("k", "test_value".to_string(), NOW, None);

        assert_eq!(entry.data, "test_value");
        assert_eq!(entry.access_count, 1);
        assert!(entry.ttl.is_none());
        assert!(!entry.is_expired(u64::MAX));
    }

    #[test]
    fn test_entry_expiration_boundary() {
        let entry = CacheEntry::new("k", 1, NOW, Some(Duration::from_secs(1)));

        assert!(!entry.is_expired(NOW));
        // Exactly ttl elapsed is still live
        assert!(!entry.is_expired(NOW + 1_000));
        assert!(entry.is_expired(NOW + 1_001));
    }

    #[test]
    fn test_rewrite_resets_bookkeeping() {
        let mut entry = CacheEntry::new("k", 1, NOW, Some(Duration::from_secs(1)));
        entry.touch(NOW + 10);
        entry.touch(NOW + 20);
        assert_eq!(entry.access_count, 3);

        entry.rewrite(2, NOW + 500, None);
        assert_eq!(entry.data, 2);
        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.timestamp, NOW + 500);
        assert!(entry.ttl.is_none());
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new("k", 1, NOW, Some(Duration::from_secs(10)));

        assert_eq!(entry.ttl_remaining(NOW + 4_000), Some(Duration::from_secs(6)));
        assert_eq!(entry.ttl_remaining(NOW + 20_000), Some(Duration::ZERO));

        let forever = CacheEntry::meta("k", NOW, None);
        assert!(forever.ttl_remaining(NOW).is_none());
    }

    #[test]
    fn test_idle_and_age() {
        let mut entry = CacheEntry::meta("k", NOW, None);
        entry.touch(NOW + 300);

        assert_eq!(entry.age_ms(NOW + 500), 500);
        assert_eq!(entry.idle_ms(NOW + 500), 200);
    }
}
