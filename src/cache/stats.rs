//! Cache Metrics Module
//!
//! Tracks cache performance counters including hits, misses, and evictions.

use serde::Serialize;

// == Cache Metrics ==
/// Monotonic cache counters. Reset only by an explicit clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of writes
    pub sets: u64,
    /// Number of explicit removals of existing keys
    pub deletes: u64,
    /// Number of entries evicted by capacity pressure or strategy
    pub evictions: u64,
    /// hits / (hits + misses), 0.0 before any access
    pub hit_rate: f64,
}

impl CacheMetrics {
    // == Constructor ==
    /// Creates a new CacheMetrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.update_hit_rate();
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.update_hit_rate();
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    // == Record Eviction ==
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    fn update_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        };
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.misses, 0);
        assert_eq!(metrics.sets, 0);
        assert_eq!(metrics.deletes, 0);
        assert_eq!(metrics.evictions, 0);
        assert_eq!(metrics.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        assert_eq!(metrics.hit_rate, 1.0);
    }

    #[test]
    fn test_hit_rate_all_misses() {
        let mut metrics = CacheMetrics::new();
        metrics.record_miss();
        metrics.record_miss();
        assert_eq!(metrics.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_miss();
        metrics.record_hit();
        assert_eq!(metrics.hit_rate, 0.5);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut metrics = CacheMetrics::new();
        metrics.record_eviction();
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["evictions"], 1);
        assert!(json.get("hitRate").is_some());
    }
}
