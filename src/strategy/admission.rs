//! Admission Strategies
//!
//! Size, type and key-pattern gates evaluated before a value is written to
//! any tier. None of them evict.

use std::collections::HashSet;

use regex::Regex;

use crate::cache::{CacheEntry, CacheValue, ValueKind};
use crate::error::Result;
use crate::strategy::Strategy;

/// Default size ceiling: 1 MiB.
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

// == Size Based Strategy ==
/// Rejects values whose estimated size exceeds `max_bytes`.
#[derive(Debug, Clone)]
pub struct SizeBasedStrategy {
    pub max_bytes: usize,
}

impl Default for SizeBasedStrategy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl Strategy for SizeBasedStrategy {
    fn name(&self) -> &'static str {
        "size"
    }

    fn should_cache<V: CacheValue>(&self, _key: &str, data: &V) -> bool {
        data.estimated_size() <= self.max_bytes
    }

    fn should_evict<V>(&self, _entry: &CacheEntry<V>, _now_ms: u64) -> bool {
        false
    }
}

// == Type Based Strategy ==
/// Admits only values whose kind is in the allow-set.
#[derive(Debug, Clone)]
pub struct TypeBasedStrategy {
    pub allowed: HashSet<ValueKind>,
}

impl TypeBasedStrategy {
    pub fn new(allowed: impl IntoIterator<Item = ValueKind>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl Default for TypeBasedStrategy {
    fn default() -> Self {
        Self::new(ValueKind::ALL)
    }
}

impl Strategy for TypeBasedStrategy {
    fn name(&self) -> &'static str {
        "type"
    }

    fn should_cache<V: CacheValue>(&self, _key: &str, data: &V) -> bool {
        self.allowed.contains(&data.kind())
    }

    fn should_evict<V>(&self, _entry: &CacheEntry<V>, _now_ms: u64) -> bool {
        false
    }
}

// == Pattern Based Strategy ==
/// Key filter: any exclude match rejects; otherwise at least one include
/// must match. An empty include list admits every key.
#[derive(Debug, Clone, Default)]
pub struct PatternBasedStrategy {
    pub include: Vec<Regex>,
    pub exclude: Vec<Regex>,
}

impl PatternBasedStrategy {
    /// Compiles include and exclude patterns.
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let include = include
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let exclude = exclude
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { include, exclude })
    }

    /// Admits every key except those matching one of `patterns`.
    pub fn excluding<E>(patterns: E) -> Result<Self>
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self::new(std::iter::empty::<&str>(), patterns)
    }

    pub fn admits_key(&self, key: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(key)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(key))
    }
}

impl Strategy for PatternBasedStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn should_cache<V: CacheValue>(&self, key: &str, _data: &V) -> bool {
        self.admits_key(key)
    }

    fn should_evict<V>(&self, _entry: &CacheEntry<V>, _now_ms: u64) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_size_ceiling() {
        let strategy = SizeBasedStrategy { max_bytes: 10 };

        assert!(strategy.should_cache("k", &"abcde".to_string()));
        assert!(!strategy.should_cache("k", &"abcdef".to_string()));
        // {"a":1} is 7 chars, 14 bytes
        assert!(!strategy.should_cache("k", &json!({"a": 1})));
    }

    #[test]
    fn test_type_allow_set() {
        let strategy = TypeBasedStrategy::new([ValueKind::String, ValueKind::Number]);

        assert!(strategy.should_cache("k", &"s".to_string()));
        assert!(strategy.should_cache("k", &7i64));
        assert!(!strategy.should_cache("k", &true));
        assert!(!strategy.should_cache("k", &json!([1, 2])));
        assert!(TypeBasedStrategy::default().should_cache("k", &json!({"o": null})));
    }

    #[test]
    fn test_pattern_defaults_admit_all() {
        let strategy = PatternBasedStrategy::default();
        assert!(strategy.should_cache("anything", &1i64));
    }

    #[test]
    fn test_pattern_exclude_wins_over_include() {
        let strategy = PatternBasedStrategy::new(["^user:"], ["^user:secret"]).unwrap();

        assert!(strategy.admits_key("user:42"));
        assert!(!strategy.admits_key("user:secret:1"));
        assert!(!strategy.admits_key("order:1"));
    }

    #[test]
    fn test_secret_keys_never_admitted() {
        let strategy = PatternBasedStrategy::excluding(["^secret:"]).unwrap();

        for _ in 0..3 {
            assert!(!strategy.should_cache("secret:token", &"t".to_string()));
        }
        assert!(strategy.should_cache("public:token", &"t".to_string()));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(PatternBasedStrategy::excluding(["(oops"]).is_err());
    }
}
