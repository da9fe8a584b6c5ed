//! Strategy Module
//!
//! Pluggable admission and eviction policies, independent of storage tier.
//!
//! # Variants
//! - TTL / LRU / LFU: retention only, admit everything
//! - Size / Type / Pattern: admission gates, never evict
//! - Adaptive: stateful per-key frequency tracking
//! - Hybrid: composition (admission = all agree, eviction = any agrees)

mod adaptive;
mod admission;
mod retention;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheValue};

pub use adaptive::{AccessStats, AdaptiveStrategy};
pub use admission::{PatternBasedStrategy, SizeBasedStrategy, TypeBasedStrategy, DEFAULT_MAX_BYTES};
pub use retention::{LfuStrategy, LruStrategy, TtlStrategy};

// == Strategy Trait ==
/// Decisions a policy makes about entries.
pub trait Strategy {
    /// Short identifier reported in metrics.
    fn name(&self) -> &'static str;

    /// Admission gate, evaluated before writing to any tier.
    fn should_cache<V: CacheValue>(&self, key: &str, data: &V) -> bool;

    /// Whether a resident entry should be removed.
    fn should_evict<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool;

    /// Hook called after every successful write or read.
    fn on_access<V>(&self, _entry: &CacheEntry<V>, _now_ms: u64) {}

    /// Hook called when `key` leaves the cache for any reason.
    fn on_remove(&self, _key: &str) {}

    /// Hook called when the whole cache is emptied.
    fn on_clear(&self) {}
}

// == Hybrid Strategy ==
/// Combines strategies: every member must admit, any member may evict.
#[derive(Debug, Clone, Default)]
pub struct HybridStrategy {
    pub members: Vec<CacheStrategy>,
}

impl HybridStrategy {
    pub fn new(members: Vec<CacheStrategy>) -> Self {
        Self { members }
    }
}

impl Strategy for HybridStrategy {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn should_cache<V: CacheValue>(&self, key: &str, data: &V) -> bool {
        self.members.iter().all(|s| s.should_cache(key, data))
    }

    fn should_evict<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool {
        self.members.iter().any(|s| s.should_evict(entry, now_ms))
    }

    fn on_access<V>(&self, entry: &CacheEntry<V>, now_ms: u64) {
        for member in &self.members {
            member.on_access(entry, now_ms);
        }
    }

    fn on_remove(&self, key: &str) {
        for member in &self.members {
            member.on_remove(key);
        }
    }

    fn on_clear(&self) {
        for member in &self.members {
            member.on_clear();
        }
    }
}

// == Cache Strategy ==
/// Closed set of strategies, dispatched by variant.
#[derive(Debug, Clone)]
pub enum CacheStrategy {
    Ttl(TtlStrategy),
    Lru(LruStrategy),
    Lfu(LfuStrategy),
    SizeBased(SizeBasedStrategy),
    TypeBased(TypeBasedStrategy),
    PatternBased(PatternBasedStrategy),
    Hybrid(HybridStrategy),
    Adaptive(AdaptiveStrategy),
}

macro_rules! dispatch {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            CacheStrategy::Ttl($s) => $body,
            CacheStrategy::Lru($s) => $body,
            CacheStrategy::Lfu($s) => $body,
            CacheStrategy::SizeBased($s) => $body,
            CacheStrategy::TypeBased($s) => $body,
            CacheStrategy::PatternBased($s) => $body,
            CacheStrategy::Hybrid($s) => $body,
            CacheStrategy::Adaptive($s) => $body,
        }
    };
}

impl Strategy for CacheStrategy {
    fn name(&self) -> &'static str {
        dispatch!(self, s => s.name())
    }

    fn should_cache<V: CacheValue>(&self, key: &str, data: &V) -> bool {
        dispatch!(self, s => s.should_cache(key, data))
    }

    fn should_evict<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool {
        dispatch!(self, s => s.should_evict(entry, now_ms))
    }

    fn on_access<V>(&self, entry: &CacheEntry<V>, now_ms: u64) {
        dispatch!(self, s => s.on_access(entry, now_ms))
    }

    fn on_remove(&self, key: &str) {
        dispatch!(self, s => s.on_remove(key))
    }

    fn on_clear(&self) {
        dispatch!(self, s => s.on_clear())
    }
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::ttl()
    }
}

// == Factory ==
impl CacheStrategy {
    pub fn ttl() -> Self {
        CacheStrategy::Ttl(TtlStrategy::default())
    }

    pub fn lru() -> Self {
        CacheStrategy::Lru(LruStrategy::default())
    }

    pub fn lfu() -> Self {
        CacheStrategy::Lfu(LfuStrategy::default())
    }

    pub fn size_based(max_bytes: usize) -> Self {
        CacheStrategy::SizeBased(SizeBasedStrategy { max_bytes })
    }

    pub fn type_based(allowed: impl IntoIterator<Item = crate::cache::ValueKind>) -> Self {
        CacheStrategy::TypeBased(TypeBasedStrategy::new(allowed))
    }

    pub fn pattern_based(pattern: PatternBasedStrategy) -> Self {
        CacheStrategy::PatternBased(pattern)
    }

    pub fn hybrid(members: Vec<CacheStrategy>) -> Self {
        CacheStrategy::Hybrid(HybridStrategy::new(members))
    }

    pub fn adaptive() -> Self {
        CacheStrategy::Adaptive(AdaptiveStrategy::default())
    }

    /// Builds the default-configured strategy for `kind`.
    pub fn from_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Ttl => Self::ttl(),
            StrategyKind::Lru => Self::lru(),
            StrategyKind::Lfu => Self::lfu(),
            StrategyKind::Size => CacheStrategy::SizeBased(SizeBasedStrategy::default()),
            StrategyKind::Type => CacheStrategy::TypeBased(TypeBasedStrategy::default()),
            StrategyKind::Pattern => CacheStrategy::PatternBased(PatternBasedStrategy::default()),
            StrategyKind::Hybrid => Self::hybrid(vec![
                Self::ttl(),
                CacheStrategy::SizeBased(SizeBasedStrategy::default()),
            ]),
            StrategyKind::Adaptive => Self::adaptive(),
        }
    }
}

// == Strategy Kind ==
/// Name of a strategy variant, as used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Ttl,
    Lru,
    Lfu,
    Size,
    Type,
    Pattern,
    Hybrid,
    Adaptive,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ttl" => Ok(StrategyKind::Ttl),
            "lru" => Ok(StrategyKind::Lru),
            "lfu" => Ok(StrategyKind::Lfu),
            "size" | "size-based" => Ok(StrategyKind::Size),
            "type" | "type-based" => Ok(StrategyKind::Type),
            "pattern" | "pattern-based" => Ok(StrategyKind::Pattern),
            "hybrid" => Ok(StrategyKind::Hybrid),
            "adaptive" => Ok(StrategyKind::Adaptive),
            other => Err(format!("unknown cache strategy '{}'", other)),
        }
    }
}
