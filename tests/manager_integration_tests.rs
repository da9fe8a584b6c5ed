//! Integration Tests for the Cache Manager
//!
//! Drives the façade end to end across memory, session and local tiers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tiered_cache::strategy::PatternBasedStrategy;
use tiered_cache::{
    CacheConfig, CacheManager, CacheStrategy, KeyValueStore, ManualClock, MemoryStore, SetOptions,
    StorageTier, WarmupEntry,
};
use tokio_test::assert_ok;
use tracing_subscriber::EnvFilter;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Harness {
    cache: CacheManager<Value>,
    clock: ManualClock,
    local: Arc<MemoryStore>,
    session: Arc<MemoryStore>,
}

fn harness(max_size: usize) -> Harness {
    init_tracing();
    let clock = ManualClock::default();
    let local = Arc::new(MemoryStore::new());
    let session = Arc::new(MemoryStore::new());
    let config = CacheConfig {
        max_size,
        enable_cleanup: false,
        ..CacheConfig::default()
    };
    let cache = CacheManager::builder(config)
        .local_store(local.clone())
        .session_store(session.clone())
        .clock(Arc::new(clock.clone()))
        .build();
    Harness {
        cache,
        clock,
        local,
        session,
    }
}

// == Memory Tier ==

#[tokio::test]
async fn test_capacity_two_evicts_oldest() {
    let h = harness(2);

    h.cache.set("a", json!(1), None);
    h.cache.set("b", json!(2), None);
    h.cache.set("c", json!(3), None);

    assert_eq!(h.cache.get("a"), None);
    assert_eq!(h.cache.get("b"), Some(json!(2)));
    assert_eq!(h.cache.get("c"), Some(json!(3)));

    let metrics = h.cache.get_metrics();
    assert_eq!(metrics.memory_size, 2);
    assert_eq!(metrics.memory.evictions, 1);
}

#[tokio::test]
async fn test_read_promotes_recency() {
    let h = harness(3);

    h.cache.set("a", json!(1), None);
    h.cache.set("b", json!(2), None);
    h.cache.set("c", json!(3), None);
    h.cache.get("a");
    h.cache.set("d", json!(4), None);

    assert!(h.cache.get("a").is_some());
    assert!(h.cache.get("b").is_none());
}

#[tokio::test]
async fn test_clear_memory_resets_metrics() {
    let h = harness(10);

    h.cache.set("a", json!(1), None);
    h.cache.get("a");
    h.cache.get("missing");
    h.cache.clear_memory();

    let metrics = h.cache.get_metrics();
    assert_eq!(metrics.memory_size, 0);
    assert_eq!(metrics.memory.hits, 0);
    assert_eq!(metrics.memory.misses, 0);
    assert_eq!(metrics.memory.sets, 0);
    assert_eq!(metrics.memory.hit_rate, 0.0);
}

// == Strategy Gating ==

#[tokio::test]
async fn test_secret_keys_never_admitted() {
    let h = harness(10);
    let strategy = assert_ok!(PatternBasedStrategy::excluding(["^secret:"]));
    h.cache.set_strategy(CacheStrategy::pattern_based(strategy));

    for _ in 0..5 {
        h.cache.set("secret:token", json!("t0k3n"), None);
        assert_eq!(h.cache.get("secret:token"), None);
    }
    assert_ok!(h.cache.set_any("secret:token", json!("t0k3n"), SetOptions::local()).await);
    assert_eq!(assert_ok!(h.local.len().await), 0);

    h.cache.set("public:token", json!("ok"), None);
    assert_eq!(h.cache.get("public:token"), Some(json!("ok")));
}

#[tokio::test]
async fn test_size_strategy_rejects_large_values() {
    let h = harness(10);
    h.cache.set_strategy(CacheStrategy::size_based(64));

    h.cache.set("small", json!("tiny"), None);
    h.cache.set("large", json!("x".repeat(100)), None);

    assert!(h.cache.get("small").is_some());
    assert!(h.cache.get("large").is_none());
}

// == Tiered Access ==

#[tokio::test]
async fn test_local_hit_promotes_to_memory_not_session() {
    let h = harness(10);

    assert_ok!(h.cache.set_local("profile", json!({"id": 1}), None).await);

    assert_eq!(h.cache.get_any("profile").await, Some(json!({"id": 1})));
    assert_eq!(h.cache.get("profile"), Some(json!({"id": 1})));
    assert_eq!(h.cache.get_session("profile").await, None);
    assert_eq!(assert_ok!(h.session.len().await), 0);
}

#[tokio::test]
async fn test_durable_ttl_expires_on_read() {
    let h = harness(10);

    assert_ok!(
        h.cache
            .set_any(
                "otp",
                json!("123456"),
                SetOptions::session().with_ttl(Duration::from_secs(30)),
            )
            .await
    );

    h.clock.advance(Duration::from_secs(30));
    assert_eq!(h.cache.get_session("otp").await, Some(json!("123456")));

    h.clock.advance(Duration::from_millis(1));
    assert_eq!(h.cache.get_session("otp").await, None);
    // Expired envelopes are dropped on read
    assert_eq!(assert_ok!(h.session.len().await), 0);
}

#[tokio::test]
async fn test_warmup_then_invalidate() {
    let h = harness(10);

    let results = h
        .cache
        .warmup(vec![
            WarmupEntry::new("user:1", json!("ada")),
            WarmupEntry::new("user:2", json!("grace")).storage(StorageTier::Local),
            WarmupEntry::new("user:3", json!("linus")).storage(StorageTier::Session),
            WarmupEntry::new("config", json!({"theme": "dark"})).ttl(Duration::from_secs(60)),
        ])
        .await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(h.cache.get_total_size().await, 4);

    let removed = assert_ok!(h.cache.invalidate("^user:").await);
    assert_eq!(removed, 3);
    assert_eq!(h.cache.get_total_size().await, 1);
    assert_eq!(h.cache.get_any("user:2").await, None);
    assert_eq!(h.cache.get("config"), Some(json!({"theme": "dark"})));
}

#[tokio::test]
async fn test_warmup_from_json() {
    let h = harness(10);

    let entries: Vec<WarmupEntry<Value>> = assert_ok!(serde_json::from_str(
        r#"[
            {"key": "a", "value": 1},
            {"key": "b", "value": [1, 2], "ttl": 10, "storage": "session"}
        ]"#
    ));
    let results = h.cache.warmup(entries).await;

    assert_eq!(results.len(), 2);
    assert_eq!(h.cache.get("a"), Some(json!(1)));
    assert_eq!(h.cache.get_session("b").await, Some(json!([1, 2])));
}

// == Lifecycle ==

#[tokio::test]
async fn test_destroy_clears_every_tier() {
    init_tracing();
    let local = Arc::new(MemoryStore::new());
    let cache: CacheManager<Value> = CacheManager::builder(CacheConfig::default())
        .local_store(local.clone())
        .build();
    assert!(cache.is_sweeping());

    cache.set("m", json!(1), None);
    assert_ok!(cache.set_local("l", json!(2), None).await);
    assert_ok!(cache.set_session("s", json!(3), None).await);

    assert_ok!(cache.destroy().await);
    assert!(!cache.is_sweeping());
    assert_eq!(cache.get_total_size().await, 0);
    assert_eq!(assert_ok!(local.len().await), 0);
}

#[tokio::test]
async fn test_background_sweep_runs() {
    init_tracing();
    let session = Arc::new(MemoryStore::new());
    let config = CacheConfig {
        cleanup_interval: Duration::from_millis(50),
        ..CacheConfig::default()
    };
    let cache: CacheManager<String> = CacheManager::builder(config)
        .session_store(session.clone())
        .build();

    assert_ok!(
        cache
            .set_session("flash", "saved".to_string(), Some(Duration::from_millis(10)))
            .await
    );
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The sweep removed the expired envelope without anyone reading it
    assert_eq!(assert_ok!(session.len().await), 0);
    assert_ok!(cache.destroy().await);
}

#[tokio::test]
async fn test_local_tier_persists_across_managers() {
    init_tracing();
    let dir = assert_ok!(tempfile::tempdir());
    let config = CacheConfig {
        enable_cleanup: false,
        local_store_path: Some(dir.path().join("cache.json")),
        ..CacheConfig::default()
    };

    {
        let cache: CacheManager<Value> = assert_ok!(CacheManager::from_config(config.clone()).await);
        assert_ok!(cache.set_local("theme", json!("dark"), None).await);
        cache.set("volatile", json!(true), None);
    }

    let cache: CacheManager<Value> = assert_ok!(CacheManager::from_config(config).await);
    assert_eq!(cache.get_local("theme").await, Some(json!("dark")));
    assert_eq!(cache.get("volatile"), None);
    assert_eq!(cache.get_any("theme").await, Some(json!("dark")));
}
