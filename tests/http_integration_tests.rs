//! Integration Tests for the HTTP Response Cache
//!
//! Runs a local axum server on an ephemeral port and fetches from it through
//! `ReqwestTransport`, counting how often the server is actually hit.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tiered_cache::{
    CacheConfig, CacheManager, Clock, HttpRequest, KeyValueStore, ManualClock, MemoryStore,
    ReqwestTransport,
};
use tokio_test::assert_ok;

// == Test Server ==

#[derive(Clone, Default)]
struct Hits {
    assets: Arc<AtomicUsize>,
    api: Arc<AtomicUsize>,
}

async fn asset(
    State(hits): State<Hits>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let n = hits.assets.fetch_add(1, Ordering::SeqCst) + 1;
    (
        [(header::CACHE_CONTROL, "public, max-age=120")],
        Json(json!({"asset": "app.js", "n": n, "query": query})),
    )
}

async fn uncached_asset(State(hits): State<Hits>) -> impl IntoResponse {
    let n = hits.assets.fetch_add(1, Ordering::SeqCst) + 1;
    ([(header::CACHE_CONTROL, "no-store")], Json(json!({"n": n})))
}

async fn api(State(hits): State<Hits>) -> Json<Value> {
    let n = hits.api.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"n": n}))
}

async fn spawn_server(hits: Hits) -> SocketAddr {
    let app = Router::new()
        .route("/assets/app.js", get(asset))
        .route("/assets/private.js", get(uncached_asset))
        .route("/api/items.json", get(api))
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// == Helper Functions ==

struct Harness {
    cache: CacheManager<Value>,
    clock: ManualClock,
    local: Arc<MemoryStore>,
    hits: Hits,
    base: String,
}

async fn harness() -> Harness {
    let hits = Hits::default();
    let addr = spawn_server(hits.clone()).await;
    let clock = ManualClock::default();
    let local = Arc::new(MemoryStore::new());
    let config = CacheConfig {
        enable_cleanup: false,
        ..CacheConfig::default()
    };
    let cache = CacheManager::builder(config)
        .local_store(local.clone())
        .transport(Arc::new(ReqwestTransport::new()))
        .clock(Arc::new(clock.clone()))
        .build();
    Harness {
        cache,
        clock,
        local,
        hits,
        base: format!("http://{}", addr),
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

// == Caching Tests ==

#[tokio::test]
async fn test_max_age_controls_refetch() {
    let h = harness().await;
    let url = format!("{}/assets/app.js", h.base);
    let t0 = h.clock.now_ms();

    let first = assert_ok!(h.cache.get_http(&url).await);
    assert_eq!(first["n"], 1);

    h.clock.set(t0 + 60_000);
    let cached = assert_ok!(h.cache.get_http(&url).await);
    assert_eq!(cached["n"], 1);
    assert_eq!(h.hits.assets.load(Ordering::SeqCst), 1);

    h.clock.set(t0 + 121_000);
    let refetched = assert_ok!(h.cache.get_http(&url).await);
    assert_eq!(refetched["n"], 2);
    assert_eq!(h.hits.assets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cached_response_is_tagged() {
    let h = harness().await;
    let url = format!("{}/assets/app.js", h.base);

    let live = assert_ok!(h.cache.http().execute(HttpRequest::get(&url)).await);
    let cached = assert_ok!(h.cache.http().execute(HttpRequest::get(&url)).await);

    assert!(!live.from_cache);
    assert!(cached.from_cache);
    assert_eq!(cached.status, live.status);
    assert_eq!(
        cached.headers.get(header::CACHE_CONTROL),
        live.headers.get(header::CACHE_CONTROL)
    );
}

#[tokio::test]
async fn test_param_order_does_not_matter() {
    let h = harness().await;
    let url = format!("{}/assets/app.js", h.base);

    let first = HttpRequest::get(&url).param("v", "3").param("lang", "en");
    let second = HttpRequest::get(format!("{}?lang=en", url)).param("v", "3");
    assert_ok!(h.cache.http().execute(first).await);
    let response = assert_ok!(h.cache.http().execute(second).await);

    assert!(response.from_cache);
    assert_eq!(response.data["query"]["lang"], "en");
    assert_eq!(h.hits.assets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_api_and_no_store_responses_not_cached() {
    let h = harness().await;
    let api = format!("{}/api/items.json", h.base);
    let private = format!("{}/assets/private.js", h.base);

    assert_ok!(h.cache.get_http(&api).await);
    assert_ok!(h.cache.get_http(&api).await);
    assert_ok!(h.cache.get_http(&private).await);
    assert_ok!(h.cache.get_http(&private).await);

    assert_eq!(h.hits.api.load(Ordering::SeqCst), 2);
    assert_eq!(h.hits.assets.load(Ordering::SeqCst), 2);
    assert_eq!(h.cache.get_metrics().http.size, 0);
}

#[tokio::test]
async fn test_force_get_refreshes_cache() {
    let h = harness().await;
    let url = format!("{}/assets/app.js", h.base);

    assert_ok!(h.cache.get_http(&url).await);
    let forced = assert_ok!(h.cache.force_get_http(&url).await);
    assert_eq!(forced["n"], 2);

    let cached = assert_ok!(h.cache.get_http(&url).await);
    assert_eq!(cached["n"], 2);
    assert_eq!(h.hits.assets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_durable_tier_survives_memory_clear() {
    let h = harness().await;
    let url = format!("{}/assets/app.js", h.base);

    assert_ok!(h.cache.get_http(&url).await);
    settle().await;
    assert_eq!(assert_ok!(h.local.len().await), 1);

    // A new manager over the same local store starts with an empty memory tier
    let fresh: CacheManager<Value> = CacheManager::builder(CacheConfig {
        enable_cleanup: false,
        ..CacheConfig::default()
    })
    .local_store(h.local.clone())
    .clock(Arc::new(h.clock.clone()))
    .build();

    let cached = assert_ok!(fresh.get_http(&url).await);
    assert_eq!(cached["n"], 1);
    assert_eq!(h.hits.assets.load(Ordering::SeqCst), 1);
    assert_eq!(fresh.get_metrics().http.size, 1);
}

#[tokio::test]
async fn test_clear_http_cache_for_url() {
    let h = harness().await;
    let url = format!("{}/assets/app.js", h.base);

    assert_ok!(h.cache.get_http(&url).await);
    settle().await;
    h.cache.clear_http_cache_for_url(&url).await;

    assert_eq!(assert_ok!(h.local.len().await), 0);
    assert_ok!(h.cache.get_http(&url).await);
    assert_eq!(h.hits.assets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_transport_error_propagates() {
    let h = harness().await;
    // Nothing listens on port 9 of the loopback interface
    let result = h.cache.get_http("http://127.0.0.1:9/assets/app.js").await;
    assert!(result.is_err());
}
