//! HTTP Cache Module
//!
//! Wraps an `HttpTransport` with a memory tier and a durable tier for
//! responses. Requests are intercepted before they reach the transport and
//! responses after.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::MemoryCache;
use crate::clock::Clock;
use crate::config::HttpCacheConfig;
use crate::error::Result;
use crate::http::key::{default_should_cache, derive_cache_key, is_no_store, parse_max_age};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::models::HttpCacheStats;
use crate::storage::DurableStorage;

/// Decides whether a live response for `url` may be stored.
pub type ResponsePredicate = Arc<dyn Fn(&str, &HttpResponse) -> bool + Send + Sync>;

// == Cached HTTP Response ==
/// Stored form of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedHttpResponse {
    pub data: Value,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Time the response was stored (Unix milliseconds)
    pub timestamp: u64,
    /// Lifetime in milliseconds
    pub ttl: Option<u64>,
}

impl CachedHttpResponse {
    fn capture(response: &HttpResponse, now_ms: u64, ttl: Duration) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Self {
            data: response.data.clone(),
            status: response.status.as_u16(),
            status_text: response.status_text.clone(),
            headers,
            timestamp: now_ms,
            ttl: Some(ttl.as_millis() as u64),
        }
    }

    /// Lifetime left at `now_ms`, None if the response never expires.
    fn remaining(&self, now_ms: u64) -> Option<Duration> {
        self.ttl.map(|ttl| {
            let expires = self.timestamp.saturating_add(ttl);
            Duration::from_millis(expires.saturating_sub(now_ms))
        })
    }

    /// Rebuilds a response tagged as served from cache.
    pub fn into_response(self) -> HttpResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        HttpResponse {
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK),
            status_text: self.status_text,
            headers,
            data: self.data,
            from_cache: true,
        }
    }
}

// == Interception ==
/// Outcome of request interception.
#[derive(Debug)]
pub enum Interception {
    /// Served from cache; the transport must not be called
    Cached(HttpResponse),
    /// Go to the network
    Forward,
}

// == HTTP Cache ==
pub struct HttpCache {
    config: HttpCacheConfig,
    transport: Arc<dyn HttpTransport>,
    memory: Mutex<MemoryCache<CachedHttpResponse>>,
    durable: DurableStorage,
    should_cache: ResponsePredicate,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for HttpCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCache")
            .field("config", &self.config)
            .field("memory", &*self.memory.lock())
            .field("durable", &self.durable)
            .finish()
    }
}

impl HttpCache {
    // == Constructor ==
    /// Creates an HTTP cache over `transport`, persisting to `durable`.
    pub fn new(
        config: HttpCacheConfig,
        transport: Arc<dyn HttpTransport>,
        durable: DurableStorage,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let memory = MemoryCache::with_clock(config.max_size, Some(config.default_ttl), clock.clone());
        Self {
            config,
            transport,
            memory: Mutex::new(memory),
            durable,
            should_cache: Arc::new(default_should_cache),
            clock,
        }
    }

    /// Replaces the URL/response cacheability predicate.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &HttpResponse) -> bool + Send + Sync + 'static,
    {
        self.should_cache = Arc::new(predicate);
        self
    }

    pub fn config(&self) -> &HttpCacheConfig {
        &self.config
    }

    fn is_cacheable_method(&self, request: &HttpRequest) -> bool {
        self.config.cacheable_methods.contains(&request.method)
    }

    // == Intercept Request ==
    /// Looks the request up in memory, then in the durable tier. A durable
    /// hit is promoted into memory for its remaining lifetime.
    pub async fn intercept_request(&self, request: &HttpRequest) -> Interception {
        if !self.is_cacheable_method(request) || request.is_bypass() {
            return Interception::Forward;
        }
        let key = derive_cache_key(&request.url, &request.params);

        let hit = self.memory.lock().get(&key);
        if let Some(cached) = hit {
            debug!("HTTP cache hit (memory): {}", key);
            return Interception::Cached(cached.into_response());
        }

        let Some(cached) = self.durable.get::<CachedHttpResponse>(&key).await else {
            debug!("HTTP cache miss: {}", key);
            return Interception::Forward;
        };
        let now = self.clock.now_ms();
        let remaining = cached.remaining(now);
        if remaining == Some(Duration::ZERO) {
            return Interception::Forward;
        }
        debug!("HTTP cache hit (durable): {}", key);
        self.memory.lock().set(key, cached.clone(), remaining);
        Interception::Cached(cached.into_response())
    }

    // == Intercept Response ==
    /// Stores a live response when method, predicate and status allow it.
    ///
    /// The durable write runs in the background on the current tokio
    /// runtime; its failures are logged. Only reachable through
    /// [`execute`](Self::execute), which always runs inside one.
    pub(crate) fn intercept_response(&self, request: &HttpRequest, response: &HttpResponse) -> bool {
        if !self.is_cacheable_method(request)
            || !(self.should_cache)(&request.url, response)
            || !self.config.cacheable_statuses.contains(&response.status.as_u16())
            || is_no_store(&response.headers)
        {
            return false;
        }

        let key = derive_cache_key(&request.url, &request.params);
        let ttl = parse_max_age(&response.headers).unwrap_or(self.config.default_ttl);
        let cached = CachedHttpResponse::capture(response, self.clock.now_ms(), ttl);
        debug!("Caching HTTP response for {} ({}ms)", key, ttl.as_millis());

        self.memory.lock().set(key.clone(), cached.clone(), Some(ttl));

        let durable = self.durable.clone();
        tokio::spawn(async move {
            if let Err(err) = durable.set(&key, &cached, Some(ttl)).await {
                warn!("Failed to persist HTTP response for {}: {}", key, err);
            }
        });
        true
    }

    // == Execute ==
    /// Runs a request through the cache. Transport errors propagate as-is.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        match self.intercept_request(&request).await {
            Interception::Cached(response) => Ok(response),
            Interception::Forward => {
                let response = self.transport.send(&request).await?;
                self.intercept_response(&request, &response);
                Ok(response)
            }
        }
    }

    /// Fetches `url` and returns only the body.
    pub async fn get(&self, url: &str) -> Result<Value> {
        Ok(self.execute(HttpRequest::get(url)).await?.data)
    }

    /// Fetches `url` from the network, refreshing the cache.
    pub async fn force_get(&self, url: &str) -> Result<Value> {
        Ok(self.execute(HttpRequest::get(url).bypass_cache()).await?.data)
    }

    // == Clear ==
    pub async fn clear_cache(&self) {
        self.memory.lock().clear();
        if let Err(err) = self.durable.clear().await {
            warn!("Failed to clear durable HTTP cache: {}", err);
        }
    }

    /// Drops the cached response for `url` (keyed as a plain GET).
    pub async fn clear_cache_for_url(&self, url: &str) {
        let key = derive_cache_key(url, &[]);
        self.memory.lock().remove(&key);
        if let Err(err) = self.durable.remove(&key).await {
            warn!("Failed to drop durable HTTP cache entry {}: {}", key, err);
        }
    }

    pub fn stats(&self) -> HttpCacheStats {
        let memory = self.memory.lock();
        HttpCacheStats {
            size: memory.size(),
            keys: memory.keys(),
            metrics: memory.metrics(),
        }
    }

    /// Sweeps expired responses from both tiers.
    pub async fn cleanup(&self) -> usize {
        let removed = self.memory.lock().cleanup();
        removed + self.durable.cleanup().await
    }
}
