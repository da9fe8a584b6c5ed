//! Cache Manager Module
//!
//! Single entry point over the memory tier, the local and session durable
//! tiers and the HTTP response cache, with a pluggable strategy and a
//! background sweep.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheValue, MemoryCache};
use crate::clock::{system_clock, Clock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::http::{HttpCache, HttpResponse, HttpTransport, ReqwestTransport, ResponsePredicate};
use crate::models::{KeyPattern, ManagerMetrics, SetOptions, StorageTier, WarmupEntry};
use crate::storage::{DurableStorage, FileStore, KeyValueStore, MemoryStore};
use crate::strategy::{CacheStrategy, Strategy};
use crate::tasks::{spawn_sweep_task, Sweep};

/// Keeps the first error of a sequence of independent steps.
fn first_err(results: impl IntoIterator<Item = Result<()>>) -> Result<()> {
    results.into_iter().fold(Ok(()), |acc, r| acc.and(r))
}

// == Manager State ==
struct ManagerInner<V> {
    config: CacheConfig,
    memory: Mutex<MemoryCache<V>>,
    local: DurableStorage,
    session: DurableStorage,
    http: HttpCache,
    strategy: RwLock<CacheStrategy>,
    clock: Arc<dyn Clock>,
}

impl<V: CacheValue> ManagerInner<V> {
    fn admits(&self, key: &str, value: &V) -> bool {
        let admitted = self.strategy.read().should_cache(key, value);
        if !admitted {
            debug!("Strategy rejected '{}'", key);
        }
        admitted
    }

    fn record_access<T>(&self, entry: &CacheEntry<T>) {
        self.strategy.read().on_access(entry, self.clock.now_ms());
    }

    fn get_memory(&self, key: &str) -> Option<V> {
        let entry = self.memory.lock().get_entry(key);
        match entry {
            Some(entry) => {
                self.record_access(&entry);
                Some(entry.data)
            }
            None => {
                // Absent or lazily expired; either way nothing to track
                self.strategy.read().on_remove(key);
                None
            }
        }
    }

    fn set_memory(&self, key: String, value: V, ttl: Option<Duration>) {
        if !self.admits(&key, &value) {
            return;
        }
        let now = self.clock.now_ms();
        let evicted = self.memory.lock().set(key.clone(), value, ttl);

        let strategy = self.strategy.read();
        if let Some(evicted) = evicted {
            strategy.on_remove(&evicted);
        }
        strategy.on_access(&CacheEntry::<()>::meta(key, now, ttl), now);
    }

    fn remove_memory(&self, key: &str) -> bool {
        let removed = self.memory.lock().remove(key);
        self.strategy.read().on_remove(key);
        removed
    }

    fn clear_memory(&self) {
        self.memory.lock().clear();
        self.strategy.read().on_clear();
    }

    async fn cleanup(&self) -> usize {
        let in_memory = {
            let strategy = self.strategy.read();
            let now = self.clock.now_ms();
            let mut memory = self.memory.lock();
            let mut removed = memory.drain_expired();
            removed.extend(memory.evict_where(|entry| strategy.should_evict(entry, now)));
            for key in &removed {
                strategy.on_remove(key);
            }
            removed.len()
        };

        let local = self.local.cleanup().await;
        let session = self.session.cleanup().await;
        let http = self.http.cleanup().await;
        in_memory + local + session + http
    }
}

#[async_trait]
impl<V: CacheValue> Sweep for ManagerInner<V> {
    async fn sweep(&self) -> usize {
        self.cleanup().await
    }
}

// == Cache Manager ==
/// Unified cache façade.
///
/// Build one at startup and share it (for example behind an `Arc`). The
/// background sweep is stopped by [`destroy`](Self::destroy) or when the
/// manager is dropped.
pub struct CacheManager<V: CacheValue> {
    inner: Arc<ManagerInner<V>>,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl<V: CacheValue> std::fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("strategy", &self.inner.strategy.read().name())
            .field("memory_size", &self.inner.memory.lock().size())
            .field("local", &self.inner.local)
            .field("session", &self.inner.session)
            .field("sweeping", &self.sweep.lock().is_some())
            .finish()
    }
}

impl<V: CacheValue> CacheManager<V> {
    // == Constructors ==
    /// Starts a builder from `config`.
    pub fn builder(config: CacheConfig) -> CacheManagerBuilder<V> {
        CacheManagerBuilder::new(config)
    }

    /// Builds a manager with default collaborators: an in-process session
    /// store, no local store and a reqwest transport.
    pub fn new(config: CacheConfig) -> Self {
        Self::builder(config).build()
    }

    /// Builds a manager from `config`, opening the local tier's file when
    /// `local_store_path` is set.
    pub async fn from_config(config: CacheConfig) -> Result<Self> {
        let mut builder = Self::builder(config.clone());
        if let Some(path) = &config.local_store_path {
            let store = FileStore::open(path).await?;
            info!("Local cache tier backed by {}", store.path().display());
            builder = builder.local_store(Arc::new(store));
        }
        Ok(builder.build())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Memory Tier ==
    /// Reads from memory.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get_memory(key)
    }

    /// Writes to memory if the active strategy admits the entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.inner.set_memory(key.into(), value, ttl);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.remove_memory(key)
    }

    /// Empties memory, resetting its metrics and any strategy bookkeeping.
    pub fn clear_memory(&self) {
        self.inner.clear_memory();
    }

    // == Local Tier ==
    pub async fn get_local(&self, key: &str) -> Option<V> {
        self.inner.local.get(key).await
    }

    /// Writes to the local tier if the active strategy admits the entry.
    pub async fn set_local(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        if !self.inner.admits(key, &value) {
            return Ok(());
        }
        self.inner.local.set(key, &value, ttl).await
    }

    pub async fn remove_local(&self, key: &str) -> Result<()> {
        self.inner.local.remove(key).await
    }

    pub async fn clear_local(&self) -> Result<()> {
        self.inner.local.clear().await
    }

    // == Session Tier ==
    pub async fn get_session(&self, key: &str) -> Option<V> {
        self.inner.session.get(key).await
    }

    /// Writes to the session tier if the active strategy admits the entry.
    pub async fn set_session(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        if !self.inner.admits(key, &value) {
            return Ok(());
        }
        self.inner.session.set(key, &value, ttl).await
    }

    pub async fn remove_session(&self, key: &str) -> Result<()> {
        self.inner.session.remove(key).await
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.inner.session.clear().await
    }

    // == HTTP Cache ==
    pub fn http(&self) -> &HttpCache {
        &self.inner.http
    }

    /// Fetches `url` through the HTTP cache and returns the body.
    pub async fn get_http(&self, url: &str) -> Result<Value> {
        self.inner.http.get(url).await
    }

    /// Fetches `url` from the network and refreshes its cached response.
    pub async fn force_get_http(&self, url: &str) -> Result<Value> {
        self.inner.http.force_get(url).await
    }

    pub async fn clear_http_cache(&self) {
        self.inner.http.clear_cache().await;
    }

    pub async fn clear_http_cache_for_url(&self, url: &str) {
        self.inner.http.clear_cache_for_url(url).await;
    }

    // == Tiered Access ==
    /// Reads memory, then session, then local, stopping at the first hit.
    ///
    /// A durable hit is copied into memory only; the other durable tier is
    /// left alone. The copy never outlives the durable entry: it gets the
    /// entry's remaining lifetime, capped at the memory default TTL.
    pub async fn get_any(&self, key: &str) -> Option<V> {
        if let Some(value) = self.get(key) {
            return Some(value);
        }

        for (name, tier) in [("session", &self.inner.session), ("local", &self.inner.local)] {
            if let Some(envelope) = tier.get_envelope::<V>(key).await {
                let default_ttl = self.inner.config.default_ttl;
                let ttl = envelope
                    .remaining(self.inner.clock.now_ms())
                    .map_or(default_ttl, |remaining| remaining.min(default_ttl));
                debug!("Promoting '{}' from {} tier to memory ({:?})", key, name, ttl);
                self.inner.set_memory(key.to_string(), envelope.data.clone(), Some(ttl));
                return Some(envelope.data);
            }
        }
        None
    }

    /// Writes to exactly one tier, chosen by `options.storage`.
    pub async fn set_any(&self, key: &str, value: V, options: SetOptions) -> Result<()> {
        match options.storage {
            StorageTier::Memory => {
                self.set(key, value, options.ttl);
                Ok(())
            }
            StorageTier::Local => self.set_local(key, value, options.ttl).await,
            StorageTier::Session => self.set_session(key, value, options.ttl).await,
        }
    }

    /// Removes `key` from every tier. All tiers are attempted; the first
    /// durable failure is returned.
    pub async fn remove_any(&self, key: &str) -> Result<()> {
        self.remove(key);
        let local = self.remove_local(key).await;
        let session = self.remove_session(key).await;
        first_err([local, session])
    }

    // == Metrics ==
    pub fn get_metrics(&self) -> ManagerMetrics {
        let (memory, memory_size) = {
            let memory = self.inner.memory.lock();
            (memory.metrics(), memory.size())
        };
        ManagerMetrics {
            memory,
            memory_size,
            http: self.inner.http.stats(),
            strategy: self.inner.strategy.read().name().to_string(),
        }
    }

    /// Entries across memory, local and session tiers.
    pub async fn get_total_size(&self) -> usize {
        let memory = self.inner.memory.lock().size();
        memory + self.inner.local.size().await + self.inner.session.size().await
    }

    // == Strategy ==
    /// Replaces the active strategy. Resident entries are kept.
    pub fn set_strategy(&self, strategy: CacheStrategy) {
        info!("Switching cache strategy to {}", strategy.name());
        *self.inner.strategy.write() = strategy;
    }

    pub fn get_strategy(&self) -> CacheStrategy {
        self.inner.strategy.read().clone()
    }

    // == Warmup ==
    /// Writes a batch of entries concurrently. One failure does not stop
    /// the others; results come back in input order.
    pub async fn warmup(&self, entries: Vec<WarmupEntry<V>>) -> Vec<Result<()>> {
        let writes = entries.into_iter().map(|entry| async move {
            let options = entry.options();
            self.set_any(&entry.key, entry.value, options).await
        });
        let results = join_all(writes).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!("Cache warmup: {} of {} writes failed", failed, results.len());
        } else {
            debug!("Cache warmup: {} entries written", results.len());
        }
        results
    }

    // == Invalidate ==
    /// Removes every key matching `pattern` from memory, local and session
    /// tiers. Returns the number of keys removed.
    pub async fn invalidate(&self, pattern: impl Into<KeyPattern>) -> Result<usize> {
        let regex = pattern.into().compile()?;

        let doomed: Vec<String> = self
            .inner
            .memory
            .lock()
            .keys()
            .into_iter()
            .filter(|key| regex.is_match(key))
            .collect();
        let mut removed = doomed
            .iter()
            .filter(|key| self.inner.remove_memory(key.as_str()))
            .count();

        for tier in [&self.inner.local, &self.inner.session] {
            for key in tier.keys().await {
                if regex.is_match(&key) {
                    tier.remove(&key).await?;
                    removed += 1;
                }
            }
        }

        debug!("Invalidated {} keys matching '{}'", removed, regex.as_str());
        Ok(removed)
    }

    // == Lifecycle ==
    /// Drops expired entries from every tier, plus memory entries the
    /// active strategy flags for eviction. Returns the number removed.
    pub async fn cleanup(&self) -> usize {
        self.inner.cleanup().await
    }

    /// Empties every tier, including the HTTP cache.
    pub async fn clear_all(&self) -> Result<()> {
        self.clear_memory();
        let local = self.clear_local().await;
        let session = self.clear_session().await;
        self.clear_http_cache().await;
        first_err([local, session])
    }

    /// Stops the background sweep and empties every tier.
    ///
    /// Safe to call more than once.
    pub async fn destroy(&self) -> Result<()> {
        self.stop_sweep();
        self.clear_all().await
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn stop_sweep(&self) {
        if let Some(handle) = self.sweep.lock().take() {
            handle.abort();
            info!("Cache sweep task stopped");
        }
    }
}

impl<V: CacheValue> Drop for CacheManager<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep.get_mut().take() {
            handle.abort();
        }
    }
}

// == Builder ==
/// Assembles a [`CacheManager`] from a config and optional collaborators.
pub struct CacheManagerBuilder<V> {
    config: CacheConfig,
    local_store: Option<Arc<dyn KeyValueStore>>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    transport: Option<Arc<dyn HttpTransport>>,
    clock: Option<Arc<dyn Clock>>,
    strategy: Option<CacheStrategy>,
    http_predicate: Option<ResponsePredicate>,
    _value: PhantomData<fn() -> V>,
}

impl<V: CacheValue> CacheManagerBuilder<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            local_store: None,
            session_store: None,
            transport: None,
            clock: None,
            strategy: None,
            http_predicate: None,
            _value: PhantomData,
        }
    }

    /// Backing store of the local tier, shared with the durable HTTP tier.
    pub fn local_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Backing store of the session tier (default: a fresh `MemoryStore`).
    pub fn session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the strategy named in the config.
    pub fn strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn http_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &HttpResponse) -> bool + Send + Sync + 'static,
    {
        self.http_predicate = Some(Arc::new(predicate));
        self
    }

    /// Builds the manager. The sweep starts only when cleanup is enabled
    /// and a tokio runtime is running.
    pub fn build(self) -> CacheManager<V> {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(system_clock);

        let local = match &self.local_store {
            Some(store) => DurableStorage::new(store.clone(), config.local_prefix.as_str(), clock.clone()),
            None => DurableStorage::unavailable(config.local_prefix.as_str(), clock.clone()),
        };
        let session_store = self
            .session_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let session = DurableStorage::new(session_store, config.session_prefix.as_str(), clock.clone());

        let http_durable = match &self.local_store {
            Some(store) => {
                DurableStorage::new(store.clone(), config.http.storage_prefix.as_str(), clock.clone())
            }
            None => DurableStorage::unavailable(config.http.storage_prefix.as_str(), clock.clone()),
        };
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        let mut http = HttpCache::new(config.http.clone(), transport, http_durable, clock.clone());
        if let Some(predicate) = self.http_predicate {
            http = http.with_predicate(move |url, response| predicate(url, response));
        }

        let strategy = self
            .strategy
            .unwrap_or_else(|| CacheStrategy::from_kind(config.strategy));
        let memory = MemoryCache::with_clock(config.max_size, Some(config.default_ttl), clock.clone());

        let inner = Arc::new(ManagerInner {
            memory: Mutex::new(memory),
            local,
            session,
            http,
            strategy: RwLock::new(strategy),
            clock,
            config,
        });

        let sweep = if inner.config.enable_cleanup && !inner.config.cleanup_interval.is_zero() {
            match Handle::try_current() {
                Ok(_) => Some(spawn_sweep_task(
                    inner.clone() as Arc<dyn Sweep>,
                    inner.config.cleanup_interval,
                )),
                Err(_) => {
                    warn!("No tokio runtime; cache sweep disabled");
                    None
                }
            }
        } else {
            None
        };

        CacheManager {
            inner,
            sweep: Mutex::new(sweep),
        }
    }
}
