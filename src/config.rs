//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Method;

use crate::strategy::StrategyKind;

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// HTTP response cache configuration.
#[derive(Debug, Clone)]
pub struct HttpCacheConfig {
    /// Maximum number of responses held in memory
    pub max_size: usize,
    /// TTL for responses without `Cache-Control: max-age`
    pub default_ttl: Duration,
    /// Key prefix in the durable tier
    pub storage_prefix: String,
    /// Methods whose responses may be cached
    pub cacheable_methods: Vec<Method>,
    /// Statuses whose responses may be cached
    pub cacheable_statuses: Vec<u16>,
}

impl HttpCacheConfig {
    /// # Environment Variables
    /// - `HTTP_CACHE_MAX_SIZE` - Responses kept in memory (default: 100)
    /// - `HTTP_CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `HTTP_CACHE_PREFIX` - Durable key prefix (default: `http_cache_`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: env_or("HTTP_CACHE_MAX_SIZE", defaults.max_size),
            default_ttl: env_secs_or("HTTP_CACHE_DEFAULT_TTL", defaults.default_ttl),
            storage_prefix: env_or("HTTP_CACHE_PREFIX", defaults.storage_prefix),
            ..defaults
        }
    }
}

impl Default for HttpCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            default_ttl: Duration::from_secs(300),
            storage_prefix: "http_cache_".to_string(),
            cacheable_methods: vec![Method::GET],
            cacheable_statuses: vec![200, 201, 304],
        }
    }
}

/// Cache manager configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the memory tier
    pub max_size: usize,
    /// TTL for memory entries written without one
    pub default_ttl: Duration,
    /// Interval between background sweeps
    pub cleanup_interval: Duration,
    /// Whether to run the background sweep at all
    pub enable_cleanup: bool,
    /// Key prefix of the local (persistent) tier
    pub local_prefix: String,
    /// Key prefix of the session tier
    pub session_prefix: String,
    /// File backing the local tier; None leaves the tier unavailable
    pub local_store_path: Option<PathBuf>,
    /// Active strategy at startup
    pub strategy: StrategyKind,
    pub http: HttpCacheConfig,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Memory tier capacity (default: 100)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `CACHE_ENABLE_CLEANUP` - Run the background sweep (default: true)
    /// - `CACHE_LOCAL_PREFIX` - Local tier key prefix (default: `cache_`)
    /// - `CACHE_SESSION_PREFIX` - Session tier key prefix (default: `session_cache_`)
    /// - `CACHE_LOCAL_STORE_PATH` - File for the local tier (default: unset)
    /// - `CACHE_STRATEGY` - Strategy name (default: `ttl`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: env_or("CACHE_MAX_SIZE", defaults.max_size),
            default_ttl: env_secs_or("CACHE_DEFAULT_TTL", defaults.default_ttl),
            cleanup_interval: env_secs_or("CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval),
            enable_cleanup: env_or("CACHE_ENABLE_CLEANUP", defaults.enable_cleanup),
            local_prefix: env_or("CACHE_LOCAL_PREFIX", defaults.local_prefix),
            session_prefix: env_or("CACHE_SESSION_PREFIX", defaults.session_prefix),
            local_store_path: env::var("CACHE_LOCAL_STORE_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            strategy: env_or("CACHE_STRATEGY", defaults.strategy),
            http: HttpCacheConfig::from_env(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            default_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(300),
            enable_cleanup: true,
            local_prefix: "cache_".to_string(),
            session_prefix: "session_cache_".to_string(),
            local_store_path: None,
            strategy: StrategyKind::Ttl,
            http: HttpCacheConfig::default(),
        }
    }
}
