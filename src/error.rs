//! Error types for the cache subsystem
//!
//! Provides unified error handling using thiserror. Misses, expiry and
//! strategy rejections are not errors; only failures a caller can act on
//! surface through these types.

use thiserror::Error;

/// Boxed error produced by an HTTP transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// == Store Error Enum ==
/// Failures reported by a durable key-value backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused the write because its quota is exhausted
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// The store cannot be used in the current execution context
    #[error("Storage unavailable")]
    Unavailable,

    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted store contents could not be decoded
    #[error("Corrupt storage contents: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// == Cache Error Enum ==
/// Unified error type for the cache subsystem.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A durable tier failed and could not recover locally
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A value could not be encoded into an envelope
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An invalidation or key pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The HTTP transport failed; propagated unchanged
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),
}

impl CacheError {
    /// Wraps any transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        CacheError::Transport(err.into())
    }

    /// Returns true if this error is a quota failure that survived the retry.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::Storage(StoreError::QuotaExceeded))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_detection() {
        let err = CacheError::from(StoreError::QuotaExceeded);
        assert!(err.is_quota_exceeded());

        let err = CacheError::from(StoreError::Unavailable);
        assert!(!err.is_quota_exceeded());
    }

    #[test]
    fn test_error_messages() {
        let err = CacheError::from(StoreError::QuotaExceeded);
        assert_eq!(err.to_string(), "Storage error: Storage quota exceeded");

        let err = CacheError::transport("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_invalid_pattern_conversion() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: CacheError = regex_err.into();
        assert!(matches!(err, CacheError::InvalidPattern(_)));
    }
}
