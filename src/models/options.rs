//! Option and input types for the cache manager.

use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::Result;

// == Storage Tier ==
/// Where a tiered write lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    #[default]
    Memory,
    Local,
    Session,
}

// == Set Options ==
/// Options for a tiered write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub storage: StorageTier,
}

impl SetOptions {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn local() -> Self {
        Self {
            storage: StorageTier::Local,
            ..Self::default()
        }
    }

    pub fn session() -> Self {
        Self {
            storage: StorageTier::Session,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// == Warmup Entry ==
/// One record preloaded by `warmup`.
///
/// Deserializes from `{"key": .., "value": .., "ttl": <seconds>, "storage": ..}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WarmupEntry<V> {
    pub key: String,
    pub value: V,
    #[serde(default, deserialize_with = "de_ttl_secs")]
    pub ttl: Option<Duration>,
    #[serde(default)]
    pub storage: StorageTier,
}

impl<V> WarmupEntry<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: None,
            storage: StorageTier::Memory,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn storage(mut self, storage: StorageTier) -> Self {
        self.storage = storage;
        self
    }

    pub fn options(&self) -> SetOptions {
        SetOptions {
            ttl: self.ttl,
            storage: self.storage,
        }
    }
}

fn de_ttl_secs<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

// == Key Pattern ==
/// Key matcher for invalidation: a regex source string or a compiled regex.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    Source(String),
    Compiled(Regex),
}

impl KeyPattern {
    /// Compiles the pattern if needed.
    pub fn compile(self) -> Result<Regex> {
        match self {
            KeyPattern::Source(source) => Ok(Regex::new(&source)?),
            KeyPattern::Compiled(regex) => Ok(regex),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(source: &str) -> Self {
        KeyPattern::Source(source.to_string())
    }
}

impl From<String> for KeyPattern {
    fn from(source: String) -> Self {
        KeyPattern::Source(source)
    }
}

impl From<Regex> for KeyPattern {
    fn from(regex: Regex) -> Self {
        KeyPattern::Compiled(regex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_entry_deserialize() {
        let json = r#"{"key": "greeting", "value": "hello", "ttl": 60, "storage": "session"}"#;
        let entry: WarmupEntry<String> = serde_json::from_str(json).unwrap();
        assert_eq!(entry.key, "greeting");
        assert_eq!(entry.value, "hello");
        assert_eq!(entry.ttl, Some(Duration::from_secs(60)));
        assert_eq!(entry.storage, StorageTier::Session);
    }

    #[test]
    fn test_warmup_entry_defaults() {
        let json = r#"{"key": "n", "value": 1}"#;
        let entry: WarmupEntry<u32> = serde_json::from_str(json).unwrap();
        assert!(entry.ttl.is_none());
        assert_eq!(entry.options(), SetOptions::memory());
    }

    #[test]
    fn test_key_pattern_compile() {
        assert!(KeyPattern::from("^user:").compile().unwrap().is_match("user:1"));
        assert!(KeyPattern::from("(bad").compile().is_err());
        let compiled = KeyPattern::from(Regex::new("x$").unwrap()).compile().unwrap();
        assert!(compiled.is_match("box"));
    }
}
