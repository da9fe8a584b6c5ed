//! Cache Value Module
//!
//! Describes what a cacheable value looks like to admission strategies:
//! its runtime kind and an estimated byte size.

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Value Kind ==
/// Runtime shape of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ValueKind {
    pub const ALL: [ValueKind; 5] = [
        ValueKind::String,
        ValueKind::Number,
        ValueKind::Boolean,
        ValueKind::Object,
        ValueKind::Array,
    ];
}

// == Cache Value ==
/// A value that can live in any tier.
///
/// The default size estimate is twice the length of the JSON encoding,
/// matching two bytes per UTF-16 code unit.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn kind(&self) -> ValueKind;

    fn estimated_size(&self) -> usize {
        serde_json::to_string(self)
            .map(|json| json.len() * 2)
            .unwrap_or(0)
    }
}

fn utf16_bytes(s: &str) -> usize {
    s.encode_utf16().count() * 2
}

impl CacheValue for String {
    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn estimated_size(&self) -> usize {
        utf16_bytes(self)
    }
}

impl CacheValue for bool {
    fn kind(&self) -> ValueKind {
        ValueKind::Boolean
    }
}

macro_rules! impl_number_value {
    ($($t:ty),*) => {
        $(
            impl CacheValue for $t {
                fn kind(&self) -> ValueKind {
                    ValueKind::Number
                }
            }
        )*
    };
}

impl_number_value!(i32, i64, u32, u64, usize, f32, f64);

impl<T: CacheValue> CacheValue for Vec<T> {
    fn kind(&self) -> ValueKind {
        ValueKind::Array
    }
}

impl<T: CacheValue> CacheValue for HashMap<String, T> {
    fn kind(&self) -> ValueKind {
        ValueKind::Object
    }
}

impl<T: CacheValue> CacheValue for BTreeMap<String, T> {
    fn kind(&self) -> ValueKind {
        ValueKind::Object
    }
}

impl CacheValue for Value {
    fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Array(_) => ValueKind::Array,
            // null reports as an object
            Value::Object(_) | Value::Null => ValueKind::Object,
        }
    }

    fn estimated_size(&self) -> usize {
        match self {
            Value::String(s) => utf16_bytes(s),
            other => serde_json::to_string(other)
                .map(|json| json.len() * 2)
                .unwrap_or(0),
        }
    }
}
