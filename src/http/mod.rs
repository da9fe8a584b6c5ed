//! HTTP Module
//!
//! Response caching layered over an HTTP transport.

mod cache;
mod key;
mod transport;

pub use cache::{CachedHttpResponse, HttpCache, Interception, ResponsePredicate};
pub use key::{default_should_cache, derive_cache_key, is_no_store, parse_max_age};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, CACHE_BYPASS_HEADER,
};
