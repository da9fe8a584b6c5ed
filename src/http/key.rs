//! Cache key derivation and response cacheability rules.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use url::form_urlencoded;

use crate::http::HttpResponse;

static API_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(^|/)api(/|$)").ok());

static STATIC_ASSET: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\.(js|mjs|css|map|png|jpe?g|gif|svg|webp|avif|ico|woff2?|ttf|otf|eot)$").ok()
});

/// Splits a URL into the part before the query and the raw query string.
/// Fragments are dropped.
fn split_url(url: &str) -> (&str, &str) {
    let url = url.split('#').next().unwrap_or(url);
    match url.split_once('?') {
        Some((base, query)) => (base, query),
        None => (url, ""),
    }
}

/// Path component of an absolute or relative URL.
fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => split_url(url).0.to_string(),
    }
}

// == Derive Cache Key ==
/// Builds the cache key for a request.
///
/// The key is the URL without its query, followed by the URL's query
/// parameters merged with `params`, sorted, so parameter order never
/// matters.
pub fn derive_cache_key(url: &str, params: &[(String, String)]) -> String {
    let (base, query) = split_url(url);

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    pairs.extend(params.iter().cloned());
    if pairs.is_empty() {
        return base.to_string();
    }
    pairs.sort();

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{}?{}", base, encoded)
}

// == Parse Max Age ==
/// Reads `max-age=N` from `Cache-Control`, in seconds.
pub fn parse_max_age(headers: &HeaderMap) -> Option<Duration> {
    cache_control_directives(headers).find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        value.trim().trim_matches('"').parse::<u64>().ok().map(Duration::from_secs)
    })
}

/// Whether `Cache-Control` forbids storing the response.
pub fn is_no_store(headers: &HeaderMap) -> bool {
    cache_control_directives(headers).any(|directive| directive.eq_ignore_ascii_case("no-store"))
}

fn cache_control_directives(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|directive| directive.trim().to_string())
        .filter(|directive| !directive.is_empty())
}

// == Default Predicate ==
/// Default cacheability rule: never URLs with an `api` path segment; only
/// URLs whose path ends in a static-asset extension.
pub fn default_should_cache(url: &str, _response: &HttpResponse) -> bool {
    let path = url_path(url);
    let is_api = API_SEGMENT.as_ref().is_some_and(|re| re.is_match(&path));
    if is_api {
        return false;
    }
    STATIC_ASSET.as_ref().is_some_and(|re| re.is_match(&path))
}
