//! HTTP Transport Module
//!
//! Request/response types seen by the HTTP cache and the transport seam it
//! wraps.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Header that forces a live fetch when set to `true`.
pub const CACHE_BYPASS_HEADER: &str = "x-cache-bypass";

// == HTTP Request ==
/// Outbound request: method, URL, extra query params and headers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Adds a query parameter sent alongside the URL's own query.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Marks the request to skip cache lookup.
    pub fn bypass_cache(self) -> Self {
        self.header(
            HeaderName::from_static(CACHE_BYPASS_HEADER),
            HeaderValue::from_static("true"),
        )
    }

    pub fn is_bypass(&self) -> bool {
        self.headers
            .get(CACHE_BYPASS_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

// == HTTP Response ==
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    /// Body, parsed as JSON when possible, otherwise a JSON string
    pub data: Value,
    /// Set when the response was served by the cache
    pub from_cache: bool,
}

impl HttpResponse {
    pub fn new(status: StatusCode, data: Value) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            data,
            from_cache: false,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

// == HTTP Transport ==
/// Sends requests over the network. The cache never implements transport
/// itself; it wraps one of these.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

// == Reqwest Transport ==
/// Transport over a shared `reqwest::Client`.
///
/// Non-2xx statuses are returned as responses, not errors.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.params)
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(CacheError::transport)?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(CacheError::transport)?;
        let data = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text));

        Ok(HttpResponse {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            data,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_flag() {
        let request = HttpRequest::get("/assets/app.js");
        assert!(!request.is_bypass());
        assert!(request.bypass_cache().is_bypass());
    }

    #[test]
    fn test_params_accumulate() {
        let request = HttpRequest::get("/search").param("q", "rust").param("page", "2");
        assert_eq!(
            request.params,
            vec![
                ("q".to_string(), "rust".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_response_status_text() {
        let response = HttpResponse::new(StatusCode::NOT_FOUND, Value::Null);
        assert_eq!(response.status_text, "Not Found");
        assert!(!response.from_cache);
    }
}
