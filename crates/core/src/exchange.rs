//! Request and response snapshots exchanged between the host, the
//! arbiter, the network and the cache store.

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::hash::compute_request_key;

/// Content type used for every synthetic response.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// What the requesting page intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Top-level navigation.
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    /// `fetch()` / XHR calls.
    #[default]
    Empty,
    Other,
}

impl Destination {
    pub fn is_document(self) -> bool {
        matches!(self, Destination::Document)
    }
}

/// An intercepted outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    /// Build a request; the URL fragment is dropped since it never reaches the wire.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url, destination: Destination::Empty, headers: Vec::new(), body: None }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether the scheme is one the arbiter intercepts.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Storage key for this request's identity (method + URL).
    pub fn cache_key(&self) -> String {
        compute_request_key(self.method.as_str(), self.url.as_str())
    }
}

/// Immutable snapshot of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    /// A 503 plain-text response produced locally when nothing else can answer.
    pub fn service_unavailable(message: &'static str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, Bytes::from_static(message.as_bytes()))
            .with_header("Content-Type", TEXT_PLAIN_UTF8)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx, matching the fetch API's `Response.ok`.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fragment_stripped() {
        let request = ProxyRequest::get(url("https://example.com/index.html#top"));
        assert_eq!(request.url.as_str(), "https://example.com/index.html");
    }

    #[test]
    fn test_cache_key_ignores_fragment() {
        let a = ProxyRequest::get(url("https://example.com/app.js#a"));
        let b = ProxyRequest::get(url("https://example.com/app.js"));
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_depends_on_method_and_query() {
        let get = ProxyRequest::get(url("https://example.com/api/items"));
        let post = ProxyRequest::new(Method::POST, url("https://example.com/api/items"));
        let query = ProxyRequest::get(url("https://example.com/api/items?page=2"));
        assert_ne!(get.cache_key(), post.cache_key());
        assert_ne!(get.cache_key(), query.cache_key());
    }

    #[test]
    fn test_is_http() {
        assert!(ProxyRequest::get(url("http://example.com/")).is_http());
        assert!(ProxyRequest::get(url("https://example.com/")).is_http());
        assert!(!ProxyRequest::get(url("chrome-extension://abc/script.js")).is_http());
        assert!(!ProxyRequest::get(url("data:text/plain,hi")).is_http());
    }

    #[test]
    fn test_service_unavailable() {
        let response = ProxyResponse::service_unavailable("offline");
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.header("content-type"), Some(TEXT_PLAIN_UTF8));
        assert_eq!(&response.body[..], b"offline");
        assert!(!response.is_ok());
    }

    #[test]
    fn test_destination_serde() {
        let dest: Destination = serde_json::from_str("\"document\"").unwrap();
        assert!(dest.is_document());
        assert_eq!(serde_json::to_string(&Destination::Empty).unwrap(), "\"empty\"");
    }
}
