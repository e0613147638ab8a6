//! The two retrieval strategies.
//!
//! Both try the network first. They differ in where a response is stored,
//! how non-ok responses are treated, and what happens to non-GET requests.

use std::fmt;

use serde::Serialize;
use waystation_core::{Error, Partition, ProxyRequest, ProxyResponse};

use super::CacheArbiter;
use super::observer::ArbiterEvent;

/// Body of the 503 returned when a static asset cannot be loaded.
pub const RESOURCE_ERROR_BODY: &str = "Failed to load resource: the network is unreachable and no cached copy exists.";

/// Body of the 503 returned when dynamic content is requested offline.
pub const OFFLINE_BODY: &str = "You are offline. This content is not available until the connection is restored.";

/// Which strategy handled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirst => "network_first",
        })
    }
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    DefaultDocument,
    Synthetic,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::DefaultDocument => "default_document",
            ResponseSource::Synthetic => "synthetic",
        })
    }
}

/// A response together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub strategy: Strategy,
    pub source: ResponseSource,
    pub response: ProxyResponse,
}

impl Served {
    fn new(strategy: Strategy, source: ResponseSource, response: ProxyResponse) -> Self {
        Self { strategy, source, response }
    }
}

impl CacheArbiter {
    /// Static assets: network, then static partition, then the network's
    /// non-ok response, then the default document or a 503.
    pub(crate) async fn cache_first(&self, request: &ProxyRequest) -> Served {
        let partition = self.serving_partition(Partition::Static).await;

        let unusable = match self.network.fetch(request).await {
            Ok(response) if response.is_ok() => {
                self.store_quietly(&partition, request, &response).await;
                return Served::new(Strategy::CacheFirst, ResponseSource::Network, response);
            }
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status.as_u16(), "static asset not ok");
                Some(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "static asset fetch failed");
                None
            }
        };

        if let Some(cached) = self.lookup(&partition, request).await {
            return Served::new(Strategy::CacheFirst, ResponseSource::Cache, cached);
        }

        if let Some(response) = unusable {
            return Served::new(Strategy::CacheFirst, ResponseSource::Network, response);
        }

        self.offline_fallback(request, Strategy::CacheFirst, RESOURCE_ERROR_BODY).await
    }

    /// Dynamic requests. Non-GET requests go straight to the network and
    /// their failures propagate; GET requests fall back to the dynamic
    /// partition, then the default document or a 503.
    pub(crate) async fn network_first(&self, request: &ProxyRequest) -> Result<Served, Error> {
        if !request.is_get() {
            let response = self.network.fetch(request).await?;
            return Ok(Served::new(Strategy::NetworkFirst, ResponseSource::Network, response));
        }

        let partition = self.serving_partition(Partition::Dynamic).await;

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_quietly(&partition, request, &response).await;
                }
                return Ok(Served::new(Strategy::NetworkFirst, ResponseSource::Network, response));
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable, trying cache");
            }
        }

        if let Some(cached) = self.lookup(&partition, request).await {
            return Ok(Served::new(Strategy::NetworkFirst, ResponseSource::Cache, cached));
        }

        Ok(self.offline_fallback(request, Strategy::NetworkFirst, OFFLINE_BODY).await)
    }

    async fn offline_fallback(&self, request: &ProxyRequest, strategy: Strategy, body: &'static str) -> Served {
        if request.destination.is_document()
            && let Some(document) = self.default_document().await
        {
            return Served::new(strategy, ResponseSource::DefaultDocument, document);
        }
        Served::new(strategy, ResponseSource::Synthetic, ProxyResponse::service_unavailable(body))
    }

    /// The cached default document from the serving generation, static partition first.
    async fn default_document(&self) -> Option<ProxyResponse> {
        let request = ProxyRequest::get(self.default_document_url.clone());
        let partitions = self.serving.read().await.live_partitions();
        for partition in partitions {
            if let Some(document) = self.lookup(&partition, &request).await {
                return Some(document);
            }
        }
        None
    }

    /// Cache read where a storage failure counts as a miss.
    async fn lookup(&self, partition: &str, request: &ProxyRequest) -> Option<ProxyResponse> {
        match self.store.match_request(partition, request).await {
            Ok(hit) => {
                tracing::debug!(%partition, url = %request.url, hit = hit.is_some(), "cache lookup");
                hit
            }
            Err(e) => {
                self.observer.observe(&ArbiterEvent::CacheReadFailed {
                    partition: partition.to_string(),
                    url: request.url.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Cache write whose failure never reaches the caller.
    ///
    /// The write is awaited before the response is handed back, so the entry
    /// is visible to the very next lookup. That costs one store write of
    /// latency on every cacheable network hit.
    async fn store_quietly(&self, partition: &str, request: &ProxyRequest, response: &ProxyResponse) {
        if let Err(e) = self.store.put(partition, request, response).await {
            self.observer.observe(&ArbiterEvent::CacheWriteFailed {
                partition: partition.to_string(),
                url: request.url.to_string(),
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, StatusCode};
    use waystation_core::{CacheStore, MemoryStore, StaticManifest};

    use super::super::testing::*;
    use super::*;
    use crate::arbiter::Interception;

    const STATIC: &str = "static-v1";
    const DYNAMIC: &str = "dynamic-v1";

    fn harness() -> Harness {
        Harness::new(&["/index.html", "/app.js", "/styles.css"])
    }

    async fn serve(harness: &Harness, request: &ProxyRequest) -> Served {
        match harness.arbiter.handle(request).await.unwrap() {
            Interception::Handled(served) => served,
            Interception::Passthrough => panic!("{} was not intercepted", request.url),
        }
    }

    async fn seed(harness: &Harness, partition: &str, path: &str, body: &str) {
        let response = ProxyResponse::new(StatusCode::OK, body.to_string());
        harness.store.put(partition, &harness.get(path), &response).await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_first_returns_network_and_persists_clone() {
        let harness = harness();
        harness.network.respond("/app.js", StatusCode::OK, "v2 bundle");

        let served = serve(&harness, &harness.get("/app.js")).await;
        assert_eq!(served.strategy, Strategy::CacheFirst);
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(&served.response.body[..], b"v2 bundle");

        let cached = harness.store.match_request(STATIC, &harness.get("/app.js")).await.unwrap().unwrap();
        assert_eq!(cached.status, served.response.status);
        assert_eq!(cached.body, served.response.body);
        assert_eq!(harness.store.entry_count(DYNAMIC).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_offline_uses_static_partition() {
        let harness = harness();
        seed(&harness, STATIC, "/styles.css", "body{}").await;
        harness.network.set_offline(true);

        let served = serve(&harness, &harness.get("/styles.css")).await;
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(&served.response.body[..], b"body{}");
    }

    #[tokio::test]
    async fn test_cache_first_not_ok_prefers_cache() {
        let harness = harness();
        seed(&harness, STATIC, "/app.js", "cached bundle").await;
        harness.network.respond("/app.js", StatusCode::INTERNAL_SERVER_ERROR, "boom");

        let served = serve(&harness, &harness.get("/app.js")).await;
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(&served.response.body[..], b"cached bundle");
    }

    #[tokio::test]
    async fn test_cache_first_not_ok_without_cache_returns_network_response() {
        let harness = harness();

        let served = serve(&harness, &harness.get("/app.js")).await;
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.status, StatusCode::NOT_FOUND);
        assert_eq!(harness.store.entry_count(STATIC).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_offline_document_gets_default_document() {
        let harness = harness();
        seed(&harness, STATIC, "/index.html", "<html>shell</html>").await;
        harness.network.set_offline(true);

        let served = serve(&harness, &harness.navigate("/index.html?from=home")).await;
        assert_eq!(served.source, ResponseSource::DefaultDocument);
        assert_eq!(&served.response.body[..], b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_cache_first_offline_asset_gets_resource_error() {
        let harness = harness();
        harness.network.set_offline(true);

        let served = serve(&harness, &harness.get("/app.js")).await;
        assert_eq!(served.source, ResponseSource::Synthetic);
        assert_eq!(served.response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(served.response.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(&served.response.body[..], RESOURCE_ERROR_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_network_first_stores_ok_get_in_dynamic_partition() {
        let harness = harness();
        harness.network.respond("/api/items", StatusCode::OK, "[\"milk\"]");

        let served = serve(&harness, &harness.get("/api/items")).await;
        assert_eq!(served.strategy, Strategy::NetworkFirst);
        assert_eq!(served.source, ResponseSource::Network);

        let cached = harness.store.match_request(DYNAMIC, &harness.get("/api/items")).await.unwrap();
        assert_eq!(cached.unwrap().body, served.response.body);
        assert_eq!(harness.store.entry_count(STATIC).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_network_first_returns_but_does_not_store_not_ok() {
        let harness = harness();
        harness.network.respond("/api/items", StatusCode::BAD_GATEWAY, "upstream down");

        let served = serve(&harness, &harness.get("/api/items")).await;
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(harness.store.entry_count(DYNAMIC).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_network_first_offline_fallback_chain() {
        let harness = harness();
        seed(&harness, DYNAMIC, "/api/items", "[\"cached\"]").await;
        seed(&harness, STATIC, "/index.html", "<html>shell</html>").await;
        harness.network.set_offline(true);

        let cached = serve(&harness, &harness.get("/api/items")).await;
        assert_eq!(cached.source, ResponseSource::Cache);
        assert_eq!(&cached.response.body[..], b"[\"cached\"]");

        let page = serve(&harness, &harness.navigate("/lists/42")).await;
        assert_eq!(page.source, ResponseSource::DefaultDocument);
        assert_eq!(&page.response.body[..], b"<html>shell</html>");

        let api = serve(&harness, &harness.get("/api/other")).await;
        assert_eq!(api.source, ResponseSource::Synthetic);
        assert_eq!(api.response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&api.response.body[..], OFFLINE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_default_document_found_in_dynamic_partition() {
        let harness = harness();
        seed(&harness, DYNAMIC, "/index.html", "<html>dynamic shell</html>").await;
        harness.network.set_offline(true);

        let page = serve(&harness, &harness.navigate("/settings")).await;
        assert_eq!(page.source, ResponseSource::DefaultDocument);
        assert_eq!(&page.response.body[..], b"<html>dynamic shell</html>");
    }

    #[tokio::test]
    async fn test_document_without_default_document_gets_offline_notice() {
        let harness = harness();
        harness.network.set_offline(true);

        let page = serve(&harness, &harness.navigate("/settings")).await;
        assert_eq!(page.source, ResponseSource::Synthetic);
        assert_eq!(&page.response.body[..], OFFLINE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_non_get_never_touches_cache() {
        let harness = harness();
        seed(&harness, DYNAMIC, "/api/save", "stale").await;
        harness.network.respond("/api/save", StatusCode::CREATED, "saved");

        let served = serve(&harness, &harness.request(Method::POST, "/api/save")).await;
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.status, StatusCode::CREATED);
        assert_eq!(harness.store.entry_count(DYNAMIC).await.unwrap(), 1);

        let cached = harness.store.match_request(DYNAMIC, &harness.get("/api/save")).await.unwrap().unwrap();
        assert_eq!(&cached.body[..], b"stale");
    }

    #[tokio::test]
    async fn test_non_get_network_failure_propagates() {
        let harness = harness();
        seed(&harness, DYNAMIC, "/api/items/1", "cached item").await;
        harness.network.set_offline(true);

        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let result = harness.arbiter.handle(&harness.request(method, "/api/items/1")).await;
            assert!(matches!(result, Err(Error::Network(_))));
        }
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_swallowed() {
        let manifest = StaticManifest::new(vec!["/app.js".into()]);
        let harness = Harness::build("v1", manifest, MemoryStore::with_quota(0), true);
        harness.network.respond("/api/items", StatusCode::OK, "[]");
        harness.network.respond("/app.js", StatusCode::OK, "bundle");

        let api = serve(&harness, &harness.get("/api/items")).await;
        let asset = serve(&harness, &harness.get("/app.js")).await;

        assert_eq!(api.response.status, StatusCode::OK);
        assert_eq!(asset.response.status, StatusCode::OK);
        let failures = harness
            .observer
            .events()
            .into_iter()
            .filter(|e| matches!(e, ArbiterEvent::CacheWriteFailed { .. }))
            .count();
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn test_cache_read_failure_counts_as_miss() {
        let store = MemoryStore::new();
        let manifest = StaticManifest::new(vec!["/app.js".into()]);
        let handle = Arc::new(UnreadableStore(store.clone()));
        let harness = Harness::build_with_store("v1", manifest, store, handle, true);
        harness.network.set_offline(true);

        let served = serve(&harness, &harness.get("/api/items")).await;
        assert_eq!(served.source, ResponseSource::Synthetic);
        assert!(
            harness
                .observer
                .events()
                .iter()
                .any(|e| matches!(e, ArbiterEvent::CacheReadFailed { partition, .. } if partition == DYNAMIC))
        );
    }
}
