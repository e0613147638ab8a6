//! cache_get tool implementation.
//!
//! Retrieves the cached response for a URL, from a named partition or from
//! the serving generation (static partition first).

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::{CacheArbiter, resolve};
use waystation_core::{CacheStore, Error, ProxyRequest};

use crate::error::ToolError;
use crate::tools::{body_text, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Partition to read; defaults to the serving static then dynamic partitions.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub partition: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(arbiter: &CacheArbiter, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(arbiter.origin(), &params.url).map_err(|e| ToolError::InvalidInput(format!("url: {e}")))?;
    let request = ProxyRequest::get(url);

    let candidates: Vec<String> = match params.partition {
        Some(name) => vec![name],
        None => arbiter.serving_version().await.live_partitions().to_vec(),
    };

    for partition in candidates {
        if let Some(response) = arbiter.store().match_request(&partition, &request).await? {
            let output = CacheGetOutput {
                partition,
                url: request.url.to_string(),
                status: response.status.as_u16(),
                body: body_text(&response.body),
                body_bytes: response.body.len(),
                headers: response.headers,
            };
            return json_result(&output);
        }
    }

    Err(Error::CacheMiss(request.url.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{arbiter, output};
    use http::StatusCode;
    use waystation_core::{CacheStore, MemoryStore, ProxyResponse};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let request = ProxyRequest::get("https://shop.example.com/api/items".parse().unwrap());
        let response = ProxyResponse::new(StatusCode::OK, "[\"milk\"]").with_header("Content-Type", "application/json");
        store.put("dynamic-v1", &request, &response).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_searches_live_partitions() {
        let arbiter = arbiter("https://shop.example.com", &["/"], seeded().await);

        let params = CacheGetParams { url: "/api/items".into(), partition: None };
        let out = output(&get_impl(&arbiter, params).await.unwrap());

        assert_eq!(out["partition"], "dynamic-v1");
        assert_eq!(out["status"], 200);
        assert_eq!(out["body"], "[\"milk\"]");
        assert_eq!(out["headers"][0], serde_json::json!(["Content-Type", "application/json"]));
    }

    #[tokio::test]
    async fn test_get_named_partition_miss() {
        let arbiter = arbiter("https://shop.example.com", &["/"], seeded().await);

        let params = CacheGetParams { url: "/api/items".into(), partition: Some("static-v1".into()) };
        let err = get_impl(&arbiter, params).await.unwrap_err();

        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_invalid_url() {
        let arbiter = arbiter("https://shop.example.com", &["/"], MemoryStore::new());

        let params = CacheGetParams { url: "".into(), partition: None };
        let err = get_impl(&arbiter, params).await.unwrap_err();

        assert_eq!(err.code.0, -32602);
    }
}
