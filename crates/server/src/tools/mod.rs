//! MCP tool implementations.
//!
//! This module contains all tools exposed by the waystation server.

pub mod cache;
pub mod control;
pub mod lifecycle;
pub mod proxy;

pub use cache::CacheGetParams;
pub use control::ControlParams;
pub use proxy::ProxyFetchParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Pretty-print a tool's output as its single text content block.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::OutputFailed(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Body bytes as text for tool output; binary bodies are lossily decoded.
pub(crate) fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use rmcp::model::CallToolResult;
    use waystation_client::{ArbiterSettings, CacheArbiter, FetchClient, FetchConfig};
    use waystation_core::{CacheStore, MemoryStore, StaticManifest, VersionRegistry};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Arbiter over a memory store whose origin is `origin`.
    pub fn arbiter(origin: &str, paths: &[&str], store: MemoryStore) -> Arc<CacheArbiter> {
        let settings = ArbiterSettings {
            origin: origin.parse().unwrap(),
            default_document: "/index.html".into(),
            skip_waiting: true,
        };
        let manifest = StaticManifest::new(paths.iter().map(|p| p.to_string()).collect());
        let handle: Arc<dyn CacheStore> = Arc::new(store);
        let network = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        Arc::new(CacheArbiter::new(VersionRegistry::new("v1"), manifest, settings, handle, network).unwrap())
    }

    /// Serve `body` for GET `route` on the mock origin.
    pub async fn serve(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    /// Parse the JSON text block of a tool result.
    pub fn output(result: &CallToolResult) -> serde_json::Value {
        let text = result
            .content
            .first()
            .and_then(|c| c.as_text())
            .expect("Expected text content");
        serde_json::from_str(&text.text).unwrap()
    }
}
