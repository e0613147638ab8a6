//! proxy_fetch tool implementation.
//!
//! Offers one request to the arbiter exactly as a page would issue it and
//! reports which strategy answered and where the response came from.

use std::collections::BTreeMap;

use http::{HeaderName, HeaderValue, Method};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::{CacheArbiter, Interception, ResponseSource, Strategy, resolve};
use waystation_core::{Destination, ProxyRequest};

use super::{body_text, json_result};
use crate::error::ToolError;

/// Input parameters for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination; "document" marks a navigation.
    #[serde(default)]
    pub destination: Destination,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, sent as-is.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// False when the scheme is not one the arbiter handles.
    pub intercepted: bool,
    pub strategy: Option<Strategy>,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub body_bytes: usize,
}

fn parse_method(method: &str) -> Result<Method, ToolError> {
    let method = method.trim().to_ascii_uppercase();
    if method.is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()));
    }
    Method::from_bytes(method.as_bytes()).map_err(|e| ToolError::InvalidInput(format!("method {method}: {e}")))
}

fn build_request(arbiter: &CacheArbiter, params: ProxyFetchParams) -> Result<ProxyRequest, ToolError> {
    let url = resolve(arbiter.origin(), &params.url).map_err(|e| ToolError::InvalidInput(format!("url: {e}")))?;
    let method = parse_method(&params.method)?;

    let mut request = ProxyRequest::new(method, url).with_destination(params.destination);
    for (name, value) in params.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| ToolError::InvalidInput(format!("header {name}: {e}")))?;
        HeaderValue::from_str(&value).map_err(|e| ToolError::InvalidInput(format!("header {name}: {e}")))?;
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the proxy_fetch tool.
pub async fn proxy_fetch_impl(arbiter: &CacheArbiter, params: ProxyFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(arbiter, params)?;
    let url = request.url.to_string();

    let output = match arbiter.handle(&request).await? {
        Interception::Passthrough => ProxyFetchOutput {
            url,
            intercepted: false,
            strategy: None,
            source: None,
            status: None,
            headers: Vec::new(),
            body: None,
            body_bytes: 0,
        },
        Interception::Handled(served) => ProxyFetchOutput {
            url,
            intercepted: true,
            strategy: Some(served.strategy),
            source: Some(served.source),
            status: Some(served.response.status.as_u16()),
            body: Some(body_text(&served.response.body)),
            body_bytes: served.response.body.len(),
            headers: served.response.headers,
        },
    };

    json_result(&output)
}
