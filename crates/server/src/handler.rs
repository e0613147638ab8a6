//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use waystation_client::CacheArbiter;

use crate::tools::{CacheGetParams, ControlParams, ProxyFetchParams, cache, control, lifecycle, proxy};

/// The main MCP server handler for waystation.
#[derive(Clone)]
pub struct WaystationServer {
    arbiter: Arc<CacheArbiter>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WaystationServer {
    /// Create a new server handler around a built arbiter.
    pub fn new(arbiter: Arc<CacheArbiter>) -> Self {
        Self { arbiter, tool_router: Self::tool_router() }
    }

    /// Issue a request through the caching proxy.
    #[tool(
        description = "Fetch a URL through the offline cache. Static assets are cache-first, everything else network-first. Returns the response and which strategy and source served it."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        proxy::proxy_fetch_impl(&self.arbiter, params.0).await
    }

    #[tool(description = "Pre-cache the static manifest for the configured version. All-or-nothing.")]
    async fn lifecycle_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.arbiter).await
    }

    #[tool(description = "Activate the configured version: delete caches from other versions and claim clients.")]
    async fn lifecycle_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.arbiter).await
    }

    /// Deliver a control message (`SKIP_WAITING`, `CLEAR_CACHE`).
    #[tool(description = "Send a control message: SKIP_WAITING activates a waiting install, CLEAR_CACHE deletes all caches.")]
    async fn control_message(&self, params: Parameters<ControlParams>) -> Result<CallToolResult, McpError> {
        control::control_impl(&self.arbiter, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts, plus the lifecycle state.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        cache::list_impl(&self.arbiter).await
    }

    #[tool(description = "Retrieve the cached response for a URL from a partition or the live caches.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.arbiter, params.0).await
    }
}

impl ServerHandler for WaystationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "waystation".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
