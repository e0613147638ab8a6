//! lifecycle_install and lifecycle_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use waystation_client::CacheArbiter;

use super::json_result;

/// Implementation of the lifecycle_install tool.
///
/// Re-runs pre-caching for the configured version. On failure nothing is
/// stored and the previous generation stays live.
pub async fn install_impl(arbiter: &CacheArbiter) -> Result<CallToolResult, McpError> {
    let report = arbiter.on_install().await?;
    json_result(&report)
}

/// Implementation of the lifecycle_activate tool.
pub async fn activate_impl(arbiter: &CacheArbiter) -> Result<CallToolResult, McpError> {
    let report = arbiter.on_activate().await?;
    json_result(&report)
}
