//! control_message tool implementation.
//!
//! Delivers a page-to-arbiter control message. Recognised types are
//! `SKIP_WAITING` and `CLEAR_CACHE`; anything else is ignored.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::{CacheArbiter, ControlMessage};

use super::json_result;

/// Parameters for the control_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlParams {
    /// Message type, e.g. "SKIP_WAITING" or "CLEAR_CACHE".
    #[serde(rename = "type")]
    pub kind: String,
}

/// Implementation of the control_message tool.
pub async fn control_impl(arbiter: &CacheArbiter, params: ControlParams) -> Result<CallToolResult, McpError> {
    let outcome = arbiter
        .on_control_message(ControlMessage::from_type(&params.kind))
        .await?;
    json_result(&outcome)
}
