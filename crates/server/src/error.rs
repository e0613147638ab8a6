//! Structured errors for the waystation server.
//!
//! Failures from the arbiter and the store arrive as `waystation_core::Error`
//! and convert to MCP errors directly; these cover tool argument problems.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty url).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32000, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_code() {
        let err: McpError = ToolError::InvalidInput("method: BREW".into()).into();
        assert_eq!(err.code.0, -32602);
        assert_eq!(err.message, "method: BREW");
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(ToolError::OutputFailed("x".into()).to_string(), "OUTPUT_FAILED: x");
    }
}
