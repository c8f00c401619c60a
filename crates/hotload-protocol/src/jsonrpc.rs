//! JSON-RPC 2.0 base types.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::McpError;
use crate::kind::ComponentKind;
use crate::lifecycle::LogLevel;
use crate::notifications::Notifications;

/// JSON-RPC 2.0 request ID: either a string or integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

/// Inbound JSON-RPC 2.0 message. Without an `id` it is a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSuccessResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

/// JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpErrorResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    pub error: McpError,
}

/// JSON-RPC 2.0 response (success or error).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum McpResponse {
    Success(McpSuccessResponse),
    Error(McpErrorResponse),
}

/// JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Result from a request handler.
pub type HandlerResult = Result<Value, McpError>;

// ─────────────────────────────────────────────────────────────────────────────
// Helper constructors
// ─────────────────────────────────────────────────────────────────────────────

impl McpRequest {
    /// Validate that this is a well-formed JSON-RPC 2.0 request.
    pub fn is_valid(&self) -> bool {
        self.jsonrpc == "2.0" && !self.method.is_empty()
    }
}

impl McpSuccessResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result,
        }
    }
}

impl McpErrorResponse {
    pub fn new(id: Option<RequestId>, error: McpError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            error,
        }
    }
}

impl McpNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
        }
    }

    /// `notifications/{kind}s/list_changed` for the given component kind.
    pub fn list_changed(kind: ComponentKind) -> Self {
        Self::new(kind.list_changed_method(), None)
    }

    pub fn resource_updated(uri: &str) -> Self {
        Self::new(Notifications::RESOURCE_UPDATED, Some(json!({ "uri": uri })))
    }

    pub fn progress(token: &str, progress: f64, total: Option<f64>) -> Self {
        let mut params = json!({
            "progressToken": token,
            "progress": progress,
        });
        if let Some(total) = total {
            params["total"] = json!(total);
        }
        Self::new(Notifications::PROGRESS, Some(params))
    }

    pub fn log_message(level: LogLevel, data: impl Into<Value>) -> Self {
        Self::new(
            Notifications::MESSAGE,
            Some(json!({ "level": level, "data": data.into() })),
        )
    }
}

impl McpResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Success(McpSuccessResponse::new(id, result))
    }

    pub fn error(id: Option<RequestId>, error: McpError) -> Self {
        Self::Error(McpErrorResponse::new(id, error))
    }
}
