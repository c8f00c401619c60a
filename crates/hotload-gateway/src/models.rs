//! Request and response bodies of the control-plane API.

use hotload_protocol::ComponentKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Outcome of one component operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub component_type: ComponentKind,
    pub name: String,
}

impl ComponentResponse {
    pub fn success(kind: ComponentKind, name: &str, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            component_type: kind,
            name: name.to_string(),
        }
    }

    pub fn error(kind: ComponentKind, name: &str, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            component_type: kind,
            name: name.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub success: usize,
    pub error: usize,
}

/// Per-item results of a bulk update, in the order the items were applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateResponse {
    pub results: Vec<ComponentResponse>,
    pub summary: BulkSummary,
}

impl BulkUpdateResponse {
    pub fn push(&mut self, result: ComponentResponse) {
        if result.is_success() {
            self.summary.success += 1;
        } else {
            self.summary.error += 1;
        }
        self.results.push(result);
    }
}

fn default_replace() -> bool {
    true
}

/// Body of `POST /bulk-update` and of WebSocket `update` messages.
///
/// Items stay untyped here so each one is validated, and can fail, on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdateRequest {
    #[serde(default)]
    pub resources: Option<Map<String, Value>>,
    #[serde(default)]
    pub tools: Option<Map<String, Value>>,
    #[serde(default = "default_replace")]
    pub replace_existing: bool,
}

/// Names of every registered component, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentListing {
    pub resources: Vec<String>,
    pub tools: Vec<String>,
    pub prompts: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket envelopes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMessageType {
    Update,
    Query,
    Error,
}

/// Inbound stream message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: WsMessageType,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsResponseType {
    Success,
    Error,
}

/// Outbound stream message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsResponse {
    #[serde(rename = "type")]
    pub kind: WsResponseType,
    pub data: Value,
    pub request_id: Option<String>,
    pub message: Option<String>,
}

impl WsResponse {
    pub fn success(data: Value, request_id: Option<String>) -> Self {
        Self {
            kind: WsResponseType::Success,
            data,
            request_id,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            kind: WsResponseType::Error,
            data: Value::Object(Map::new()),
            request_id,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
