//! Initialize handshake types.
//!
//! Protocol flow:
//!   1. Client sends: { method: "initialize", id, params: { protocolVersion, capabilities, clientInfo } }
//!   2. Server responds with its own info and capabilities
//!   3. Client sends: { method: "notifications/initialized" }
//!   4. Normal request and notification traffic begins

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision reported when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

// ─────────────────────────────────────────────────────────────────────────────
// Client → Server
// ─────────────────────────────────────────────────────────────────────────────

/// Name and version a client reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Parameters for the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

// ─────────────────────────────────────────────────────────────────────────────
// Server → Client
// ─────────────────────────────────────────────────────────────────────────────

/// Name and version the server reports about itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Capability flags for one list-bearing component kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,
}

/// Capabilities advertised in the `initialize` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub resources: ListCapability,
    pub tools: ListCapability,
    pub prompts: ListCapability,
    pub logging: Value,
}

impl Default for ServerCapabilities {
    /// Every kind announces list changes; resources also accept subscriptions.
    fn default() -> Self {
        Self {
            resources: ListCapability {
                list_changed: true,
                subscribe: Some(true),
            },
            tools: ListCapability {
                list_changed: true,
                subscribe: None,
            },
            prompts: ListCapability {
                list_changed: true,
                subscribe: None,
            },
            logging: Value::Object(Default::default()),
        }
    }
}

/// Successful `initialize` response result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Severity of a `notifications/message` log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}
