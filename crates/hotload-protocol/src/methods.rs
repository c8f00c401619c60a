//! MCP method name constants.
//!
//! Each constant is the exact string sent over the wire as the `method`
//! field of a JSON-RPC request.

/// All request methods the server answers.
pub struct Methods;

impl Methods {
    // ── Lifecycle ───────────────────────────────────────────────────────
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";

    // ── Resources ───────────────────────────────────────────────────────
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";

    // ── Tools ───────────────────────────────────────────────────────────
    pub const TOOLS_LIST: &str = "tools/list";

    // ── Prompts ─────────────────────────────────────────────────────────
    pub const PROMPTS_LIST: &str = "prompts/list";
}
