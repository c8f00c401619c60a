//! MCP notification name constants.
//!
//! Notifications are server-to-client messages with no response expected.

/// All notification names the server emits or accepts.
pub struct Notifications;

impl Notifications {
    // ── List changes ────────────────────────────────────────────────────
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";

    // ── Per-item updates ────────────────────────────────────────────────
    pub const RESOURCE_UPDATED: &str = "notifications/resources/updated";

    // ── Long-running work ───────────────────────────────────────────────
    pub const PROGRESS: &str = "notifications/progress";
    pub const MESSAGE: &str = "notifications/message";

    // ── Client → server ─────────────────────────────────────────────────
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const CANCELLED: &str = "notifications/cancelled";
}
