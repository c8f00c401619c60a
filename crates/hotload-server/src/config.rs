//! Server configuration.

use hotload_gateway::GatewayConfig;
use hotload_transport::{StreamConfig, TransportKind};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Name reported to clients in `initialize`.
    pub name: String,
    pub transport: TransportKind,
    /// Used when `transport` is [`TransportKind::Stream`].
    pub stream: StreamConfig,
    /// Control-plane gateway; requires the stdio transport.
    pub gateway: Option<GatewayConfig>,
    /// Abort startup if the gateway cannot bind, instead of running without it.
    pub gateway_fail_fast: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "hotload-mcp".into(),
            transport: TransportKind::Stdio,
            stream: StreamConfig::default(),
            gateway: None,
            gateway_fail_fast: false,
        }
    }
}
