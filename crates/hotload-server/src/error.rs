use hotload_gateway::GatewayError;
use hotload_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Config injection requires the stdio transport")]
    GatewayRequiresStdio,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
