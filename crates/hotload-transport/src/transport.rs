//! The transport a server runs on.

use std::sync::Arc;

use crate::error::TransportError;
use crate::handler::RequestHandler;
use crate::session::SessionSlot;
use crate::stdio::StdioTransport;
use crate::stream::{StreamConfig, StreamTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Stdio,
    Stream,
}

/// One of the supported transports. A server runs exactly one.
pub enum Transport {
    Stdio(StdioTransport),
    Stream(StreamTransport),
}

impl Transport {
    pub fn stdio() -> Self {
        Self::Stdio(StdioTransport::new())
    }

    pub fn stream(config: StreamConfig) -> Self {
        Self::Stream(StreamTransport::new(config))
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio(_) => TransportKind::Stdio,
            Self::Stream(_) => TransportKind::Stream,
        }
    }

    /// Serve until the peer goes away or [`shutdown`](Self::shutdown) is called.
    pub async fn serve<H: RequestHandler>(
        &self,
        handler: Arc<H>,
        sessions: SessionSlot,
    ) -> Result<(), TransportError> {
        match self {
            Self::Stdio(t) => t.serve(handler, sessions).await,
            Self::Stream(t) => t.serve(handler, sessions).await,
        }
    }

    pub fn shutdown(&self) {
        match self {
            Self::Stdio(t) => t.shutdown(),
            Self::Stream(t) => t.shutdown(),
        }
    }
}
