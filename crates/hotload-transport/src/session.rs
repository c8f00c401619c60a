//! Client sessions.
//!
//! A [`Session`] is the server's handle on one connected client. The
//! transport that owns the connection creates it, attaches it to the shared
//! [`SessionSlot`] and detaches it when the connection goes away. Anything
//! that wants to notify "the client" asks the slot for the current session.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hotload_protocol::{ClientInfo, ComponentKind, LogLevel, McpNotification};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Boxed future returned by [`Session::send_notification`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer is gone; there is no active session to deliver to.
    #[error("No active session")]
    Closed,

    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SessionError {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// One live client connection.
pub trait Session: Send + Sync {
    fn id(&self) -> &str;

    fn send_notification(&self, notification: McpNotification) -> SendFuture<'_>;

    /// Client info reported in `initialize`, if the handshake happened.
    fn client_info(&self) -> Option<ClientInfo>;

    fn set_client_info(&self, info: ClientInfo);
}

impl dyn Session {
    pub async fn send_list_changed(&self, kind: ComponentKind) -> Result<(), SessionError> {
        self.send_notification(McpNotification::list_changed(kind)).await
    }

    pub async fn send_resource_updated(&self, uri: &str) -> Result<(), SessionError> {
        self.send_notification(McpNotification::resource_updated(uri)).await
    }

    pub async fn send_progress_notification(
        &self,
        token: &str,
        progress: f64,
        total: Option<f64>,
    ) -> Result<(), SessionError> {
        self.send_notification(McpNotification::progress(token, progress, total))
            .await
    }

    pub async fn send_log_message(&self, level: LogLevel, text: &str) -> Result<(), SessionError> {
        self.send_notification(McpNotification::log_message(level, text))
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PeerSession
// ─────────────────────────────────────────────────────────────────────────────

/// Session backed by the outbound queue of a transport connection.
///
/// Notifications are encoded here and written by the connection loop that
/// owns the receiving half. Once that loop exits, sends fail with
/// [`SessionError::Closed`].
pub struct PeerSession {
    id: String,
    outbound: mpsc::Sender<String>,
    client_info: RwLock<Option<ClientInfo>>,
}

impl PeerSession {
    pub fn new(outbound: mpsc::Sender<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            outbound,
            client_info: RwLock::new(None),
        }
    }

    /// Create a session together with the receiving end of its outbound queue.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self::new(tx)), rx)
    }
}

impl Session for PeerSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_notification(&self, notification: McpNotification) -> SendFuture<'_> {
        Box::pin(async move {
            let text = serde_json::to_string(&notification)?;
            self.outbound
                .send(text)
                .await
                .map_err(|_| SessionError::Closed)
        })
    }

    fn client_info(&self) -> Option<ClientInfo> {
        self.client_info.read().clone()
    }

    fn set_client_info(&self, info: ClientInfo) {
        *self.client_info.write() = Some(info);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionSlot
// ─────────────────────────────────────────────────────────────────────────────

/// Holds the session notifications are delivered to, if any.
#[derive(Clone, Default)]
pub struct SessionSlot {
    current: Arc<RwLock<Option<Arc<dyn Session>>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `session` current, replacing any previous one.
    pub fn attach(&self, session: Arc<dyn Session>) {
        debug!("Session attached: {}", session.id());
        *self.current.write() = Some(session);
    }

    /// Clear the slot, but only if `session` is still the current one.
    pub fn detach(&self, session: &Arc<dyn Session>) -> bool {
        let mut current = self.current.write();
        match current.as_ref() {
            Some(existing) if existing.id() == session.id() => {
                *current = None;
                debug!("Session detached: {}", session.id());
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<Arc<dyn Session>> {
        self.current.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.current.read().is_some()
    }
}
