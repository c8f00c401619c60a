//! WebSocket streaming transport using Axum.
//!
//! Every connection gets its own session. The most recently connected
//! session is the current one in the shared [`SessionSlot`]; when it
//! disconnects the slot is cleared.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use crate::error::TransportError;
use crate::handler::{RequestContext, RequestHandler, handle_message};
use crate::session::{PeerSession, Session, SessionSlot};
use crate::stdio::stopped;

const OUTBOUND_CAPACITY: usize = 1024;

/// Streaming transport configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Hostname to bind to
    pub hostname: String,
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    pub enable_cors: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".into(),
            port: 3001,
            max_connections: Some(32),
            enable_cors: false,
        }
    }
}

struct AppState<H: RequestHandler> {
    handler: Arc<H>,
    sessions: SessionSlot,
    config: StreamConfig,
    client_count: AtomicUsize,
    shutdown_rx: watch::Receiver<bool>,
}

/// Serves MCP clients over WebSocket at `/ws`.
pub struct StreamTransport {
    config: StreamConfig,
    listener: Mutex<Option<TcpListener>>,
    local_addr: Mutex<Option<SocketAddr>>,
    shutdown_tx: watch::Sender<bool>,
}

impl StreamTransport {
    pub fn new(config: StreamConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Bind the listening socket ahead of [`serve`](Self::serve).
    pub async fn bind(&self) -> Result<SocketAddr, TransportError> {
        let listener = self.open_listener().await?;
        let bound = listener.local_addr()?;
        *self.listener.lock() = Some(listener);
        Ok(bound)
    }

    async fn open_listener(&self) -> Result<TcpListener, TransportError> {
        let addr = format!("{}:{}", self.config.hostname, self.config.port);
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        *self.local_addr.lock() = Some(listener.local_addr()?);
        Ok(listener)
    }

    /// The bound address, once [`bind`](Self::bind) has succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Accept connections until [`shutdown`](Self::shutdown). Binds first if needed.
    pub async fn serve<H: RequestHandler>(
        &self,
        handler: Arc<H>,
        sessions: SessionSlot,
    ) -> Result<(), TransportError> {
        let pending = self.listener.lock().take();
        let listener = match pending {
            Some(listener) => listener,
            None => self.open_listener().await?,
        };
        let addr = listener.local_addr()?;

        let state = Arc::new(AppState {
            handler,
            sessions,
            config: self.config.clone(),
            client_count: AtomicUsize::new(0),
            shutdown_rx: self.shutdown_tx.subscribe(),
        });

        let mut app = Router::new()
            .route("/ws", get(ws_upgrade_handler::<H>))
            .route("/health", get(health_handler::<H>))
            .with_state(state);
        if self.config.enable_cors {
            app = app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        info!("MCP stream transport listening on ws://{addr}/ws");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stopped(&mut shutdown_rx).await })
            .await?;

        info!("MCP stream transport stopped");
        Ok(())
    }

    /// Stop accepting connections and close the open ones.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler<H: RequestHandler>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    if let Some(max) = state.config.max_connections {
        let current = state.client_count.load(Ordering::Relaxed);
        if current >= max {
            warn!("Connection rejected: max connections reached ({max})");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

async fn health_handler<H: RequestHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.client_count.load(Ordering::Relaxed),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_ws_connection<H: RequestHandler>(socket: WebSocket, state: Arc<AppState<H>>) {
    state.client_count.fetch_add(1, Ordering::Relaxed);

    let (peer, mut outbound_rx) = PeerSession::channel(OUTBOUND_CAPACITY);
    let session: Arc<dyn Session> = peer;
    let session_id = session.id().to_string();
    let ctx = RequestContext::new(session.clone());
    state.sessions.attach(session.clone());
    info!("Client connected: {session_id}");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut shutdown_rx = state.shutdown_rx.clone();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(reply) = handle_message(&text, state.handler.as_ref(), &ctx).await else {
                            continue;
                        };
                        if let Err(e) = ws_tx.send(Message::Text(reply.into())).await {
                            error!("Failed to send response to {session_id}: {e}");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client closed connection: {session_id}");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {session_id}: {e}");
                        break;
                    }
                    _ => {}
                }
            }

            Some(notification) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(notification.into())).await {
                    error!("Failed to notify {session_id}: {e}");
                    break;
                }
            }

            _ = stopped(&mut shutdown_rx) => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.sessions.detach(&session);
    state.handler.session_closed(&session_id);
    state.client_count.fetch_sub(1, Ordering::Relaxed);
    info!(
        "Client disconnected: {session_id} (total: {})",
        state.client_count.load(Ordering::Relaxed)
    );
}
