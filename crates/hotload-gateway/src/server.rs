//! The control-plane HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use hotload_registry::Runtime;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::control::ControlPlane;
use crate::error::GatewayError;
use crate::routes;

/// Gateway listener configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub hostname: String,
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".into(),
            port: 8765,
            enable_cors: false,
        }
    }
}

/// Serves the control-plane API for one runtime.
pub struct GatewayServer {
    config: GatewayConfig,
    control: Arc<ControlPlane>,
    listener: Mutex<Option<TcpListener>>,
    local_addr: Mutex<Option<SocketAddr>>,
    shutdown_tx: watch::Sender<bool>,
}

impl GatewayServer {
    pub fn new(runtime: Arc<Runtime>, config: GatewayConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            control: Arc::new(ControlPlane::new(runtime)),
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn control(&self) -> &Arc<ControlPlane> {
        &self.control
    }

    /// The full route table, with CORS applied when enabled.
    pub fn router(&self) -> Router {
        let app = routes::router(self.control.clone(), self.shutdown_tx.subscribe());
        if self.config.enable_cors {
            app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            app
        }
    }

    /// Bind the listening socket ahead of [`serve`](Self::serve).
    pub async fn bind(&self) -> Result<SocketAddr, GatewayError> {
        let listener = self.open_listener().await?;
        let bound = listener.local_addr()?;
        *self.listener.lock() = Some(listener);
        Ok(bound)
    }

    async fn open_listener(&self) -> Result<TcpListener, GatewayError> {
        let addr = format!("{}:{}", self.config.hostname, self.config.port);
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        *self.local_addr.lock() = Some(listener.local_addr()?);
        Ok(listener)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn port(&self) -> Option<u16> {
        self.local_addr().map(|a| a.port())
    }

    /// Serve until [`stop`](Self::stop).
    pub async fn serve(&self) -> Result<(), GatewayError> {
        let pending = self.listener.lock().take();
        let listener = match pending {
            Some(listener) => listener,
            None => self.open_listener().await?,
        };
        let addr = listener.local_addr()?;

        info!("Control plane listening on http://{addr}");
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stopped| *stopped).await;
            })
            .await?;
        info!("Control plane stopped");
        Ok(())
    }

    /// Stop accepting requests and close open control streams.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
