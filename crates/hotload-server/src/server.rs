//! Server orchestrator: wires the runtime, observers, transport and gateway
//! together and owns the start/shutdown sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hotload_gateway::GatewayServer;
use hotload_registry::Runtime;
use hotload_transport::{Transport, TransportKind};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::observers::Observers;
use crate::router::McpRouter;

pub struct HotloadServer {
    name: String,
    runtime: Arc<Runtime>,
    context: ServerContext,
    dispatcher: Dispatcher,
    observers: Observers,
    router: Arc<McpRouter>,
    transport: Transport,
    gateway: Option<Arc<GatewayServer>>,
    gateway_task: Mutex<Option<JoinHandle<()>>>,
    gateway_fail_fast: bool,
    shut_down: AtomicBool,
}

impl HotloadServer {
    /// Build a server over `runtime` with the transport named in `config`.
    pub fn new(runtime: Arc<Runtime>, config: ServerConfig) -> Result<Self, ServerError> {
        let transport = match config.transport {
            TransportKind::Stdio => Transport::stdio(),
            TransportKind::Stream => Transport::stream(config.stream.clone()),
        };
        Self::with_transport(runtime, config, transport)
    }

    /// Build a server over an already constructed transport.
    pub fn with_transport(
        runtime: Arc<Runtime>,
        config: ServerConfig,
        transport: Transport,
    ) -> Result<Self, ServerError> {
        if config.gateway.is_some() && transport.kind() != TransportKind::Stdio {
            return Err(ServerError::GatewayRequiresStdio);
        }

        let context = ServerContext::new();
        let dispatcher = Dispatcher::new(context.clone());
        let observers = Observers::attach(&runtime, dispatcher.clone());
        let router = Arc::new(McpRouter::new(
            config.name.clone(),
            runtime.clone(),
            context.subscriptions.clone(),
        ));
        let gateway = config
            .gateway
            .map(|gateway| Arc::new(GatewayServer::new(runtime.clone(), gateway)));

        Ok(Self {
            name: config.name,
            runtime,
            context,
            dispatcher,
            observers,
            router,
            transport,
            gateway,
            gateway_task: Mutex::new(None),
            gateway_fail_fast: config.gateway_fail_fast,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn gateway(&self) -> Option<&Arc<GatewayServer>> {
        self.gateway.as_ref()
    }

    /// Start the gateway (if configured), then serve the transport until it
    /// ends. Shutdown always runs afterwards, whether serving succeeded or not.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("Starting {} on {:?} transport", self.name, self.transport.kind());

        if let Err(e) = self.start_gateway().await {
            if self.gateway_fail_fast {
                self.shutdown().await;
                return Err(e);
            }
            error!("Continuing without control plane: {e}");
        }

        let result = self
            .transport
            .serve(self.router.clone(), self.context.sessions.clone())
            .await;
        if let Err(e) = &result {
            error!("Transport failed: {e}");
        }

        self.shutdown().await;
        result.map_err(ServerError::from)
    }

    async fn start_gateway(&self) -> Result<(), ServerError> {
        let Some(gateway) = &self.gateway else {
            return Ok(());
        };
        let addr = gateway.bind().await?;
        info!("Config injection available at http://{addr}");

        let server = gateway.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                error!("Control plane failed: {e}");
            }
        });
        *self.gateway_task.lock() = Some(handle);

        // Shutdown may have run while we were binding.
        if self.is_shut_down() {
            if let Some(handle) = self.gateway_task.lock().take() {
                handle.abort();
            }
            gateway.stop();
        }
        Ok(())
    }

    /// Tear everything down. Every step runs even if an earlier one had
    /// nothing to do, and calling this more than once is harmless.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down {}...", self.name);

        let gateway_task = self.gateway_task.lock().take();
        if let Some(handle) = gateway_task {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    debug!("Control plane task ended with {e}");
                }
            }
        }
        if let Some(gateway) = &self.gateway {
            gateway.stop();
        }

        self.transport.shutdown();

        let cancelled = self.context.tasks.cancel_all().await;
        debug!("Cancelled {cancelled} notification task(s)");

        self.observers.detach(&self.runtime);
        self.runtime.shutdown();
        self.context.tasks.clear();

        info!("{} shutdown complete", self.name);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
