//! hotload-mcp: MCP server with a live control plane
//!
//! Serves resources, tools and prompts to one MCP client while an HTTP and
//! WebSocket control plane adds, replaces and removes them. Every change is
//! pushed to the client as a notification.
//!
//! Usage:
//!   hotload-mcp                                  # stdio, no control plane
//!   hotload-mcp --injection                      # stdio + control plane on :8765
//!   hotload-mcp --injection --injection-port 0   # control plane on an OS-assigned port
//!   hotload-mcp --transport stream --port 3001   # WebSocket transport at /ws

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use hotload_gateway::GatewayConfig;
use hotload_registry::Runtime;
use hotload_server::{HotloadServer, ServerConfig};
use hotload_transport::{StreamConfig, TransportKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    Stdio,
    Stream,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Stdio => TransportKind::Stdio,
            TransportArg::Stream => TransportKind::Stream,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "hotload-mcp", about = "MCP server with hot-reloadable components")]
struct Cli {
    /// Transport the MCP client connects over
    #[arg(long, value_enum, default_value = "stdio")]
    transport: TransportArg,

    /// Port for the stream transport (0 for OS-assigned)
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Hostname for the stream transport
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Start the config injection control plane (stdio transport only)
    #[arg(long)]
    injection: bool,

    /// Control plane port (0 for OS-assigned)
    #[arg(long, default_value = "8765")]
    injection_port: u16,

    /// Control plane hostname
    #[arg(long, default_value = "127.0.0.1")]
    injection_host: String,

    /// Server name reported to clients
    #[arg(long, default_value = "hotload-mcp")]
    name: String,

    /// Exit if the control plane cannot start
    #[arg(long)]
    fail_fast: bool,

    /// Maximum concurrent stream connections
    #[arg(long, default_value = "32")]
    max_connections: usize,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let gateway = self.injection.then(|| GatewayConfig {
            hostname: self.injection_host.clone(),
            port: self.injection_port,
            ..Default::default()
        });
        ServerConfig {
            name: self.name.clone(),
            transport: self.transport.into(),
            stream: StreamConfig {
                hostname: self.hostname.clone(),
                port: self.port,
                max_connections: Some(self.max_connections),
                ..Default::default()
            },
            gateway,
            gateway_fail_fast: self.fail_fast,
        }
    }
}

/// Logs never go to stdout: with the stdio transport it carries protocol frames.
fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    if let Some(log_path) = &cli.log_file {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
        {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let runtime = Arc::new(Runtime::new());
    let server = match HotloadServer::new(runtime, cli.server_config()) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let result = tokio::select! {
        result = server.start() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            server.shutdown().await;
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{} stopped with error: {e}", server.name());
        std::process::exit(1);
    }
}
