//! Hotload Server: keeps connected MCP clients in step with a runtime whose
//! components change while they are connected.
//!
//! Registry observers turn every mutation into a notification, the
//! dispatcher sends it as a tracked background task, and the orchestrator
//! owns startup and an orderly shutdown of all of it.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod observers;
pub mod router;
pub mod server;
pub mod subscriptions;
pub mod tasks;

pub use config::ServerConfig;
pub use context::ServerContext;
pub use dispatcher::Dispatcher;
pub use error::ServerError;
pub use observers::{Observers, PromptObserver, ResourceObserver, ToolObserver};
pub use router::McpRouter;
pub use server::HotloadServer;
pub use subscriptions::SubscriptionTable;
pub use tasks::TaskSet;
