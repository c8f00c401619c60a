//! Hotload protocol types
//!
//! JSON-RPC 2.0 message types for the Model Context Protocol subset the
//! hotload server speaks. This crate is the single source of truth for
//! method names, notification names, error codes and the component kinds
//! shared by the registries, the dispatcher and the control plane.

pub mod error;
pub mod jsonrpc;
pub mod kind;
pub mod lifecycle;
pub mod methods;
pub mod notifications;

pub use error::{McpError, codes};
pub use jsonrpc::{
    HandlerResult, McpErrorResponse, McpNotification, McpRequest, McpResponse,
    McpSuccessResponse, RequestId,
};
pub use kind::ComponentKind;
pub use lifecycle::{ClientInfo, InitializeParams, InitializeResult, LogLevel, ServerInfo};
pub use methods::Methods;
pub use notifications::Notifications;
