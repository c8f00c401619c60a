//! Hotload Control Plane
//!
//! An out-of-band HTTP + WebSocket API that adds, replaces and removes
//! components of a running server. Every mutation goes through the shared
//! [`Runtime`](hotload_registry::Runtime), so connected MCP clients hear
//! about it through the registry observers.

pub mod control;
pub mod error;
pub mod models;
pub mod routes;
pub mod server;
pub mod ws;

pub use control::ControlPlane;
pub use error::GatewayError;
pub use models::{
    BulkSummary, BulkUpdateResponse, ComponentListing, ComponentResponse, ConfigUpdateRequest,
    ResponseStatus, WsMessage, WsMessageType, WsResponse, WsResponseType,
};
pub use server::{GatewayConfig, GatewayServer};
