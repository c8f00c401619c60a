//! Hotload Transport Layer
//!
//! Carries JSON-RPC traffic between MCP clients and the server:
//! - a [`Session`] per live connection, used to push notifications
//! - a [`SessionSlot`] naming the session notifications go to
//! - newline-delimited stdio and WebSocket streaming transports
//!
//! The transport is decoupled from the server logic via the `RequestHandler` trait.

pub mod error;
pub mod handler;
pub mod session;
pub mod stdio;
pub mod stream;
pub mod transport;

pub use error::TransportError;
pub use handler::{RequestContext, RequestHandler};
pub use session::{PeerSession, SendFuture, Session, SessionError, SessionSlot};
pub use stdio::StdioTransport;
pub use stream::{StreamConfig, StreamTransport};
pub use transport::{Transport, TransportKind};
