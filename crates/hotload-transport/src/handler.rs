//! Request routing seam between transports and the server.

use std::future::Future;
use std::sync::Arc;

use hotload_protocol::{HandlerResult, McpError, McpRequest, McpResponse, RequestId};
use serde_json::Value;
use tracing::{debug, error};

use crate::session::Session;

/// Per-request context handed to the handler.
#[derive(Clone)]
pub struct RequestContext {
    /// The session the request arrived on.
    pub session: Arc<dyn Session>,
}

impl RequestContext {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }
}

/// Trait implemented by the server to handle incoming traffic.
/// The transport layer calls this for every decoded JSON-RPC message.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle a JSON-RPC request and return its result.
    fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: &RequestContext,
    ) -> impl Future<Output = HandlerResult> + Send;

    /// Handle a JSON-RPC notification. No response is sent.
    fn handle_notification(
        &self,
        method: &str,
        _params: Option<Value>,
        _ctx: &RequestContext,
    ) -> impl Future<Output = ()> + Send {
        debug!("Ignoring notification {method}");
        async {}
    }

    /// Called once a session's connection has closed.
    fn session_closed(&self, _session_id: &str) {}
}

/// Decode one inbound message, route it, and encode the reply.
/// Returns `None` when nothing should be written back.
pub async fn handle_message<H: RequestHandler>(
    text: &str,
    handler: &H,
    ctx: &RequestContext,
) -> Option<String> {
    let parsed: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            return Some(encode(&McpResponse::error(
                None,
                McpError::parse_error("Failed to parse JSON"),
            )));
        }
    };

    let id: Option<RequestId> = parsed
        .get("id")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());

    // Replies to server-initiated requests carry no method; nothing to do.
    if parsed.get("method").is_none()
        && (parsed.get("result").is_some() || parsed.get("error").is_some())
    {
        debug!("Ignoring client response for id {id:?}");
        return None;
    }

    let request = match serde_json::from_value::<McpRequest>(parsed) {
        Ok(request) if request.is_valid() => request,
        _ => {
            return Some(encode(&McpResponse::error(
                id,
                McpError::invalid_request("Invalid JSON-RPC 2.0 request"),
            )));
        }
    };
    let McpRequest {
        id, method, params, ..
    } = request;

    let Some(id) = id else {
        handler.handle_notification(&method, params, ctx).await;
        return None;
    };

    debug!("→ {method} ({id:?})");
    let response = match handler.handle_request(&method, params, ctx).await {
        Ok(result) => McpResponse::success(id, result),
        Err(err) => McpResponse::error(Some(id), err),
    };
    Some(encode(&response))
}

fn encode(response: &McpResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!("Failed to encode response: {e}");
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Failed to encode response"}}"#
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PeerSession;
    use serde_json::json;

    struct Echo;

    impl RequestHandler for Echo {
        async fn handle_request(
            &self,
            method: &str,
            params: Option<Value>,
            _ctx: &RequestContext,
        ) -> HandlerResult {
            match method {
                "echo" => Ok(params.unwrap_or(Value::Null)),
                other => Err(McpError::method_not_found(other)),
            }
        }
    }

    fn ctx() -> RequestContext {
        let (session, _rx) = PeerSession::channel(1);
        RequestContext::new(session)
    }

    async fn roundtrip(text: &str) -> Option<Value> {
        handle_message(text, &Echo, &ctx())
            .await
            .map(|s| serde_json::from_str(&s).unwrap())
    }

    #[tokio::test]
    async fn routes_requests() {
        let reply = roundtrip(r#"{"jsonrpc":"2.0","id":7,"method":"echo","params":{"a":1}}"#)
            .await
            .unwrap();
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["result"], json!({"a": 1}));
    }

    #[tokio::test]
    async fn unknown_method_is_an_error_reply() {
        let reply = roundtrip(r#"{"jsonrpc":"2.0","id":"x","method":"nope"}"#)
            .await
            .unwrap();
        assert_eq!(reply["id"], "x");
        assert_eq!(reply["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn malformed_input() {
        let reply = roundtrip("{not json").await.unwrap();
        assert_eq!(reply["error"]["code"], -32700);

        let reply = roundtrip(r#"{"jsonrpc":"1.0","id":1,"method":"echo"}"#).await.unwrap();
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["id"], 1);

        let reply = roundtrip(r#"{"jsonrpc":"2.0","id":"m"}"#).await.unwrap();
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["id"], "m");

        // An id that is neither string nor integer cannot be echoed back.
        let reply = roundtrip(r#"{"jsonrpc":"2.0","id":true,"method":"echo"}"#)
            .await
            .unwrap();
        assert_eq!(reply["error"]["code"], -32600);
        assert!(reply["id"].is_null());

        let reply = roundtrip("[1, 2]").await.unwrap();
        assert_eq!(reply["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn notifications_and_responses_get_no_reply() {
        assert!(roundtrip(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(roundtrip(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#).await.is_none());
    }
}
