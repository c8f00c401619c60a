//! Duplex control stream at `/ws`.
//!
//! Message types:
//! - `update`: `data` is a bulk update body; replies with the bulk report
//!   (`results` plus `summary`)
//! - `query`: replies with the component listing
//! - `error`: a client-side error report; logged, no reply
//!
//! Anything that cannot be decoded or applied gets an `error` envelope. The
//! loop runs until the peer disconnects or the gateway stops.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::control::ControlPlane;
use crate::models::{ConfigUpdateRequest, WsMessage, WsMessageType, WsResponse};
use crate::routes::GatewayState;

const UPDATE_OK: &str = "Components updated successfully";
const OPERATION_FAILED: &str = "Operation failed";

pub(crate) async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: GatewayState) {
    debug!("Control stream connected");
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut shutdown = state.shutdown.clone();

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            _ = async { let _ = shutdown.wait_for(|stopped| *stopped).await; } => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        };

        let text = match msg {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Ping(data))) => {
                let _ = ws_tx.send(Message::Pong(data)).await;
                continue;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                warn!("Control stream error: {e}");
                break;
            }
            Some(Ok(_)) => continue,
        };

        let Some(reply) = handle_text(&state.control, &text) else {
            continue;
        };
        let encoded = match serde_json::to_string(&reply) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to encode control stream reply: {e}");
                continue;
            }
        };
        if let Err(e) = ws_tx.send(Message::Text(encoded.into())).await {
            warn!("Failed to reply on control stream: {e}");
            break;
        }
    }

    debug!("Control stream disconnected");
}

/// Process one inbound text frame. `None` means no reply is sent.
pub fn handle_text(control: &ControlPlane, text: &str) -> Option<WsResponse> {
    let raw: Value = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            error!("{OPERATION_FAILED}: invalid JSON: {e}");
            return Some(WsResponse::error(OPERATION_FAILED, None));
        }
    };
    let request_id = raw
        .get("request_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let message: WsMessage = match serde_json::from_value(raw) {
        Ok(message) => message,
        Err(e) => {
            error!("{OPERATION_FAILED}: {e}");
            return Some(WsResponse::error(OPERATION_FAILED, request_id));
        }
    };

    match message.kind {
        WsMessageType::Update => {
            let request: ConfigUpdateRequest = match message.data {
                Value::Object(_) => match serde_json::from_value(message.data) {
                    Ok(request) => request,
                    Err(e) => {
                        error!("{OPERATION_FAILED}: {e}");
                        return Some(WsResponse::error(OPERATION_FAILED, message.request_id));
                    }
                },
                _ => {
                    error!("{OPERATION_FAILED}: update data must be an object");
                    return Some(WsResponse::error(OPERATION_FAILED, message.request_id));
                }
            };
            let report = control.bulk_apply(request);
            Some(encode_data(&report, message.request_id).with_message(UPDATE_OK))
        }
        WsMessageType::Query => Some(encode_data(&control.list_components(), message.request_id)),
        WsMessageType::Error => {
            error!("Client error: {}", message.data);
            None
        }
    }
}

fn encode_data<T: serde::Serialize>(data: &T, request_id: Option<String>) -> WsResponse {
    match serde_json::to_value(data) {
        Ok(data) => WsResponse::success(data, request_id),
        Err(e) => {
            error!("{OPERATION_FAILED}: {e}");
            WsResponse::error(OPERATION_FAILED, request_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WsResponseType;
    use hotload_registry::Runtime;
    use serde_json::json;
    use std::sync::Arc;

    fn control() -> ControlPlane {
        ControlPlane::new(Arc::new(Runtime::new()))
    }

    #[test]
    fn update_replies_with_bulk_report() {
        let control = control();
        let reply = handle_text(
            &control,
            &json!({
                "type": "update",
                "request_id": "r1",
                "data": {"resources": {
                    "doc": {"type": "text", "content": "x"},
                    "notes": {"type": "text", "content": "y"},
                    "bad": {"type": "nope"}
                }}
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(reply.kind, WsResponseType::Success);
        assert_eq!(reply.request_id.as_deref(), Some("r1"));
        assert_eq!(reply.message.as_deref(), Some(UPDATE_OK));
        assert_eq!(reply.data["results"].as_array().unwrap().len(), 3);
        assert_eq!(reply.data["results"][0]["name"], "doc");
        assert_eq!(reply.data["results"][2]["status"], "error");
        assert_eq!(reply.data["summary"], json!({"success": 2, "error": 1}));
    }

    #[test]
    fn query_lists_components() {
        let reply = handle_text(&control(), r#"{"type":"query"}"#).unwrap();
        assert_eq!(reply.data, json!({"resources": [], "tools": [], "prompts": []}));
        assert!(reply.message.is_none());
    }

    #[test]
    fn client_errors_get_no_reply() {
        assert!(handle_text(&control(), r#"{"type":"error","data":"oops"}"#).is_none());
    }

    #[test]
    fn malformed_messages_get_error_envelopes() {
        let control = control();
        for text in [
            "not json",
            r#"{"type":"bogus","request_id":"r9"}"#,
            r#"{"type":"update","data":[1,2]}"#,
        ] {
            let reply = handle_text(&control, text).unwrap();
            assert_eq!(reply.kind, WsResponseType::Error);
            assert_eq!(reply.message.as_deref(), Some(OPERATION_FAILED));
        }
        let reply = handle_text(&control, r#"{"type":"bogus","request_id":"r9"}"#).unwrap();
        assert_eq!(reply.request_id.as_deref(), Some("r9"));
    }
}
