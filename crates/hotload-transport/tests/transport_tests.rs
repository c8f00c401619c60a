//! Transport tests: stdio framing over an in-memory pipe and WebSocket
//! sessions against a live stream transport.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use hotload_protocol::{ComponentKind, HandlerResult, McpError};
    use hotload_transport::*;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::time::timeout;
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    #[derive(Default)]
    struct EchoHandler {
        closed: Mutex<Vec<String>>,
    }

    impl RequestHandler for EchoHandler {
        async fn handle_request(
            &self,
            method: &str,
            params: Option<Value>,
            ctx: &RequestContext,
        ) -> HandlerResult {
            match method {
                "echo" => Ok(params.unwrap_or(Value::Null)),
                "whoami" => Ok(json!({ "session": ctx.session.id() })),
                other => Err(McpError::method_not_found(other)),
            }
        }

        fn session_closed(&self, session_id: &str) {
            self.closed.lock().push(session_id.to_string());
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // stdio
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn stdio_request_notification_and_shutdown() {
        let (client_io, server_io) = tokio::io::duplex(16 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, mut client_write) = tokio::io::split(client_io);
        let mut client_lines = BufReader::new(client_read).lines();

        let transport = Arc::new(StdioTransport::new());
        let handler = Arc::new(EchoHandler::default());
        let sessions = SessionSlot::new();

        let serve = tokio::spawn({
            let transport = transport.clone();
            let handler = handler.clone();
            let sessions = sessions.clone();
            async move {
                transport
                    .serve_io(server_read, server_write, handler, sessions)
                    .await
            }
        });

        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"echo\",\"params\":{\"x\":1}}\n")
            .await
            .unwrap();
        let line = timeout(Duration::from_secs(5), client_lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let reply: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["x"], 1);

        let session = sessions.current().expect("session attached while serving");
        session.send_list_changed(ComponentKind::Resource).await.unwrap();
        let line = timeout(Duration::from_secs(5), client_lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let notification: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(notification["method"], "notifications/resources/list_changed");

        transport.shutdown();
        timeout(Duration::from_secs(5), serve)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(!sessions.is_attached());
        assert_eq!(handler.closed.lock().len(), 1);
    }

    #[tokio::test]
    async fn stdio_eof_ends_serving() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        drop(client_io);

        let transport = StdioTransport::new();
        let sessions = SessionSlot::new();
        transport
            .serve_io(server_read, server_write, Arc::new(EchoHandler::default()), sessions.clone())
            .await
            .unwrap();
        assert!(!sessions.is_attached());
    }

    // ─────────────────────────────────────────────────────────────────────
    // stream
    // ─────────────────────────────────────────────────────────────────────

    async fn start_stream() -> (Arc<StreamTransport>, u16, SessionSlot, Arc<EchoHandler>) {
        let transport = Arc::new(StreamTransport::new(StreamConfig {
            port: 0,
            ..Default::default()
        }));
        let port = transport.bind().await.unwrap().port();
        let sessions = SessionSlot::new();
        let handler = Arc::new(EchoHandler::default());
        tokio::spawn({
            let transport = transport.clone();
            let sessions = sessions.clone();
            let handler = handler.clone();
            async move { transport.serve(handler, sessions).await }
        });
        (transport, port, sessions, handler)
    }

    async fn recv_json<S>(ws: &mut S) -> Value
    where
        S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for message")
                .expect("stream ended")
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn stream_latest_connection_is_current() {
        let (transport, port, sessions, handler) = start_stream().await;
        let url = format!("ws://127.0.0.1:{port}/ws");

        let (mut first, _) = connect_async(&url).await.unwrap();
        first
            .send(Message::Text(r#"{"jsonrpc":"2.0","id":1,"method":"whoami"}"#.into()))
            .await
            .unwrap();
        let first_id = recv_json(&mut first).await["result"]["session"]
            .as_str()
            .unwrap()
            .to_string();

        let (mut second, _) = connect_async(&url).await.unwrap();
        second
            .send(Message::Text(r#"{"jsonrpc":"2.0","id":2,"method":"whoami"}"#.into()))
            .await
            .unwrap();
        let second_id = recv_json(&mut second).await["result"]["session"]
            .as_str()
            .unwrap()
            .to_string();
        assert_ne!(first_id, second_id);
        assert_eq!(sessions.current().unwrap().id(), second_id);

        sessions
            .current()
            .unwrap()
            .send_resource_updated("text://doc")
            .await
            .unwrap();
        let notification = recv_json(&mut second).await;
        assert_eq!(notification["method"], "notifications/resources/updated");
        assert_eq!(notification["params"]["uri"], "text://doc");

        second.close(None).await.unwrap();
        for _ in 0..50 {
            if !sessions.is_attached() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!sessions.is_attached());
        assert_eq!(handler.closed.lock().as_slice(), [second_id]);

        transport.shutdown();
    }

    #[tokio::test]
    async fn stream_health_endpoint() {
        let (transport, port, _sessions, _handler) = start_stream().await;
        let body: Value = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["clients"], 0);
        transport.shutdown();
    }
}
