//! Server tests: observer → dispatcher → session behavior and the shutdown
//! sequence, driven through a real `HotloadServer` with scripted sessions.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use hotload_gateway::GatewayConfig;
    use hotload_protocol::{ClientInfo, McpNotification};
    use hotload_registry::{Prompt, PromptMessage, PromptRole, Resource, Runtime, ToolConfig};
    use hotload_server::{HotloadServer, ServerConfig, ServerError};
    use hotload_transport::{SendFuture, Session, SessionError, TransportKind};
    use parking_lot::Mutex;

    // ─────────────────────────────────────────────────────────────────────
    // Scripted sessions
    // ─────────────────────────────────────────────────────────────────────

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        /// Record and complete immediately.
        Record,
        /// Fail as if the peer were gone.
        Closed,
        /// Never complete.
        Hang,
    }

    struct ScriptedSession {
        mode: Mode,
        sent: Mutex<Vec<McpNotification>>,
        dropped: Arc<AtomicUsize>,
        client_info: Mutex<Option<ClientInfo>>,
    }

    impl ScriptedSession {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                sent: Mutex::new(Vec::new()),
                dropped: Arc::new(AtomicUsize::new(0)),
                client_info: Mutex::new(None),
            })
        }

        fn methods(&self) -> Vec<String> {
            self.sent.lock().iter().map(|n| n.method.clone()).collect()
        }
    }

    /// Counts how many hanging sends were torn down.
    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Session for ScriptedSession {
        fn id(&self) -> &str {
            "scripted"
        }

        fn send_notification(&self, notification: McpNotification) -> SendFuture<'_> {
            Box::pin(async move {
                match self.mode {
                    Mode::Record => {
                        self.sent.lock().push(notification);
                        Ok(())
                    }
                    Mode::Closed => Err(SessionError::Closed),
                    Mode::Hang => {
                        let _counter = DropCounter(self.dropped.clone());
                        std::future::pending::<()>().await;
                        Ok(())
                    }
                }
            })
        }

        fn client_info(&self) -> Option<ClientInfo> {
            self.client_info.lock().clone()
        }

        fn set_client_info(&self, info: ClientInfo) {
            *self.client_info.lock() = Some(info);
        }
    }

    fn server() -> HotloadServer {
        HotloadServer::new(Arc::new(Runtime::new()), ServerConfig::default()).unwrap()
    }

    async fn settle(server: &HotloadServer) {
        for _ in 0..200 {
            if server.context().tasks.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("tasks did not settle");
    }

    fn prompt(text: &str) -> Prompt {
        Prompt::new(
            "",
            vec![PromptMessage {
                role: PromptRole::User,
                content: text.into(),
            }],
        )
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observers → dispatcher
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn mutations_notify_in_order() {
        let server = server();
        let session = ScriptedSession::new(Mode::Record);
        server.context().sessions.attach(session.clone());
        server.context().subscriptions.subscribe("text://doc", "scripted");
        let runtime = server.runtime();

        runtime.register_resource("doc", Resource::text("v1"), true).unwrap();
        settle(&server).await;
        runtime.register_resource("doc", Resource::text("v2"), true).unwrap();
        settle(&server).await;
        runtime.register_tool("grep", ToolConfig::new("tools.grep"), true).unwrap();
        settle(&server).await;
        runtime.register_tool("grep", ToolConfig::new("tools.rg"), true).unwrap();
        settle(&server).await;
        runtime.register_prompt("greet", prompt("hi"), true).unwrap();
        settle(&server).await;
        runtime.resources().remove("doc").unwrap();
        settle(&server).await;

        assert_eq!(
            session.methods(),
            [
                "notifications/resources/list_changed",
                "notifications/resources/updated",
                "notifications/tools/list_changed",
                "notifications/tools/list_changed",
                "notifications/prompts/list_changed",
                "notifications/resources/list_changed",
            ]
        );
        let updated = &session.sent.lock()[1];
        assert_eq!(updated.params.as_ref().unwrap()["uri"], "text://doc");
    }

    #[tokio::test]
    async fn change_to_unsubscribed_resource_sends_nothing() {
        let server = server();
        let session = ScriptedSession::new(Mode::Record);
        server.context().sessions.attach(session.clone());
        let runtime = server.runtime();

        runtime.register_resource("doc", Resource::text("v1"), true).unwrap();
        settle(&server).await;
        runtime.register_resource("doc", Resource::text("v2"), true).unwrap();
        assert!(server.context().tasks.is_empty());
        settle(&server).await;

        assert_eq!(session.methods(), ["notifications/resources/list_changed"]);
    }

    #[tokio::test]
    async fn notify_without_session_is_a_noop() {
        let server = server();
        let dispatcher = server.dispatcher();
        server.context().subscriptions.subscribe("text://doc", "gone");

        dispatcher.notify_list_changed(hotload_protocol::ComponentKind::Tool);
        dispatcher.notify_resource_changed("text://doc");
        dispatcher.notify_progress("tok", 0.5, Some(1.0), Some("halfway"));
        server
            .runtime()
            .register_tool("grep", ToolConfig::new("tools.grep"), true)
            .unwrap();

        assert!(server.context().tasks.is_empty());
        assert!(dispatcher.client_info().is_none());
    }

    #[tokio::test]
    async fn closed_session_failures_are_swallowed() {
        let server = server();
        server
            .context()
            .sessions
            .attach(ScriptedSession::new(Mode::Closed));

        server
            .runtime()
            .register_resource("doc", Resource::text("v1"), true)
            .unwrap();
        server.dispatcher().notify_progress("tok", 1.0, None, None);
        settle(&server).await;
    }

    #[tokio::test]
    async fn progress_with_description_also_logs() {
        let server = server();
        let session = ScriptedSession::new(Mode::Record);
        server.context().sessions.attach(session.clone());

        server
            .dispatcher()
            .notify_progress("index", 3.0, Some(10.0), Some("Indexing"));
        settle(&server).await;

        assert_eq!(
            session.methods(),
            ["notifications/progress", "notifications/message"]
        );
        let sent = session.sent.lock();
        let message = &sent[1];
        assert_eq!(message.params.as_ref().unwrap()["level"], "info");
        assert_eq!(message.params.as_ref().unwrap()["data"], "Indexing");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sends_to_one_session_keep_their_order() {
        let server = server();
        let session = ScriptedSession::new(Mode::Record);
        server.context().sessions.attach(session.clone());
        let dispatcher = server.dispatcher();

        for i in 0..64 {
            dispatcher.notify_progress(&format!("t{i}"), i as f64, None, None);
        }
        settle(&server).await;

        let tokens: Vec<String> = session
            .sent
            .lock()
            .iter()
            .map(|n| n.params.as_ref().unwrap()["progressToken"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = (0..64).map(|i| format!("t{i}")).collect();
        assert_eq!(tokens, expected);
    }

    #[tokio::test]
    async fn reregistering_an_equal_resource_still_updates_subscribers() {
        let server = server();
        let session = ScriptedSession::new(Mode::Record);
        server.context().sessions.attach(session.clone());
        server.context().subscriptions.subscribe("text://doc", "scripted");
        let runtime = server.runtime();

        runtime.register_resource("doc", Resource::text("v1"), true).unwrap();
        runtime.register_resource("doc", Resource::text("v1"), true).unwrap();
        settle(&server).await;

        assert_eq!(
            session.methods(),
            [
                "notifications/resources/list_changed",
                "notifications/resources/updated",
            ]
        );
    }

    #[tokio::test]
    async fn client_info_comes_from_current_session() {
        let server = server();
        let session = ScriptedSession::new(Mode::Record);
        session.set_client_info(ClientInfo {
            name: "inspector".into(),
            version: "1.0".into(),
        });
        server.context().sessions.attach(session);
        assert_eq!(server.dispatcher().client_info().unwrap().name, "inspector");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shutdown
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn shutdown_cancels_in_flight_sends() {
        const K: usize = 5;
        let server = server();
        let session = ScriptedSession::new(Mode::Hang);
        server.context().sessions.attach(session.clone());

        for _ in 0..K {
            server
                .dispatcher()
                .notify_list_changed(hotload_protocol::ComponentKind::Resource);
        }
        assert_eq!(server.context().tasks.len(), K);
        // Let the head send reach its pending point; the rest queue behind it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(server.context().tasks.len(), K);

        server.shutdown().await;
        assert!(server.context().tasks.is_empty());
        assert_eq!(session.dropped.load(Ordering::SeqCst), 1);

        let runtime = server.runtime();
        assert!(runtime.is_closed());
        assert_eq!(runtime.resources().observer_count(), 0);
        assert_eq!(runtime.tools().observer_count(), 0);
        assert_eq!(runtime.prompts().observer_count(), 0);
        assert!(runtime.register_resource("late", Resource::text("x"), true).is_err());

        server.shutdown().await;
        assert!(server.is_shut_down());
    }

    #[test]
    fn gateway_requires_stdio() {
        let config = ServerConfig {
            transport: TransportKind::Stream,
            gateway: Some(GatewayConfig::default()),
            ..Default::default()
        };
        let result = HotloadServer::new(Arc::new(Runtime::new()), config);
        assert!(matches!(result, Err(ServerError::GatewayRequiresStdio)));
    }

    #[tokio::test]
    async fn gateway_bind_failure_with_fail_fast_aborts_start() {
        let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = blocker.local_addr().unwrap().port();
        let config = ServerConfig {
            gateway: Some(GatewayConfig {
                port,
                ..Default::default()
            }),
            gateway_fail_fast: true,
            ..Default::default()
        };
        let server = HotloadServer::new(Arc::new(Runtime::new()), config).unwrap();

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Gateway(_)));
        assert!(server.is_shut_down());
        assert!(server.runtime().is_closed());
    }
}
