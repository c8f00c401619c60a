//! MCP request router: answers client requests from the runtime's registries.

use std::sync::Arc;

use hotload_protocol::lifecycle::{DEFAULT_PROTOCOL_VERSION, ServerCapabilities};
use hotload_protocol::{
    HandlerResult, InitializeParams, InitializeResult, McpError, Methods, Notifications, ServerInfo,
};
use hotload_registry::Runtime;
use hotload_transport::{RequestContext, RequestHandler, Session};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::subscriptions::SubscriptionTable;

#[derive(Debug, Deserialize)]
struct UriParams {
    uri: String,
}

pub struct McpRouter {
    info: ServerInfo,
    runtime: Arc<Runtime>,
    subscriptions: SubscriptionTable,
}

impl McpRouter {
    pub fn new(name: impl Into<String>, runtime: Arc<Runtime>, subscriptions: SubscriptionTable) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            runtime,
            subscriptions,
        }
    }

    fn initialize(&self, params: Option<Value>, ctx: &RequestContext) -> HandlerResult {
        let params: InitializeParams = parse_params(params)?;
        info!(
            "Client {} {} initialized session {}",
            params.client_info.name,
            params.client_info.version,
            ctx.session.id()
        );
        ctx.session.set_client_info(params.client_info);

        let result = InitializeResult {
            protocol_version: params
                .protocol_version
                .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.into()),
            capabilities: ServerCapabilities::default(),
            server_info: self.info.clone(),
        };
        serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
    }

    fn list_resources(&self) -> HandlerResult {
        let resources: Vec<Value> = self
            .runtime
            .resources()
            .snapshot()
            .into_iter()
            .map(|(name, resource)| {
                json!({
                    "uri": self.runtime.resource_uri(&name, &resource),
                    "name": name,
                    "description": resource.description(),
                })
            })
            .collect();
        Ok(json!({ "resources": resources }))
    }

    fn list_tools(&self) -> HandlerResult {
        let mut tools = Vec::new();
        for (name, tool) in self.runtime.tools().snapshot() {
            let schema = tool
                .schema()
                .map_err(|e| McpError::internal(format!("Failed to build schema for {name}: {e}")))?;
            tools.push(json!({
                "name": schema.name,
                "description": schema.description,
                "inputSchema": schema.parameters,
            }));
        }
        Ok(json!({ "tools": tools }))
    }

    fn list_prompts(&self) -> HandlerResult {
        let prompts: Vec<Value> = self
            .runtime
            .prompts()
            .snapshot()
            .into_iter()
            .map(|(name, prompt)| {
                json!({
                    "name": name,
                    "description": prompt.description,
                    "arguments": prompt.arguments,
                })
            })
            .collect();
        Ok(json!({ "prompts": prompts }))
    }
}

impl RequestHandler for McpRouter {
    async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: &RequestContext,
    ) -> HandlerResult {
        if self.runtime.is_closed() {
            return Err(McpError::shutting_down());
        }

        match method {
            Methods::INITIALIZE => self.initialize(params, ctx),
            Methods::PING => Ok(json!({})),
            Methods::RESOURCES_LIST => self.list_resources(),
            Methods::RESOURCES_SUBSCRIBE => {
                let UriParams { uri } = parse_params(params)?;
                self.subscriptions.subscribe(&uri, ctx.session.id());
                debug!("Session {} subscribed to {uri}", ctx.session.id());
                Ok(json!({}))
            }
            Methods::RESOURCES_UNSUBSCRIBE => {
                let UriParams { uri } = parse_params(params)?;
                self.subscriptions.unsubscribe(&uri, ctx.session.id());
                Ok(json!({}))
            }
            Methods::TOOLS_LIST => self.list_tools(),
            Methods::PROMPTS_LIST => self.list_prompts(),
            other => Err(McpError::method_not_found(other)),
        }
    }

    async fn handle_notification(&self, method: &str, params: Option<Value>, ctx: &RequestContext) {
        match method {
            Notifications::INITIALIZED => {
                info!("Session {} ready", ctx.session.id());
            }
            Notifications::CANCELLED => {
                let request_id = params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .cloned()
                    .unwrap_or(Value::Null);
                // Requests are answered inline, so there is nothing in flight to stop.
                debug!("Session {} cancelled request {request_id}", ctx.session.id());
            }
            other => debug!("Ignoring notification {other} from session {}", ctx.session.id()),
        }
    }

    fn session_closed(&self, session_id: &str) {
        self.subscriptions.unsubscribe_session(session_id);
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, McpError> {
    let params = params.ok_or_else(|| McpError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotload_registry::{Resource, ToolConfig};
    use hotload_transport::PeerSession;

    fn router() -> (McpRouter, Arc<Runtime>, SubscriptionTable) {
        let runtime = Arc::new(Runtime::new());
        let subscriptions = SubscriptionTable::new();
        (
            McpRouter::new("hotload-test", runtime.clone(), subscriptions.clone()),
            runtime,
            subscriptions,
        )
    }

    fn ctx() -> RequestContext {
        let (session, _rx) = PeerSession::channel(8);
        RequestContext::new(session)
    }

    #[tokio::test]
    async fn initialize_records_client_info() {
        let (router, _, _) = router();
        let ctx = ctx();
        let result = router
            .handle_request(
                "initialize",
                Some(json!({"protocolVersion": "2024-11-05", "clientInfo": {"name": "inspector", "version": "0.3"}})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["serverInfo"]["name"], "hotload-test");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(ctx.session.client_info().unwrap().name, "inspector");
    }

    #[tokio::test]
    async fn lists_components() {
        let (router, runtime, _) = router();
        runtime.register_resource("doc", Resource::text("hi"), true).unwrap();
        runtime
            .register_tool("grep", ToolConfig::new("tools.grep"), true)
            .unwrap();
        let ctx = ctx();

        let resources = router.handle_request("resources/list", None, &ctx).await.unwrap();
        assert_eq!(resources["resources"][0]["uri"], "text://doc");

        let tools = router.handle_request("tools/list", None, &ctx).await.unwrap();
        assert_eq!(tools["tools"][0]["name"], "grep");

        let prompts = router.handle_request("prompts/list", None, &ctx).await.unwrap();
        assert_eq!(prompts["prompts"], json!([]));
    }

    #[tokio::test]
    async fn subscribe_and_session_close() {
        let (router, _, subscriptions) = router();
        let ctx = ctx();
        router
            .handle_request("resources/subscribe", Some(json!({"uri": "text://doc"})), &ctx)
            .await
            .unwrap();
        assert!(subscriptions.is_subscribed("text://doc"));

        router.session_closed(ctx.session.id());
        assert!(!subscriptions.is_subscribed("text://doc"));

        let err = router
            .handle_request("resources/subscribe", None, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn unknown_method_and_closed_runtime() {
        let (router, runtime, _) = router();
        let ctx = ctx();
        let err = router.handle_request("resources/read", None, &ctx).await.unwrap_err();
        assert_eq!(err.code, -32601);

        runtime.shutdown();
        assert!(router.handle_request("ping", None, &ctx).await.is_err());
    }

    #[tokio::test]
    async fn client_notifications_are_absorbed() {
        let (router, _, subscriptions) = router();
        let (session, mut rx) = PeerSession::channel(8);
        let ctx = RequestContext::new(session);
        router
            .handle_request("resources/subscribe", Some(json!({"uri": "text://doc"})), &ctx)
            .await
            .unwrap();

        router
            .handle_notification(Notifications::INITIALIZED, None, &ctx)
            .await;
        router
            .handle_notification(Notifications::CANCELLED, Some(json!({"requestId": 4})), &ctx)
            .await;
        router.handle_notification(Notifications::CANCELLED, None, &ctx).await;
        router
            .handle_notification("notifications/roots/list_changed", None, &ctx)
            .await;

        assert!(rx.try_recv().is_err());
        assert!(subscriptions.is_subscribed("text://doc"));
    }
}
