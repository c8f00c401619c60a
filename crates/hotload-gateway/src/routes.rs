//! HTTP routes of the control plane.
//!
//! # Endpoints
//!
//! - `POST /resources/{name}` / `GET /resources` / `DELETE /resources/{name}`
//! - `POST /tools/{name}` / `GET /tools` / `DELETE /tools/{name}`
//! - `POST /prompts/{name}` / `GET /prompts` / `DELETE /prompts/{name}`
//! - `GET /components` - names of every component, by kind
//! - `POST /bulk-update` - apply many items, reporting each one
//! - `POST /inject-config` - apply a raw config document atomically
//! - `GET /health`
//! - `GET /ws` - duplex update stream

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    response::Json,
    routing::{get, post},
};
use hotload_protocol::ComponentKind;
use hotload_registry::{Prompt, Resource, ToolSchema};
use serde_json::{Value, json};
use tokio::sync::watch;

use crate::control::ControlPlane;
use crate::error::GatewayError;
use crate::models::{BulkUpdateResponse, ComponentListing, ComponentResponse, ConfigUpdateRequest};
use crate::ws::ws_upgrade_handler;

type ApiResult<T> = Result<Json<T>, GatewayError>;
/// A JSON body whose rejection still renders through [`GatewayError`].
type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Router state. Handlers that only need the control plane extract
/// `State<Arc<ControlPlane>>` directly.
#[derive(Clone)]
pub struct GatewayState {
    pub control: Arc<ControlPlane>,
    /// Flips to `true` when the gateway stops; open streams close on it.
    pub shutdown: watch::Receiver<bool>,
}

impl FromRef<GatewayState> for Arc<ControlPlane> {
    fn from_ref(state: &GatewayState) -> Self {
        state.control.clone()
    }
}

pub fn router(control: Arc<ControlPlane>, shutdown: watch::Receiver<bool>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/components", get(list_components))
        .route("/resources", get(list_resources))
        .route("/resources/{name}", post(add_resource).delete(remove_resource))
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(add_tool).delete(remove_tool))
        .route("/prompts", get(list_prompts))
        .route("/prompts/{name}", post(add_prompt).delete(remove_prompt))
        .route("/bulk-update", post(bulk_update))
        .route("/inject-config", post(inject_config))
        .route("/ws", get(ws_upgrade_handler))
        .with_state(GatewayState { control, shutdown })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_components(State(control): State<Arc<ControlPlane>>) -> Json<ComponentListing> {
    Json(control.list_components())
}

// ─────────────────────────────────────────────────────────────────────────────
// Resources
// ─────────────────────────────────────────────────────────────────────────────

async fn add_resource(
    State(control): State<Arc<ControlPlane>>,
    Path(name): Path<String>,
    body: JsonBody<Value>,
) -> ApiResult<ComponentResponse> {
    let Json(payload) = body?;
    control
        .add_or_replace(ComponentKind::Resource, &name, payload)
        .map(Json)
}

async fn list_resources(State(control): State<Arc<ControlPlane>>) -> Json<BTreeMap<String, Resource>> {
    Json(control.list_resources())
}

async fn remove_resource(
    State(control): State<Arc<ControlPlane>>,
    Path(name): Path<String>,
) -> ApiResult<ComponentResponse> {
    control.remove(ComponentKind::Resource, &name).map(Json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────────────────────────────────────

async fn add_tool(
    State(control): State<Arc<ControlPlane>>,
    Path(name): Path<String>,
    body: JsonBody<Value>,
) -> ApiResult<ComponentResponse> {
    let Json(payload) = body?;
    control.add_or_replace(ComponentKind::Tool, &name, payload).map(Json)
}

async fn list_tools(State(control): State<Arc<ControlPlane>>) -> ApiResult<BTreeMap<String, ToolSchema>> {
    control.list_tools().map(Json)
}

async fn remove_tool(
    State(control): State<Arc<ControlPlane>>,
    Path(name): Path<String>,
) -> ApiResult<ComponentResponse> {
    control.remove(ComponentKind::Tool, &name).map(Json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompts
// ─────────────────────────────────────────────────────────────────────────────

async fn add_prompt(
    State(control): State<Arc<ControlPlane>>,
    Path(name): Path<String>,
    body: JsonBody<Value>,
) -> ApiResult<ComponentResponse> {
    let Json(payload) = body?;
    control.add_or_replace(ComponentKind::Prompt, &name, payload).map(Json)
}

async fn list_prompts(State(control): State<Arc<ControlPlane>>) -> Json<BTreeMap<String, Prompt>> {
    Json(control.list_prompts())
}

async fn remove_prompt(
    State(control): State<Arc<ControlPlane>>,
    Path(name): Path<String>,
) -> ApiResult<ComponentResponse> {
    control.remove(ComponentKind::Prompt, &name).map(Json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

async fn bulk_update(
    State(control): State<Arc<ControlPlane>>,
    body: JsonBody<ConfigUpdateRequest>,
) -> ApiResult<BulkUpdateResponse> {
    let Json(request) = body?;
    Ok(Json(control.bulk_apply(request)))
}

async fn inject_config(
    State(control): State<Arc<ControlPlane>>,
    body: JsonBody<Value>,
) -> ApiResult<ComponentResponse> {
    let Json(payload) = body?;
    control.inject_raw_config(payload).map(Json).map_err(|e| {
        tracing::error!("Failed to inject config: {e}");
        e
    })
}
