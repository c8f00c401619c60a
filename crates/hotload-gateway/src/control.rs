//! Control-plane operations over the shared runtime.
//!
//! HTTP routes and WebSocket messages are thin wrappers around these.

use std::collections::BTreeMap;
use std::sync::Arc;

use hotload_protocol::ComponentKind;
use hotload_registry::{
    Prompt, RegistryError, Resource, Runtime, ToolConfig, ToolSchema, ValidationError,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::models::{BulkUpdateResponse, ComponentListing, ComponentResponse, ConfigUpdateRequest};

/// Name reported for a successful raw config injection.
const INJECTION_NAME: &str = "yaml_injection";

#[derive(Clone)]
pub struct ControlPlane {
    runtime: Arc<Runtime>,
}

impl ControlPlane {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Validate `payload` as a `kind` component and register it, replacing
    /// any existing component of the same name.
    pub fn add_or_replace(
        &self,
        kind: ComponentKind,
        name: &str,
        payload: Value,
    ) -> Result<ComponentResponse, GatewayError> {
        self.register(kind, name, payload, true)?;
        debug!("{} {name} registered", kind.label());
        Ok(ComponentResponse::success(
            kind,
            name,
            format!("{} {name} registered", kind.label()),
        ))
    }

    pub fn remove(&self, kind: ComponentKind, name: &str) -> Result<ComponentResponse, GatewayError> {
        self.runtime.remove(kind, name)?;
        Ok(ComponentResponse::success(
            kind,
            name,
            format!("{} {name} removed", kind.label()),
        ))
    }

    pub fn list_components(&self) -> ComponentListing {
        ComponentListing {
            resources: self.runtime.names(ComponentKind::Resource),
            tools: self.runtime.names(ComponentKind::Tool),
            prompts: self.runtime.names(ComponentKind::Prompt),
        }
    }

    pub fn list_resources(&self) -> BTreeMap<String, Resource> {
        self.runtime.resources().snapshot().into_iter().collect()
    }

    pub fn list_tools(&self) -> Result<BTreeMap<String, ToolSchema>, GatewayError> {
        self.runtime
            .tools()
            .snapshot()
            .into_iter()
            .map(|(name, tool)| Ok((name, tool.schema()?)))
            .collect::<Result<_, ValidationError>>()
            .map_err(|e| GatewayError::Internal(format!("Failed to get tool schemas: {e}")))
    }

    pub fn list_prompts(&self) -> BTreeMap<String, Prompt> {
        self.runtime.prompts().snapshot().into_iter().collect()
    }

    /// Apply every item independently: resources first, then tools, each in
    /// payload order. A failing item is reported and does not stop the rest.
    pub fn bulk_apply(&self, request: ConfigUpdateRequest) -> BulkUpdateResponse {
        let mut report = BulkUpdateResponse::default();
        let groups = [
            (ComponentKind::Resource, request.resources),
            (ComponentKind::Tool, request.tools),
        ];
        for (kind, items) in groups {
            for (name, payload) in items.unwrap_or_default() {
                let result = match self.register(kind, &name, payload, request.replace_existing) {
                    Ok(()) => ComponentResponse::success(
                        kind,
                        &name,
                        format!("{} {name} registered", kind.label()),
                    ),
                    Err(e) => {
                        warn!("Bulk update of {} {name} failed: {e}", kind.label());
                        ComponentResponse::error(kind, &name, e.to_string())
                    }
                };
                report.push(result);
            }
        }
        report
    }

    /// Inject a raw `{resources, tools}` document.
    ///
    /// All-or-nothing: every item is validated before anything is applied,
    /// and the first invalid item rejects the whole document. A document that
    /// arrives after shutdown is refused before anything is applied; only a
    /// shutdown racing the apply itself can leave it partially registered.
    pub fn inject_raw_config(&self, payload: Value) -> Result<ComponentResponse, GatewayError> {
        debug!("Received config: {payload}");
        let Value::Object(mut config) = payload else {
            return Err(GatewayError::BadRequest(
                "Config must be a JSON object".into(),
            ));
        };

        let resources = section(&mut config, "resources")?
            .into_iter()
            .map(|(name, raw)| Ok((name, Resource::from_value(raw)?)))
            .collect::<Result<Vec<_>, ValidationError>>()?;
        let tools = section(&mut config, "tools")?
            .into_iter()
            .map(|(name, raw)| Ok((name, ToolConfig::from_value(raw)?)))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        if self.runtime.resources().is_closed() {
            return Err(RegistryError::Closed { kind: ComponentKind::Resource }.into());
        }
        if self.runtime.tools().is_closed() {
            return Err(RegistryError::Closed { kind: ComponentKind::Tool }.into());
        }

        for (name, resource) in resources {
            self.runtime.register_resource(&name, resource, true)?;
            debug!("Resource {name} registered");
        }
        for (name, tool) in tools {
            self.runtime.register_tool(&name, tool, true)?;
            debug!("Tool {name} registered");
        }

        Ok(ComponentResponse::success(
            ComponentKind::Tool,
            INJECTION_NAME,
            "Config injected successfully",
        ))
    }

    fn register(
        &self,
        kind: ComponentKind,
        name: &str,
        payload: Value,
        replace: bool,
    ) -> Result<(), GatewayError> {
        match kind {
            ComponentKind::Resource => {
                let resource = Resource::from_value(payload)?;
                self.runtime.register_resource(name, resource, replace)?;
            }
            ComponentKind::Tool => {
                let tool = ToolConfig::from_value(payload)?;
                self.runtime.register_tool(name, tool, replace)?;
            }
            ComponentKind::Prompt => {
                let prompt = Prompt::from_value(payload)?;
                self.runtime.register_prompt(name, prompt, replace)?;
            }
        }
        Ok(())
    }
}

/// Take an optional object-valued section out of a raw config document.
fn section(config: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>, GatewayError> {
    match config.remove(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(items)) => Ok(items),
        Some(_) => Err(GatewayError::BadRequest(format!(
            "'{key}' must be a mapping of names to configs"
        ))),
    }
}
