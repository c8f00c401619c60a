//! The component runtime shared by the server, its observers and the gateway.

use std::sync::Arc;

use hotload_protocol::ComponentKind;
use tracing::info;

use crate::error::RegistryError;
use crate::loader::{ResourceLoader, SchemeLoader};
use crate::prompt::Prompt;
use crate::registry::{RegisterOutcome, Registry};
use crate::resource::Resource;
use crate::tool::ToolConfig;

/// Bundle of the three component registries and the resource loader.
pub struct Runtime {
    resources: Registry<Resource>,
    tools: Registry<ToolConfig>,
    prompts: Registry<Prompt>,
    loader: Arc<dyn ResourceLoader>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_loader(Arc::new(SchemeLoader))
    }

    pub fn with_loader(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            resources: Registry::new(ComponentKind::Resource),
            tools: Registry::new(ComponentKind::Tool),
            prompts: Registry::new(ComponentKind::Prompt),
            loader,
        }
    }

    pub fn resources(&self) -> &Registry<Resource> {
        &self.resources
    }

    pub fn tools(&self) -> &Registry<ToolConfig> {
        &self.tools
    }

    pub fn prompts(&self) -> &Registry<Prompt> {
        &self.prompts
    }

    pub fn loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.loader
    }

    pub fn resource_uri(&self, name: &str, resource: &Resource) -> String {
        self.loader.uri_for(name, resource)
    }

    pub fn register_resource(
        &self,
        name: &str,
        resource: Resource,
        replace: bool,
    ) -> Result<RegisterOutcome, RegistryError> {
        resource.validate()?;
        self.resources.register(name, resource, replace)
    }

    pub fn register_tool(
        &self,
        name: &str,
        tool: ToolConfig,
        replace: bool,
    ) -> Result<RegisterOutcome, RegistryError> {
        tool.validate()?;
        self.tools.register(name, tool, replace)
    }

    pub fn register_prompt(
        &self,
        name: &str,
        prompt: Prompt,
        replace: bool,
    ) -> Result<RegisterOutcome, RegistryError> {
        prompt.validate()?;
        self.prompts.register(name, prompt, replace)
    }

    pub fn names(&self, kind: ComponentKind) -> Vec<String> {
        match kind {
            ComponentKind::Resource => self.resources.names(),
            ComponentKind::Tool => self.tools.names(),
            ComponentKind::Prompt => self.prompts.names(),
        }
    }

    /// Remove a component of any kind by name.
    pub fn remove(&self, kind: ComponentKind, name: &str) -> Result<(), RegistryError> {
        match kind {
            ComponentKind::Resource => self.resources.remove(name).map(drop),
            ComponentKind::Tool => self.tools.remove(name).map(drop),
            ComponentKind::Prompt => self.prompts.remove(name).map(drop),
        }
    }

    /// Close every registry. Reads keep working; mutations fail with `Closed`.
    pub fn shutdown(&self) {
        if self.is_closed() {
            return;
        }
        self.resources.close();
        self.tools.close();
        self.prompts.close();
        info!(
            "Runtime closed ({} resources, {} tools, {} prompts)",
            self.resources.len(),
            self.tools.len(),
            self.prompts.len()
        );
    }

    pub fn is_closed(&self) -> bool {
        self.resources.is_closed() && self.tools.is_closed() && self.prompts.is_closed()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
