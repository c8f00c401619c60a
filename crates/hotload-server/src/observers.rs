//! Registry observers that turn component changes into client notifications.
//!
//! - resources: added/removed → resource list changed; changed → an update
//!   for the resource's URI, sent only if someone subscribed to it
//! - tools and prompts: any change → list changed

use std::sync::Arc;

use hotload_protocol::ComponentKind;
use hotload_registry::{
    Prompt, RegistryObserver, Resource, ResourceLoader, Runtime, ToolConfig,
};

use crate::dispatcher::Dispatcher;

pub struct ResourceObserver {
    dispatcher: Dispatcher,
    loader: Arc<dyn ResourceLoader>,
}

impl ResourceObserver {
    pub fn new(dispatcher: Dispatcher, loader: Arc<dyn ResourceLoader>) -> Self {
        Self { dispatcher, loader }
    }
}

impl RegistryObserver<Resource> for ResourceObserver {
    fn on_added(&self, _name: &str, _value: &Resource) {
        self.dispatcher.notify_list_changed(ComponentKind::Resource);
    }

    fn on_removed(&self, _name: &str, _value: &Resource) {
        self.dispatcher.notify_list_changed(ComponentKind::Resource);
    }

    fn on_changed(&self, name: &str, _old: &Resource, new: &Resource) {
        let uri = self.loader.uri_for(name, new);
        self.dispatcher.notify_resource_changed(&uri);
    }
}

pub struct ToolObserver {
    dispatcher: Dispatcher,
}

impl ToolObserver {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl RegistryObserver<ToolConfig> for ToolObserver {
    fn on_added(&self, _name: &str, _value: &ToolConfig) {
        self.dispatcher.notify_list_changed(ComponentKind::Tool);
    }

    fn on_removed(&self, _name: &str, _value: &ToolConfig) {
        self.dispatcher.notify_list_changed(ComponentKind::Tool);
    }

    fn on_changed(&self, _name: &str, _old: &ToolConfig, _new: &ToolConfig) {
        self.dispatcher.notify_list_changed(ComponentKind::Tool);
    }
}

pub struct PromptObserver {
    dispatcher: Dispatcher,
}

impl PromptObserver {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl RegistryObserver<Prompt> for PromptObserver {
    fn on_added(&self, _name: &str, _value: &Prompt) {
        self.dispatcher.notify_list_changed(ComponentKind::Prompt);
    }

    fn on_removed(&self, _name: &str, _value: &Prompt) {
        self.dispatcher.notify_list_changed(ComponentKind::Prompt);
    }

    fn on_changed(&self, _name: &str, _old: &Prompt, _new: &Prompt) {
        self.dispatcher.notify_list_changed(ComponentKind::Prompt);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observers
// ─────────────────────────────────────────────────────────────────────────────

/// The three observers of one runtime. Attaching and detaching are both
/// idempotent.
pub struct Observers {
    resources: Arc<dyn RegistryObserver<Resource>>,
    tools: Arc<dyn RegistryObserver<ToolConfig>>,
    prompts: Arc<dyn RegistryObserver<Prompt>>,
}

impl Observers {
    pub fn new(dispatcher: Dispatcher, loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            resources: Arc::new(ResourceObserver::new(dispatcher.clone(), loader)),
            tools: Arc::new(ToolObserver::new(dispatcher.clone())),
            prompts: Arc::new(PromptObserver::new(dispatcher)),
        }
    }

    /// Build the observers and attach them to `runtime`'s registries.
    pub fn attach(runtime: &Runtime, dispatcher: Dispatcher) -> Self {
        let observers = Self::new(dispatcher, runtime.loader().clone());
        observers.attach_to(runtime);
        observers
    }

    pub fn attach_to(&self, runtime: &Runtime) {
        runtime.resources().attach(self.resources.clone());
        runtime.tools().attach(self.tools.clone());
        runtime.prompts().attach(self.prompts.clone());
    }

    pub fn detach(&self, runtime: &Runtime) {
        runtime.resources().detach(&self.resources);
        runtime.tools().detach(&self.tools);
        runtime.prompts().detach(&self.prompts);
    }
}
