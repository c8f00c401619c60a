//! Hotload registries
//!
//! The authoritative stores for the components a server exposes. Each
//! [`Registry`] holds one component kind, applies mutations one at a time and
//! reports every successful mutation to its attached [`RegistryObserver`]s in
//! the order the mutations were applied.

pub mod error;
pub mod loader;
pub mod prompt;
pub mod registry;
pub mod resource;
pub mod runtime;
pub mod tool;

pub use error::{RegistryError, ValidationError};
pub use loader::{ResourceLoader, SchemeLoader};
pub use prompt::{Prompt, PromptArgument, PromptMessage, PromptRole};
pub use registry::{RegisterOutcome, Registry, RegistryEvent, RegistryObserver};
pub use resource::{
    CallableResource, CliResource, CommandSpec, ImageResource, PathResource, Resource,
    ResourceType, SourceResource, TextResource,
};
pub use runtime::Runtime;
pub use tool::{ToolConfig, ToolSchema};
