//! Component kinds shared by registries, observers and the control plane.

use serde::{Deserialize, Serialize};

use crate::notifications::Notifications;

/// The three kinds of named component a server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Resource,
    Tool,
    Prompt,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Tool => "tool",
            Self::Prompt => "prompt",
        }
    }

    /// Capitalized label used in human-readable messages ("Resource r1 removed").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resource => "Resource",
            Self::Tool => "Tool",
            Self::Prompt => "Prompt",
        }
    }

    /// Notification method announcing that the list of this kind changed.
    pub fn list_changed_method(&self) -> &'static str {
        match self {
            Self::Resource => Notifications::RESOURCES_LIST_CHANGED,
            Self::Tool => Notifications::TOOLS_LIST_CHANGED,
            Self::Prompt => Notifications::PROMPTS_LIST_CHANGED,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
