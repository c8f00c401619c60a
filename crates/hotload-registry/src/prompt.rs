//! Prompt components: message templates offered to clients.

use hotload_protocol::ComponentKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default)]
    pub description: String,
    pub messages: Vec<PromptMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

impl Prompt {
    pub fn new(description: impl Into<String>, messages: Vec<PromptMessage>) -> Self {
        Self {
            description: description.into(),
            messages,
            arguments: Vec::new(),
        }
    }

    /// Parse and validate a loosely-typed payload.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let prompt: Prompt = serde_json::from_value(value)
            .map_err(|e| ValidationError::malformed(ComponentKind::Prompt, e))?;
        prompt.validate()?;
        Ok(prompt)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::field("messages", "at least one message is required"));
        }
        if self.arguments.iter().any(|a| a.name.trim().is_empty()) {
            return Err(ValidationError::field("arguments", "argument names must not be empty"));
        }
        Ok(())
    }
}
