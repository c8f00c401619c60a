//! Tool components: importable callables advertised to clients.

use hotload_protocol::ComponentKind;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ValidationError;
use crate::resource::require_import_path;

/// Registration payload for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub import_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Function-call schema listed for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolConfig {
    pub fn new(import_path: impl Into<String>) -> Self {
        Self {
            import_path: import_path.into(),
            name: None,
            description: None,
        }
    }

    /// Parse and validate a loosely-typed payload.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let tool: ToolConfig = serde_json::from_value(value)
            .map_err(|e| ValidationError::malformed(ComponentKind::Tool, e))?;
        tool.validate()?;
        Ok(tool)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_import_path(&self.import_path)?;
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::field("name", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Build the listing schema. The name falls back to the last import path segment.
    pub fn schema(&self) -> Result<ToolSchema, ValidationError> {
        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .import_path
                .rsplit('.')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    ValidationError::field("import_path", "cannot derive a tool name")
                })?,
        };
        Ok(ToolSchema {
            name,
            description: self.description.clone().unwrap_or_default(),
            parameters: json!({ "type": "object", "properties": {} }),
        })
    }
}
