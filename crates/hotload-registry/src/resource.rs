//! Resource components: a closed set of six variants selected by a `type` tag.

use hotload_protocol::ComponentKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Discriminator values accepted in a resource payload's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Path,
    Text,
    Cli,
    Source,
    Callable,
    Image,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        Self::Path,
        Self::Text,
        Self::Cli,
        Self::Source,
        Self::Callable,
        Self::Image,
    ];

    /// Resolve a discriminator tag. `command` is accepted as an alias of `cli`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "path" => Some(Self::Path),
            "text" => Some(Self::Text),
            "cli" | "command" => Some(Self::Cli),
            "source" => Some(Self::Source),
            "callable" => Some(Self::Callable),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Text => "text",
            Self::Cli => "cli",
            Self::Source => "source",
            Self::Callable => "callable",
            Self::Image => "image",
        }
    }

    /// URI scheme used when deriving a resource's address from its name.
    pub fn uri_scheme(&self) -> &'static str {
        match self {
            Self::Path => "file",
            Self::Text => "text",
            Self::Cli => "cli",
            Self::Source => "python",
            Self::Callable => "callable",
            Self::Image => "image",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Variants
// ─────────────────────────────────────────────────────────────────────────────

/// Content read from a file or URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResource {
    pub path: String,
    #[serde(default)]
    pub watch: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Static inline text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResource {
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// A shell command line or an argv list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Args(Vec<String>),
}

impl CommandSpec {
    fn is_blank(&self) -> bool {
        match self {
            Self::Line(line) => line.trim().is_empty(),
            Self::Args(args) => args.iter().all(|a| a.trim().is_empty()),
        }
    }
}

/// Output of a command run on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliResource {
    pub command: CommandSpec,
    #[serde(default)]
    pub shell: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Seconds before the command is killed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Source code of an importable module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResource {
    pub import_path: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub include_tests: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Result of calling an importable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableResource {
    pub import_path: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub keyword_args: Map<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// An image file or URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResource {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource
// ─────────────────────────────────────────────────────────────────────────────

/// A resource component. Serializes with its discriminator in `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    Path(PathResource),
    Text(TextResource),
    Cli(CliResource),
    Source(SourceResource),
    Callable(CallableResource),
    Image(ImageResource),
}

impl Resource {
    /// Parse and validate a loosely-typed payload, dispatching on its `type` tag.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let tag = match value.get("type") {
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => return Err(ValidationError::UnknownType(other.to_string())),
            None => return Err(ValidationError::MissingType),
        };
        let resource_type =
            ResourceType::from_tag(&tag).ok_or(ValidationError::UnknownType(tag))?;

        let resource = match resource_type {
            ResourceType::Path => Self::Path(parse_variant(value)?),
            ResourceType::Text => Self::Text(parse_variant(value)?),
            ResourceType::Cli => Self::Cli(parse_variant(value)?),
            ResourceType::Source => Self::Source(parse_variant(value)?),
            ResourceType::Callable => Self::Callable(parse_variant(value)?),
            ResourceType::Image => Self::Image(parse_variant(value)?),
        };
        resource.validate()?;
        Ok(resource)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextResource {
            content: content.into(),
            description: String::new(),
            uri: None,
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Path(_) => ResourceType::Path,
            Self::Text(_) => ResourceType::Text,
            Self::Cli(_) => ResourceType::Cli,
            Self::Source(_) => ResourceType::Source,
            Self::Callable(_) => ResourceType::Callable,
            Self::Image(_) => ResourceType::Image,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Path(r) => &r.description,
            Self::Text(r) => &r.description,
            Self::Cli(r) => &r.description,
            Self::Source(r) => &r.description,
            Self::Callable(r) => &r.description,
            Self::Image(r) => &r.description,
        }
    }

    /// Explicit URI override, if the payload carried one.
    pub fn explicit_uri(&self) -> Option<&str> {
        match self {
            Self::Path(r) => r.uri.as_deref(),
            Self::Text(r) => r.uri.as_deref(),
            Self::Cli(r) => r.uri.as_deref(),
            Self::Source(r) => r.uri.as_deref(),
            Self::Callable(r) => r.uri.as_deref(),
            Self::Image(r) => r.uri.as_deref(),
        }
    }

    /// Field-level checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Path(r) => require_non_empty("path", &r.path),
            Self::Text(_) => Ok(()),
            Self::Cli(r) => {
                if r.command.is_blank() {
                    return Err(ValidationError::field("command", "must not be empty"));
                }
                match r.timeout {
                    Some(t) if t <= 0.0 => {
                        Err(ValidationError::field("timeout", "must be positive"))
                    }
                    _ => Ok(()),
                }
            }
            Self::Source(r) => require_import_path(&r.import_path),
            Self::Callable(r) => require_import_path(&r.import_path),
            Self::Image(r) => require_non_empty("path", &r.path),
        }
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Resource::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn parse_variant<T: DeserializeOwned>(value: Value) -> Result<T, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::malformed(ComponentKind::Resource, e))
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::field(field, "must not be empty"))
    } else {
        Ok(())
    }
}

/// Accepts dotted identifier paths such as `pkg.module.func`.
pub(crate) fn require_import_path(path: &str) -> Result<(), ValidationError> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::field(
            "import_path",
            format!("'{path}' is not a dotted import path"),
        ))
    }
}
