//! Registry and payload validation errors.

use hotload_protocol::ComponentKind;
use thiserror::Error;

/// A component payload that could not be turned into a typed component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing resource type discriminator")]
    MissingType,

    #[error("Unknown resource type: {0}")]
    UnknownType(String),

    #[error("Invalid {kind} payload: {message}")]
    Malformed { kind: ComponentKind, message: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },
}

impl ValidationError {
    pub fn malformed(kind: ComponentKind, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            kind,
            message: err.to_string(),
        }
    }

    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

/// Failure of a single registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{} {name} already exists", .kind.label())]
    AlreadyExists { kind: ComponentKind, name: String },

    #[error("{} {name} not found", .kind.label())]
    NotFound { kind: ComponentKind, name: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{} registry is closed", .kind.label())]
    Closed { kind: ComponentKind },
}
