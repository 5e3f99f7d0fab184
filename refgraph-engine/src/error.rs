//! Error types for import and patch operations.

use refgraph_types::{EntityId, Scalar};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;

/// Validation failures of an import tree. Nothing is mutated when one is
/// returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("imported entity of type {entity_type} has no id")]
    MissingId { entity_type: String },

    #[error("imported entity {id} has no @type")]
    MissingType { id: EntityId },

    #[error("unknown type {entity_type} for entity {id}")]
    UnknownType { id: EntityId, entity_type: String },

    #[error("unknown property {entity_type}.{property} on entity {id}")]
    UnknownProperty {
        id: EntityId,
        entity_type: String,
        property: String,
    },

    #[error("property {entity_type}.{property} on entity {id} must be a list of entities")]
    ExpectedList {
        id: EntityId,
        entity_type: String,
        property: String,
    },

    #[error("property {entity_type}.{property} on entity {id} holds a single entity")]
    ExpectedSingle {
        id: EntityId,
        entity_type: String,
        property: String,
    },

    #[error("property {entity_type}.{property} on entity {id} must be a literal")]
    ExpectedScalar {
        id: EntityId,
        entity_type: String,
        property: String,
    },

    #[error("entity {id} is typed {stored} but imported as {imported}")]
    TypeConflict {
        id: EntityId,
        stored: String,
        imported: String,
    },

    #[error("unknown root {id}")]
    UnknownRoot { id: EntityId },
}

impl ImportError {
    fn details(&self) -> Value {
        match self {
            Self::MissingId { entity_type } => json!({ "type": entity_type }),
            Self::MissingType { id } | Self::UnknownRoot { id } => json!({ "id": id }),
            Self::UnknownType { id, entity_type } => json!({ "id": id, "type": entity_type }),
            Self::UnknownProperty {
                id,
                entity_type,
                property,
            }
            | Self::ExpectedList {
                id,
                entity_type,
                property,
            }
            | Self::ExpectedSingle {
                id,
                entity_type,
                property,
            }
            | Self::ExpectedScalar {
                id,
                entity_type,
                property,
            } => json!({ "id": id, "type": entity_type, "property": property }),
            Self::TypeConflict {
                id,
                stored,
                imported,
            } => json!({ "id": id, "stored": stored, "imported": imported }),
        }
    }
}

/// Shape a patched property was expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Literal,
    List,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal => f.write_str("a literal"),
            Self::List => f.write_str("an array"),
        }
    }
}

/// Errors reported for a command or one of its changes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error(transparent)]
    Validation(#[from] ImportError),

    #[error("property {property} of {id} cannot be patched")]
    ReadOnly { id: EntityId, property: String },

    #[error("entity not found: {id}")]
    NotFound { id: EntityId },

    #[error("property {property} of {id} expected to be {expected}")]
    TypeMismatch {
        id: EntityId,
        property: String,
        expected: Shape,
    },

    #[error("property {property} of {id} has changed")]
    Conflict {
        id: EntityId,
        property: String,
        current: Option<Scalar>,
        expected: Option<Scalar>,
    },

    #[error("{} errors found", .0.len())]
    Aggregate(Vec<PatchError>),
}

impl PatchError {
    /// Status code reported to the caller.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::ReadOnly { .. } | Self::Aggregate(_) => 400,
            Self::NotFound { .. } => 404,
            Self::TypeMismatch { .. } => 406,
            Self::Conflict { .. } => 409,
        }
    }

    /// Structured form recorded in command status.
    pub fn payload(&self) -> ErrorPayload {
        let details = match self {
            Self::Validation(e) => e.details(),
            Self::ReadOnly { id, property } => json!({ "id": id, "property": property }),
            Self::NotFound { id } => json!({ "id": id }),
            Self::TypeMismatch {
                id,
                property,
                expected,
            } => json!({ "id": id, "property": property, "expected": expected }),
            Self::Conflict {
                id,
                property,
                current,
                expected,
            } => json!({ "id": id, "property": property, "value": current, "expected": expected }),
            Self::Aggregate(errors) => {
                Value::Array(errors.iter().map(|e| json!(e.payload())).collect())
            }
        };
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
            details,
        }
    }
}

/// Error as recorded in command status and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}
