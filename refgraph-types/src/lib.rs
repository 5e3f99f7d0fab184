//! Core type definitions for refgraph.
//!
//! This crate defines the small, schema-agnostic types shared by every layer
//! of the store:
//! - Entity identifiers ([`EntityId`]) and arena handles ([`EntityRef`])
//! - Command identifiers ([`CommandId`])
//! - Literal property values ([`Scalar`]) and their sentinel semantics
//!
//! Everything that knows about entity types, relations or the graph itself
//! lives further up the stack.

mod ids;
mod value;

pub use ids::{CommandId, EntityId, EntityRef, UUID_PREFIX};
pub use value::{Scalar, Sentinel};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid entity id: {0:?}")]
    InvalidId(String),
}
