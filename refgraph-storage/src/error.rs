//! Error types for the storage layer.

use refgraph_types::EntityId;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An entity with this id is already indexed.
    #[error("duplicate entity id: {0}")]
    DuplicateId(EntityId),

    /// Entity not found.
    #[error("entity not found: {0}")]
    NotFound(EntityId),
}
