//! Commands: ordered lists of changes applied as one unit.

use crate::tree::TreeNode;
use refgraph_types::{CommandId, EntityId, Scalar};
use serde::{Deserialize, Serialize};

/// A command as recorded in the command log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl Command {
    pub fn new(id: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            id: CommandId::new(id),
            author: String::new(),
            message: String::new(),
            changes,
        }
    }
}

/// One change of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// Merge a nested entity tree.
    Import {
        entity: TreeNode,
        /// Roots to register over the tree; derived when empty.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        roots: Vec<EntityId>,
    },
    /// Add an entity under an existing parent.
    Insert {
        #[serde(rename = "parentId")]
        parent_id: EntityId,
        relation: String,
        entity: TreeNode,
    },
    /// Explicitly tombstone an entity.
    Delete { id: EntityId },
    /// Explicitly lift a tombstone.
    Undelete { id: EntityId },
    /// Change one property, guarded by the value the author last saw.
    Update {
        id: EntityId,
        property: String,
        #[serde(
            rename = "prevValue",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        prev_value: Option<PatchValue>,
        #[serde(rename = "newValue", default, skip_serializing_if = "Option::is_none")]
        new_value: Option<PatchValue>,
    },
}

/// Value side of an update: a literal or an ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchValue {
    Scalar(Scalar),
    List(Vec<ListEntry>),
}

/// Entry of a list value: an id (or level label) or a new entity tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListEntry {
    Id(String),
    Entity(TreeNode),
}

impl PatchValue {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(ids.into_iter().map(|s| ListEntry::Id(s.into())).collect())
    }
}

impl From<Scalar> for PatchValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for PatchValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::from(value))
    }
}
