//! Identifier types used throughout the refgraph core.
//!
//! Entity ids are opaque strings owned by the data set. Inside one graph an
//! entity is addressed by an [`EntityRef`], a plain arena index that stays
//! valid for the lifetime of the graph because entities are never freed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Legacy prefix some sources put in front of entity ids.
pub const UUID_PREFIX: &str = "/uuid/";

/// Globally unique, opaque identifier of an entity.
///
/// Deserialization goes through [`EntityId::new`], so `/uuid/`-prefixed ids
/// coming from older exports compare equal to their bare form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Creates an entity id, stripping a leading `/uuid/` prefix.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        match id.strip_prefix(UUID_PREFIX) {
            Some(rest) => Self(rest.to_string()),
            None => Self(id),
        }
    }

    /// Generates a fresh random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parses an entity id, rejecting empty or whitespace-only input.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let id = Self::new(s.trim());
        if id.0.is_empty() {
            return Err(crate::Error::InvalidId(s.to_string()));
        }
        Ok(id)
    }

    /// Returns the id with an external prefix removed, if present.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &str) -> Self {
        match self.0.strip_prefix(prefix) {
            Some(rest) if !rest.is_empty() => Self::new(rest),
            _ => self.clone(),
        }
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Handle to an entity inside one `EntityGraph` arena.
///
/// Only meaningful for the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(u32);

impl EntityRef {
    /// Creates a handle from an arena slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot does not fit in 32 bits.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(slot) => Self(slot),
            Err(_) => panic!("invariant violation: arena slot {index} exceeds u32"),
        }
    }

    /// Returns the arena slot.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a command in the command log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
