use refgraph_types::{EntityId, EntityRef, Scalar, Sentinel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Property names that may appear on incoming data but are never stored as literals.
pub const TRANSIENT_PROPERTIES: &[&str] = &["deleted", "dirty"];

/// Whether an entity field is part of the default external view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldVisibility {
    Visible,
    /// Bookkeeping that is only rendered when explicitly requested.
    Internal,
}

/// A node in the entity graph.
///
/// Relations, reverse links and roots hold [`EntityRef`] handles into the
/// owning graph, never owning pointers, so parent/child cycles are harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: String,
    /// Literal properties by name.
    pub properties: BTreeMap<String, Scalar>,
    /// Ordered child collections by relation name.
    pub relations: BTreeMap<String, Vec<EntityRef>>,
    /// Reverse links, keyed by the parent's type.
    pub parents: BTreeMap<String, BTreeSet<EntityRef>>,
    /// Registered roots that can currently reach this entity.
    pub roots: BTreeSet<EntityRef>,
    /// Has unpublished semantic changes. Only ever set, never cleared by merge.
    pub dirty: bool,
    /// Created since the last published release.
    pub unreleased: bool,
    /// Tombstone.
    pub deleted: bool,
    /// The tombstone was last toggled by an explicit delete/undelete.
    pub manual_tombstone: bool,
    /// Level entities collected from the subtree plus direct level links.
    pub level_index: Vec<EntityRef>,
}

impl Entity {
    /// Creates an empty, live entity.
    pub fn new(id: EntityId, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            properties: BTreeMap::new(),
            relations: BTreeMap::new(),
            parents: BTreeMap::new(),
            roots: BTreeSet::new(),
            dirty: false,
            unreleased: false,
            deleted: false,
            manual_tombstone: false,
            level_index: Vec::new(),
        }
    }

    /// Returns the visibility of a rendered field.
    #[must_use]
    pub fn field_visibility(field: &str) -> FieldVisibility {
        match field {
            "parents" | "roots" => FieldVisibility::Internal,
            _ => FieldVisibility::Visible,
        }
    }

    /// Extract a string literal.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Scalar::as_str)
    }

    /// Extract a boolean literal.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.properties.get(name).and_then(Scalar::as_bool)
    }

    /// Extract a numeric literal.
    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(Scalar::as_f64)
    }

    /// Children in a relation, empty if the relation was never set.
    pub fn relation(&self, name: &str) -> &[EntityRef] {
        self.relations.get(name).map_or(&[], Vec::as_slice)
    }

    /// All forward children across every relation, in relation order.
    pub fn children(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.relations.values().flatten().copied()
    }

    /// Returns true if `child` appears in any relation of this entity.
    #[must_use]
    pub fn has_child(&self, child: EntityRef) -> bool {
        self.relations.values().any(|list| list.contains(&child))
    }

    /// Returns true if the entity is not tombstoned.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Applies an incoming literal with sentinel semantics.
    ///
    /// `""` keeps the stored value, `"-"` removes it, anything else replaces
    /// it unless the two only differ in whitespace. Returns true if the
    /// stored state changed.
    pub fn merge_literal(&mut self, name: &str, incoming: &Scalar) -> bool {
        match incoming.sentinel() {
            Some(Sentinel::Keep) => false,
            Some(Sentinel::Remove) => self.properties.remove(name).is_some(),
            None => match self.properties.get(name) {
                Some(stored) if stored.same_content(incoming) => false,
                _ => {
                    self.properties.insert(name.to_string(), incoming.clone());
                    true
                }
            },
        }
    }

    /// Sets the dirty latch.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Sets the dirty latch unless the entity was never released.
    pub fn mark_dirty_if_released(&mut self) {
        if !self.unreleased {
            self.dirty = true;
        }
    }

    /// Adds a reverse link. Returns true if it was not present.
    pub fn add_parent(&mut self, parent_type: &str, parent: EntityRef) -> bool {
        self.parents
            .entry(parent_type.to_string())
            .or_default()
            .insert(parent)
    }

    /// Removes a reverse link, dropping the bucket once it is empty.
    pub fn remove_parent(&mut self, parent_type: &str, parent: EntityRef) -> bool {
        let Some(set) = self.parents.get_mut(parent_type) else {
            return false;
        };
        let removed = set.remove(&parent);
        if set.is_empty() {
            self.parents.remove(parent_type);
        }
        removed
    }

    /// Returns true if `parent` is recorded as a reverse link under any type.
    #[must_use]
    pub fn has_parent(&self, parent: EntityRef) -> bool {
        self.parents.values().any(|set| set.contains(&parent))
    }
}
