use crate::error::{StorageError, StorageResult};
use refgraph_model::Entity;
use refgraph_types::{EntityId, EntityRef};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Type-bucketed arena of entities with a global id index.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: Vec<Entity>,
    buckets: BTreeMap<String, Vec<EntityRef>>,
    index: HashMap<EntityId, EntityRef>,
}

impl EntityGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Appends an entity to its type bucket and indexes it by id.
    pub fn insert(&mut self, entity: Entity) -> StorageResult<EntityRef> {
        if self.index.contains_key(&entity.id) {
            return Err(StorageError::DuplicateId(entity.id));
        }
        let r = EntityRef::from_index(self.entities.len());
        debug!("Indexed entity {} as {} (type={})", entity.id, r, entity.entity_type);
        self.index.insert(entity.id.clone(), r);
        self.buckets
            .entry(entity.entity_type.clone())
            .or_default()
            .push(r);
        self.entities.push(entity);
        Ok(r)
    }

    /// Looks up an entity by id.
    pub fn get(&self, id: &EntityId) -> Option<EntityRef> {
        self.index.get(id).copied()
    }

    /// Looks up an entity by id, failing with `NotFound`.
    pub fn require(&self, id: &EntityId) -> StorageResult<EntityRef> {
        self.get(id).ok_or_else(|| StorageError::NotFound(id.clone()))
    }

    #[must_use]
    pub fn has(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    /// Resolves a handle issued by this graph.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this graph.
    #[must_use]
    pub fn entity(&self, r: EntityRef) -> &Entity {
        match self.entities.get(r.index()) {
            Some(entity) => entity,
            None => panic!("invariant violation: dangling entity handle {r}"),
        }
    }

    /// Mutable counterpart of [`entity`](Self::entity).
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this graph.
    pub fn entity_mut(&mut self, r: EntityRef) -> &mut Entity {
        match self.entities.get_mut(r.index()) {
            Some(entity) => entity,
            None => panic!("invariant violation: dangling entity handle {r}"),
        }
    }

    /// Resolves an id straight to the stored entity.
    pub fn find(&self, id: &EntityId) -> Option<&Entity> {
        self.get(id).map(|r| self.entity(r))
    }

    pub fn id_of(&self, r: EntityRef) -> &EntityId {
        &self.entity(r).id
    }

    pub fn ids_of(&self, refs: &[EntityRef]) -> Vec<EntityId> {
        refs.iter().map(|&r| self.id_of(r).clone()).collect()
    }

    /// Resolves every id to a stored entity.
    ///
    /// # Panics
    ///
    /// Panics if any id is unknown. Callers only pass ids that were
    /// validated or created earlier in the same operation, so a miss means
    /// the graph is corrupt.
    pub fn resolve_all(&self, ids: &[EntityId]) -> Vec<EntityRef> {
        ids.iter()
            .map(|id| match self.get(id) {
                Some(r) => r,
                None => panic!("invariant violation: unresolvable entity id {id}"),
            })
            .collect()
    }

    /// Handles of all entities of one type, in insertion order.
    pub fn bucket(&self, entity_type: &str) -> &[EntityRef] {
        self.buckets.get(entity_type).map_or(&[], Vec::as_slice)
    }

    /// Names of all types that have at least one entity.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// All entities with their handles, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityRef, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityRef::from_index(i), e))
    }

    /// Records `parent` in `child`'s reverse links. Returns true if added.
    pub fn link_parent(&mut self, parent: EntityRef, child: EntityRef) -> bool {
        let parent_type = self.entity(parent).entity_type.clone();
        self.entity_mut(child).add_parent(&parent_type, parent)
    }

    /// Drops `parent` from `child`'s reverse links, unless `parent` still
    /// lists `child` in another relation.
    pub fn unlink_parent(&mut self, parent: EntityRef, child: EntityRef) -> bool {
        if self.entity(parent).has_child(child) {
            return false;
        }
        let parent_type = self.entity(parent).entity_type.clone();
        self.entity_mut(child).remove_parent(&parent_type, parent)
    }
}
