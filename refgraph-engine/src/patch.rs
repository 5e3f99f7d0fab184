//! Applying commands to the graph.

use crate::command::{Change, Command, ListEntry, PatchValue};
use crate::config::EngineConfig;
use crate::error::{ImportError, PatchError, PatchResult, Shape};
use crate::import::{ImportMerger, ImportStats, resolve_labels};
use crate::level;
use crate::tree::TreeNode;
use refgraph_model::{PropertyKind, SchemaCatalog};
use refgraph_reconcile::reconcile;
use refgraph_storage::{EntityGraph, reachability};
use refgraph_types::{EntityId, EntityRef, Scalar, Sentinel};
use tracing::{debug, info, warn};

/// Applies commands against a graph.
///
/// Changes of a command are applied in order. A failing change does not
/// stop the ones after it and nothing is rolled back; the command reports
/// its errors once every change was tried.
#[derive(Debug, Clone)]
pub struct PatchEngine {
    schema: SchemaCatalog,
    config: EngineConfig,
}

impl PatchEngine {
    pub fn new(schema: SchemaCatalog, config: EngineConfig) -> Self {
        Self { schema, config }
    }

    pub fn schema(&self) -> &SchemaCatalog {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn merger(&self) -> ImportMerger<'_> {
        ImportMerger::new(&self.schema, &self.config)
    }

    /// Merges an import tree directly, outside of any command.
    pub fn import_entity(
        &self,
        graph: &mut EntityGraph,
        tree: &TreeNode,
        roots: &[EntityId],
    ) -> PatchResult<ImportStats> {
        Ok(self.merger().import_entity(graph, tree, roots)?)
    }

    /// Applies every change of `command`.
    ///
    /// Returns the number of changes applied without error. With one
    /// failing change its error is returned as is; with several they are
    /// wrapped in [`PatchError::Aggregate`].
    pub fn apply(&self, graph: &mut EntityGraph, command: &Command) -> PatchResult<usize> {
        if command.changes.is_empty() {
            debug!("Command {} has no changes", command.id);
            return Ok(0);
        }
        info!(
            "Applying command {} ({} changes)",
            command.id,
            command.changes.len()
        );

        let mut updated = 0;
        let mut errors = Vec::new();
        for (i, change) in command.changes.iter().enumerate() {
            match self.apply_change(graph, change) {
                Ok(()) => updated += 1,
                Err(e) => {
                    warn!("Change {} of command {} failed: {}", i, command.id, e);
                    errors.push(e);
                }
            }
        }

        match errors.len() {
            0 => Ok(updated),
            1 => Err(errors.remove(0)),
            _ => Err(PatchError::Aggregate(errors)),
        }
    }

    fn apply_change(&self, graph: &mut EntityGraph, change: &Change) -> PatchResult<()> {
        match change {
            Change::Import { entity, roots } => self.apply_import(graph, entity, roots),
            Change::Insert {
                parent_id,
                relation,
                entity,
            } => self.apply_insert(graph, parent_id, relation, entity),
            Change::Delete { id } => self.set_tombstone(graph, id, true),
            Change::Undelete { id } => self.set_tombstone(graph, id, false),
            Change::Update {
                id,
                property,
                prev_value,
                new_value,
            } => self.apply_update(
                graph,
                id,
                property,
                prev_value.as_ref(),
                new_value.as_ref(),
            ),
        }
    }

    fn normalize(&self, id: &EntityId) -> EntityId {
        match &self.config.id_prefix {
            Some(prefix) => id.strip_prefix(prefix),
            None => id.clone(),
        }
    }

    fn lookup(&self, graph: &EntityGraph, id: &EntityId) -> PatchResult<EntityRef> {
        let id = self.normalize(id);
        graph.get(&id).ok_or(PatchError::NotFound { id })
    }

    // ── Import and insert ──

    fn apply_import(
        &self,
        graph: &mut EntityGraph,
        tree: &TreeNode,
        roots: &[EntityId],
    ) -> PatchResult<()> {
        let roots: Vec<EntityId> = if !roots.is_empty() {
            roots.iter().map(|id| self.normalize(id)).collect()
        } else {
            self.derive_roots(graph, tree)
        };
        self.merger().import_entity(graph, tree, &roots)?;
        Ok(())
    }

    /// A root-typed top entity is its own root; otherwise the stored top
    /// entity keeps the roots it already has.
    fn derive_roots(&self, graph: &EntityGraph, tree: &TreeNode) -> Vec<EntityId> {
        let Some(id) = tree.resolved_id() else {
            return Vec::new();
        };
        let is_root_type = tree
            .entity_type
            .as_deref()
            .is_some_and(|ty| self.schema.is_root_type(ty));
        if is_root_type {
            return vec![id];
        }
        match graph.find(&id) {
            Some(stored) => {
                let roots: Vec<EntityRef> = stored.roots.iter().copied().collect();
                graph.ids_of(&roots)
            }
            None => Vec::new(),
        }
    }

    fn apply_insert(
        &self,
        graph: &mut EntityGraph,
        parent_id: &EntityId,
        relation: &str,
        tree: &TreeNode,
    ) -> PatchResult<()> {
        let parent = self.lookup(graph, parent_id)?;
        let parent_type = graph.entity(parent).entity_type.clone();
        if self.schema.classify(&parent_type, relation) != Some(PropertyKind::Relation) {
            return Err(ImportError::UnknownProperty {
                id: graph.id_of(parent).clone(),
                entity_type: parent_type,
                property: relation.to_string(),
            }
            .into());
        }

        let mut tree = tree.clone();
        if tree.resolved_id().is_none() {
            tree.id = Some(EntityId::generate());
        }
        let child_id = match tree.resolved_id() {
            Some(id) => id,
            None => panic!("invariant violation: inserted entity has no id"),
        };

        let roots = {
            let refs: Vec<EntityRef> = graph.entity(parent).roots.iter().copied().collect();
            graph.ids_of(&refs)
        };
        self.merger().import_entity(graph, &tree, &roots)?;

        let current = graph.ids_of(graph.entity(parent).relation(relation));
        let single = self
            .schema
            .relation(&parent_type, relation)
            .is_some_and(|r| r.single);
        let desired = if single {
            vec![child_id.clone()]
        } else {
            let mut desired = current.clone();
            desired.push(child_id.clone());
            desired
        };
        self.reconcile_relation(graph, parent, relation, &current, &desired);
        debug!("Inserted {} under {}.{}", child_id, graph.id_of(parent), relation);
        Ok(())
    }

    fn set_tombstone(
        &self,
        graph: &mut EntityGraph,
        id: &EntityId,
        deleted: bool,
    ) -> PatchResult<()> {
        let r = self.lookup(graph, id)?;
        let entity = graph.entity_mut(r);
        entity.manual_tombstone = true;
        if entity.deleted != deleted {
            entity.deleted = deleted;
            entity.mark_dirty_if_released();
            info!(
                "{} {}",
                if deleted { "Deleted" } else { "Undeleted" },
                entity.id
            );
        }
        Ok(())
    }

    // ── Update ──

    fn apply_update(
        &self,
        graph: &mut EntityGraph,
        id: &EntityId,
        property: &str,
        prev: Option<&PatchValue>,
        new: Option<&PatchValue>,
    ) -> PatchResult<()> {
        let r = self.lookup(graph, id)?;
        let entity_id = graph.id_of(r).clone();
        let entity_type = graph.entity(r).entity_type.clone();
        let level = &self.config.level;

        if property == level.label_property
            && self.schema.classify(&entity_type, &level.relation) == Some(PropertyKind::Relation)
        {
            let baseline = self.label_ids(graph, &entity_id, property, prev)?;
            let desired = self.label_ids(graph, &entity_id, property, new)?;
            let relation = level.relation.clone();
            let desired = self.check_single(&entity_id, &entity_type, &relation, desired)?;
            self.reconcile_relation(graph, r, &relation, &baseline, &desired);
            return Ok(());
        }

        match self.schema.classify(&entity_type, property) {
            None => Err(ImportError::UnknownProperty {
                id: entity_id,
                entity_type,
                property: property.to_string(),
            }
            .into()),
            Some(PropertyKind::Transient) => Err(PatchError::ReadOnly {
                id: entity_id,
                property: property.to_string(),
            }),
            Some(PropertyKind::Literal) if property == "id" => Err(PatchError::ReadOnly {
                id: entity_id,
                property: property.to_string(),
            }),
            Some(PropertyKind::Literal) => {
                let mismatch = || PatchError::TypeMismatch {
                    id: entity_id.clone(),
                    property: property.to_string(),
                    expected: Shape::Literal,
                };
                let baseline = as_scalar(prev).ok_or_else(mismatch)?;
                let desired = as_scalar(new).ok_or_else(mismatch)?;
                self.update_literal(graph, r, property, baseline, desired)
            }
            Some(PropertyKind::Relation) => {
                let mismatch = || PatchError::TypeMismatch {
                    id: entity_id.clone(),
                    property: property.to_string(),
                    expected: Shape::List,
                };
                let prev = as_list(prev).ok_or_else(mismatch)?;
                let new = as_list(new).ok_or_else(mismatch)?;
                self.update_relation(graph, r, property, prev, new)
            }
        }
    }

    fn update_literal(
        &self,
        graph: &mut EntityGraph,
        r: EntityRef,
        property: &str,
        baseline: Option<&Scalar>,
        desired: Option<&Scalar>,
    ) -> PatchResult<()> {
        let desired = match desired.map(|d| (d, d.sentinel())) {
            Some((_, Some(Sentinel::Keep))) => return Ok(()),
            Some((_, Some(Sentinel::Remove))) | None => None,
            Some((d, None)) => Some(d),
        };
        let entity = graph.entity_mut(r);
        let current = entity.properties.get(property);
        if same(current, desired) {
            return Ok(());
        }
        if !same(current, baseline) {
            return Err(PatchError::Conflict {
                id: entity.id.clone(),
                property: property.to_string(),
                current: current.cloned(),
                expected: baseline.cloned(),
            });
        }
        match desired {
            Some(value) => {
                entity.properties.insert(property.to_string(), value.clone());
            }
            None => {
                entity.properties.remove(property);
            }
        }
        entity.mark_dirty_if_released();
        debug!("Updated {}.{}", entity.id, property);
        Ok(())
    }

    fn update_relation(
        &self,
        graph: &mut EntityGraph,
        r: EntityRef,
        property: &str,
        prev: &[ListEntry],
        new: &[ListEntry],
    ) -> PatchResult<()> {
        let entity_id = graph.id_of(r).clone();
        let entity_type = graph.entity(r).entity_type.clone();

        let baseline: Vec<EntityId> = prev.iter().filter_map(|e| self.entry_id(e)).collect();

        // Referenced ids must exist before anything is created.
        for entry in new {
            if let ListEntry::Id(raw) = entry {
                self.lookup(graph, &EntityId::new(raw.as_str()))?;
            }
        }

        let roots = {
            let refs: Vec<EntityRef> = graph.entity(r).roots.iter().copied().collect();
            graph.ids_of(&refs)
        };
        let mut desired = Vec::with_capacity(new.len());
        for entry in new {
            match entry {
                ListEntry::Id(raw) => desired.push(self.normalize(&EntityId::new(raw.as_str()))),
                ListEntry::Entity(tree) => {
                    let mut tree = tree.clone();
                    if tree.resolved_id().is_none() {
                        tree.id = Some(EntityId::generate());
                    }
                    self.merger().import_entity(graph, &tree, &roots)?;
                    if let Some(id) = tree.resolved_id() {
                        desired.push(id);
                    }
                }
            }
        }
        let desired = self.check_single(&entity_id, &entity_type, property, desired)?;
        self.reconcile_relation(graph, r, property, &baseline, &desired);
        Ok(())
    }

    fn check_single(
        &self,
        id: &EntityId,
        entity_type: &str,
        relation: &str,
        desired: Vec<EntityId>,
    ) -> PatchResult<Vec<EntityId>> {
        let single = self
            .schema
            .relation(entity_type, relation)
            .is_some_and(|r| r.single);
        if single && desired.len() > 1 {
            return Err(ImportError::ExpectedSingle {
                id: id.clone(),
                entity_type: entity_type.to_string(),
                property: relation.to_string(),
            }
            .into());
        }
        Ok(desired)
    }

    fn entry_id(&self, entry: &ListEntry) -> Option<EntityId> {
        match entry {
            ListEntry::Id(raw) => Some(self.normalize(&EntityId::new(raw.as_str()))),
            ListEntry::Entity(tree) => tree.resolved_id(),
        }
    }

    fn label_ids(
        &self,
        graph: &EntityGraph,
        id: &EntityId,
        property: &str,
        value: Option<&PatchValue>,
    ) -> PatchResult<Vec<EntityId>> {
        let mismatch = || PatchError::TypeMismatch {
            id: id.clone(),
            property: property.to_string(),
            expected: Shape::List,
        };
        let entries = as_list(value).ok_or_else(mismatch)?;
        let mut labels = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                ListEntry::Id(label) => labels.push(label.as_str()),
                ListEntry::Entity(_) => return Err(mismatch()),
            }
        }
        Ok(resolve_labels(graph, &self.config.level, &labels))
    }

    /// Applies `baseline → desired` to a stored relation and keeps reverse
    /// links, roots, dirty flags and level aggregates in step.
    fn reconcile_relation(
        &self,
        graph: &mut EntityGraph,
        r: EntityRef,
        relation: &str,
        baseline: &[EntityId],
        desired: &[EntityId],
    ) {
        let current = graph.ids_of(graph.entity(r).relation(relation));
        let outcome = reconcile(&current, baseline, desired);
        if !outcome.changed {
            return;
        }
        let refs = graph.resolve_all(&outcome.result);
        graph
            .entity_mut(r)
            .relations
            .insert(relation.to_string(), refs.clone());

        let roots: Vec<EntityRef> = graph.entity(r).roots.iter().copied().collect();
        for id in &outcome.added {
            if let Some(child) = graph.get(id) {
                if refs.contains(&child) {
                    graph.link_parent(r, child);
                    reachability::register_roots(graph, child, &roots);
                }
            }
        }
        let mut removed = Vec::new();
        for id in &outcome.missing {
            if let Some(child) = graph.get(id) {
                if !refs.contains(&child) {
                    graph.unlink_parent(r, child);
                    removed.push(child);
                }
            }
        }
        reachability::update_roots(graph, removed);

        graph.entity_mut(r).mark_dirty_if_released();
        level::propagate_up(graph, r, &self.config.level);
    }
}

fn as_scalar(value: Option<&PatchValue>) -> Option<Option<&Scalar>> {
    match value {
        None => Some(None),
        Some(PatchValue::Scalar(s)) => Some(Some(s)),
        Some(PatchValue::List(_)) => None,
    }
}

fn as_list(value: Option<&PatchValue>) -> Option<&[ListEntry]> {
    match value {
        None => Some(&[][..]),
        Some(PatchValue::List(list)) => Some(list),
        Some(PatchValue::Scalar(_)) => None,
    }
}

fn same(a: Option<&Scalar>, b: Option<&Scalar>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_content(b),
        _ => false,
    }
}
