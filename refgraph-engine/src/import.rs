//! Merging nested entity trees into the graph.
//!
//! An import runs in two phases. The tree is first validated and flattened
//! without touching the graph, so a rejected import leaves no trace. The
//! mutation phase then creates new entities, merges existing ones children
//! first, relinks reverse links, recomputes level aggregates, registers
//! roots and finally re-checks reachability of every entity that lost a
//! parent.

use crate::config::{EngineConfig, LevelConfig};
use crate::error::{ImportError, ImportResult};
use crate::level;
use crate::tree::{TreeNode, TreeValue};
use refgraph_model::{Entity, PropertyKind, SchemaCatalog};
use refgraph_reconcile::reconcile;
use refgraph_storage::{EntityGraph, reachability};
use refgraph_types::{EntityId, EntityRef, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Existing entities whose stored state changed.
    pub updated: usize,
    /// Entities created by this import.
    pub created: usize,
    /// The import's top entity.
    #[serde(skip)]
    pub top: Option<EntityRef>,
}

/// One validated occurrence of an entity in the tree.
#[derive(Debug)]
struct PreparedNode {
    id: EntityId,
    entity_type: String,
    literals: Vec<(String, Scalar)>,
    relations: Vec<(String, Vec<EntityId>)>,
}

/// Flattened tree, in pre-order. A new entity appears once, from its
/// first occurrence; an existing entity appears once per occurrence.
#[derive(Debug, Default)]
struct Prepared {
    nodes: Vec<PreparedNode>,
    /// Type of each id at its first occurrence.
    types: HashMap<EntityId, String>,
}

/// Merges import trees using a schema catalog.
#[derive(Debug, Clone, Copy)]
pub struct ImportMerger<'a> {
    schema: &'a SchemaCatalog,
    config: &'a EngineConfig,
}

impl<'a> ImportMerger<'a> {
    pub fn new(schema: &'a SchemaCatalog, config: &'a EngineConfig) -> Self {
        Self { schema, config }
    }

    /// Merges `tree` into `graph` and registers `roots` over its subtree.
    ///
    /// Each root must already exist or be part of the tree.
    pub fn import_entity(
        &self,
        graph: &mut EntityGraph,
        tree: &TreeNode,
        roots: &[EntityId],
    ) -> ImportResult<ImportStats> {
        let mut prepared = Prepared::default();
        let top_id = self.prepare(graph, tree, &mut prepared)?;
        let nodes = prepared.nodes;
        let in_tree: HashSet<&EntityId> = nodes.iter().map(|n| &n.id).collect();
        if let Some(unknown) = roots
            .iter()
            .find(|id| !graph.has(id) && !in_tree.contains(id))
        {
            return Err(ImportError::UnknownRoot { id: unknown.clone() });
        }

        let created = self.append_new(graph, &nodes);
        let (updated, removed) = self.merge(graph, &nodes, &created);
        self.relink(graph, &nodes);

        let top = handle(graph, &top_id);
        level::recompute_subtree(graph, top, &self.config.level);

        let root_refs = graph.resolve_all(roots);
        reachability::register_roots(graph, top, &root_refs);
        let orphaned = reachability::update_roots(graph, removed);

        info!(
            "Imported {}: {} updated, {} new, {} orphaned",
            top_id,
            updated,
            created.len(),
            orphaned.len()
        );
        Ok(ImportStats {
            updated,
            created: created.len(),
            top: Some(top),
        })
    }

    // ── Validation ──

    fn prepare(
        &self,
        graph: &EntityGraph,
        node: &TreeNode,
        out: &mut Prepared,
    ) -> ImportResult<EntityId> {
        let Some(id) = node.resolved_id() else {
            return Err(ImportError::MissingId {
                entity_type: node.entity_type.clone().unwrap_or_default(),
            });
        };
        let Some(entity_type) = node.entity_type.clone() else {
            return Err(ImportError::MissingType { id });
        };
        if !self.schema.contains_type(&entity_type) {
            return Err(ImportError::UnknownType { id, entity_type });
        }
        if let Some(stored) = graph.find(&id) {
            if stored.entity_type != entity_type {
                return Err(ImportError::TypeConflict {
                    id,
                    stored: stored.entity_type.clone(),
                    imported: entity_type,
                });
            }
        }

        match out.types.get(&id) {
            Some(first) if *first != entity_type => {
                return Err(ImportError::TypeConflict {
                    id,
                    stored: first.clone(),
                    imported: entity_type,
                });
            }
            Some(_) if !graph.has(&id) => {
                debug!("Ignoring repeated occurrence of new entity {}", id);
                return Ok(id);
            }
            Some(_) => {}
            None => {
                out.types.insert(id.clone(), entity_type.clone());
            }
        }

        let slot = out.nodes.len();
        out.nodes.push(PreparedNode {
            id: id.clone(),
            entity_type: entity_type.clone(),
            literals: Vec::new(),
            relations: Vec::new(),
        });

        let mut literals = Vec::new();
        let mut relations = Vec::new();
        for (name, value) in &node.fields {
            if name == "uuid" {
                continue;
            }
            if let Some(ids) = self.level_labels(graph, &id, &entity_type, name, value)? {
                relations.push((self.config.level.relation.clone(), ids));
                continue;
            }
            match self.schema.classify(&entity_type, name) {
                None => {
                    return Err(ImportError::UnknownProperty {
                        id,
                        entity_type,
                        property: name.clone(),
                    });
                }
                Some(PropertyKind::Transient) => {}
                Some(PropertyKind::Literal) => match value {
                    TreeValue::Scalar(s) => {
                        if name != "id" {
                            literals.push((name.clone(), s.clone()));
                        }
                    }
                    _ => {
                        return Err(ImportError::ExpectedScalar {
                            id,
                            entity_type,
                            property: name.clone(),
                        });
                    }
                },
                Some(PropertyKind::Relation) => {
                    let single = self
                        .schema
                        .relation(&entity_type, name)
                        .is_some_and(|r| r.single);
                    let children: Vec<&TreeNode> = match value {
                        TreeValue::Nodes(list) if single && list.len() > 1 => {
                            return Err(ImportError::ExpectedSingle {
                                id,
                                entity_type,
                                property: name.clone(),
                            });
                        }
                        TreeValue::Nodes(list) => list.iter().collect(),
                        TreeValue::Node(child) if single => vec![child.as_ref()],
                        _ => {
                            return Err(ImportError::ExpectedList {
                                id,
                                entity_type,
                                property: name.clone(),
                            });
                        }
                    };
                    let mut ids = Vec::with_capacity(children.len());
                    for child in children {
                        ids.push(self.prepare(graph, child, out)?);
                    }
                    relations.push((name.clone(), ids));
                }
            }
        }

        out.nodes[slot].literals = literals;
        out.nodes[slot].relations = relations;
        Ok(id)
    }

    /// Resolves the level label pseudo-property to level entity ids.
    ///
    /// Returns `None` when `name` is not the label property of a type that
    /// links levels.
    fn level_labels(
        &self,
        graph: &EntityGraph,
        id: &EntityId,
        entity_type: &str,
        name: &str,
        value: &TreeValue,
    ) -> ImportResult<Option<Vec<EntityId>>> {
        let level = &self.config.level;
        if name != level.label_property
            || self.schema.classify(entity_type, &level.relation) != Some(PropertyKind::Relation)
        {
            return Ok(None);
        }
        let labels: Vec<&str> = match value {
            TreeValue::Labels(labels) => labels.iter().map(String::as_str).collect(),
            TreeValue::Nodes(list) if list.is_empty() => Vec::new(),
            TreeValue::Scalar(Scalar::String(s)) => vec![s.as_str()],
            _ => {
                return Err(ImportError::ExpectedList {
                    id: id.clone(),
                    entity_type: entity_type.to_string(),
                    property: name.to_string(),
                });
            }
        };
        Ok(Some(resolve_labels(graph, &self.config.level, &labels)))
    }

    // ── Mutation ──

    /// Creates every entity that is new to the graph. Returns the ids of
    /// the created entities.
    fn append_new(&self, graph: &mut EntityGraph, nodes: &[PreparedNode]) -> HashSet<EntityId> {
        let mut created = HashSet::new();
        for node in nodes {
            if graph.has(&node.id) {
                continue;
            }
            let mut entity = Entity::new(node.id.clone(), node.entity_type.clone());
            entity.unreleased = true;
            for (name, value) in &node.literals {
                if value.sentinel().is_none() {
                    entity.properties.insert(name.clone(), value.clone());
                }
            }
            match graph.insert(entity) {
                Ok(_) => {
                    created.insert(node.id.clone());
                }
                Err(e) => panic!("invariant violation: {e}"),
            }
        }
        created
    }

    /// Merges occurrences children first. New entities take the relations
    /// of their single prepared occurrence. Returns the number of updated
    /// entities and every entity that lost a parent.
    fn merge(
        &self,
        graph: &mut EntityGraph,
        nodes: &[PreparedNode],
        created: &HashSet<EntityId>,
    ) -> (usize, Vec<EntityRef>) {
        let mut updated: BTreeSet<EntityRef> = BTreeSet::new();
        let mut removed = Vec::new();
        for node in nodes.iter().rev() {
            let r = handle(graph, &node.id);
            if created.contains(&node.id) {
                for (name, ids) in &node.relations {
                    let refs = dedup(graph.resolve_all(ids));
                    graph.entity_mut(r).relations.insert(name.clone(), refs);
                }
                continue;
            }

            let mut changed = false;
            for (name, value) in &node.literals {
                changed |= graph.entity_mut(r).merge_literal(name, value);
            }
            for (name, ids) in &node.relations {
                let current = graph.ids_of(graph.entity(r).relation(name));
                let outcome = reconcile(&current, &current, ids);
                if outcome.changed {
                    let refs = graph.resolve_all(&outcome.result);
                    graph.entity_mut(r).relations.insert(name.clone(), refs);
                    changed = true;
                }
                for gone in &outcome.missing {
                    if let Some(child) = graph.get(gone) {
                        graph.unlink_parent(r, child);
                        removed.push(child);
                    }
                }
            }
            if changed {
                debug!("Merged changes into {}", node.id);
                graph.entity_mut(r).mark_dirty();
                updated.insert(r);
            }
        }
        (updated.len(), removed)
    }

    /// Records every touched entity as parent of its stored children.
    fn relink(&self, graph: &mut EntityGraph, nodes: &[PreparedNode]) {
        let mut done = HashSet::new();
        for node in nodes {
            if !done.insert(&node.id) {
                continue;
            }
            let parent = handle(graph, &node.id);
            let children: Vec<EntityRef> = graph.entity(parent).children().collect();
            for child in children {
                graph.link_parent(parent, child);
            }
        }
    }
}

/// Matches level labels against the `label_field` of live level entities.
/// Unmatched labels are logged and skipped.
pub(crate) fn resolve_labels(
    graph: &EntityGraph,
    level: &LevelConfig,
    labels: &[&str],
) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = Vec::new();
    for label in labels {
        let matches: Vec<&EntityId> = graph
            .bucket(&level.entity_type)
            .iter()
            .map(|&r| graph.entity(r))
            .filter(|e| e.is_live() && e.get_str(&level.label_field) == Some(label))
            .map(|e| &e.id)
            .collect();
        if matches.is_empty() {
            warn!("No {} labelled {:?}", level.entity_type, label);
        }
        for id in matches {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

fn handle(graph: &EntityGraph, id: &EntityId) -> EntityRef {
    match graph.get(id) {
        Some(r) => r,
        None => panic!("invariant violation: {id} vanished during import"),
    }
}

fn dedup(refs: Vec<EntityRef>) -> Vec<EntityRef> {
    let mut seen = HashSet::new();
    refs.into_iter().filter(|r| seen.insert(*r)).collect()
}
