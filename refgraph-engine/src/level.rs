//! Level aggregation.
//!
//! Every entity carries the levels found anywhere below it plus its own
//! direct level links. The excluded relation is not part of the hierarchy
//! and is never followed.

use crate::config::{LevelConfig, LevelIndexMode};
use refgraph_storage::EntityGraph;
use refgraph_types::EntityRef;
use std::collections::{HashMap, HashSet, VecDeque};

fn push_unique(into: &mut Vec<EntityRef>, values: impl IntoIterator<Item = EntityRef>) {
    for v in values {
        if !into.contains(&v) {
            into.push(v);
        }
    }
}

fn store(graph: &mut EntityGraph, r: EntityRef, aggregate: Vec<EntityRef>, mode: LevelIndexMode) {
    let entity = graph.entity_mut(r);
    match mode {
        LevelIndexMode::Replace => entity.level_index = aggregate,
        LevelIndexMode::Append => push_unique(&mut entity.level_index, aggregate),
    }
}

/// Children that count towards the level aggregate.
fn hierarchy_children(graph: &EntityGraph, r: EntityRef, config: &LevelConfig) -> Vec<EntityRef> {
    graph
        .entity(r)
        .relations
        .iter()
        .filter(|(name, _)| config.excluded_relation.as_deref() != Some(name.as_str()))
        .flat_map(|(_, children)| children.iter().copied())
        .collect()
}

/// Recomputes the aggregate of `top` and everything below it.
pub fn recompute_subtree(graph: &mut EntityGraph, top: EntityRef, config: &LevelConfig) {
    let mut memo = HashMap::new();
    let mut in_progress = HashSet::new();
    visit(graph, top, config, &mut memo, &mut in_progress);
}

fn visit(
    graph: &mut EntityGraph,
    r: EntityRef,
    config: &LevelConfig,
    memo: &mut HashMap<EntityRef, Vec<EntityRef>>,
    in_progress: &mut HashSet<EntityRef>,
) -> Vec<EntityRef> {
    if let Some(done) = memo.get(&r) {
        return done.clone();
    }
    if !in_progress.insert(r) {
        // cycle
        return Vec::new();
    }
    let mut aggregate = Vec::new();
    for child in hierarchy_children(graph, r, config) {
        let below = visit(graph, child, config, memo, in_progress);
        push_unique(&mut aggregate, below);
    }
    push_unique(
        &mut aggregate,
        graph.entity(r).relation(&config.relation).to_vec(),
    );
    store(graph, r, aggregate.clone(), config.mode);
    memo.insert(r, aggregate.clone());
    aggregate
}

/// Recomputes `from`'s subtree, then refreshes every ancestor from its
/// direct children's stored aggregates.
pub fn propagate_up(graph: &mut EntityGraph, from: EntityRef, config: &LevelConfig) {
    recompute_subtree(graph, from, config);

    let mut queue: VecDeque<EntityRef> = parents_of(graph, from).into();
    let mut seen: HashSet<EntityRef> = HashSet::from([from]);
    while let Some(r) = queue.pop_front() {
        if !seen.insert(r) {
            continue;
        }
        let mut aggregate = Vec::new();
        for child in hierarchy_children(graph, r, config) {
            push_unique(&mut aggregate, graph.entity(child).level_index.clone());
        }
        push_unique(
            &mut aggregate,
            graph.entity(r).relation(&config.relation).to_vec(),
        );
        store(graph, r, aggregate, config.mode);
        queue.extend(parents_of(graph, r));
    }
}

fn parents_of(graph: &EntityGraph, r: EntityRef) -> Vec<EntityRef> {
    graph
        .entity(r)
        .parents
        .values()
        .flatten()
        .copied()
        .collect()
}
