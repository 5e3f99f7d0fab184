//! Root reachability (soft GC).
//!
//! Every entity records the registered roots that can reach it through
//! forward relations. Registration walks down from a root; removal is
//! handled lazily: when an edge disappears, the affected entity re-checks
//! each of its roots by searching from that root, and the check cascades
//! into children only while root sets keep shrinking. An entity left with
//! no roots is tombstoned, never freed.
//!
//! Searches are bounded by the searched root's subtree and only run on
//! structural removals, never on reads.

use crate::EntityGraph;
use refgraph_types::EntityRef;
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::debug;

/// Returns true if `target` is `from` or lies below it.
pub fn reaches(graph: &EntityGraph, from: EntityRef, target: EntityRef) -> bool {
    let mut stack = vec![from];
    let mut visited = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(graph.entity(current).children().filter(|c| !visited.contains(c)));
    }
    false
}

#[derive(Debug, Clone, Copy, Default)]
struct Recheck {
    roots_dropped: bool,
    tombstoned: bool,
}

fn recheck(graph: &mut EntityGraph, r: EntityRef) -> Recheck {
    let recorded: Vec<EntityRef> = graph.entity(r).roots.iter().copied().collect();
    let kept: BTreeSet<EntityRef> = recorded
        .iter()
        .copied()
        .filter(|&root| reaches(graph, root, r))
        .collect();

    let entity = graph.entity_mut(r);
    let roots_dropped = kept.len() != entity.roots.len();
    entity.roots = kept;

    let tombstoned = entity.roots.is_empty() && !entity.deleted && !entity.manual_tombstone;
    if tombstoned {
        entity.deleted = true;
        debug!("Tombstoned unreachable entity {}", entity.id);
    }
    Recheck {
        roots_dropped,
        tombstoned,
    }
}

/// Re-checks the roots of one entity after an edge to it was removed.
///
/// Drops every recorded root that can no longer reach the entity. If no
/// root is left and the tombstone was not set by hand, the entity is
/// tombstoned. Returns true if the entity changed.
pub fn update_root(graph: &mut EntityGraph, r: EntityRef) -> bool {
    let outcome = recheck(graph, r);
    outcome.roots_dropped || outcome.tombstoned
}

/// Re-checks `start` and, transitively, the children of every entity that
/// lost a root. Returns the entities that changed, in visiting order.
pub fn update_roots(
    graph: &mut EntityGraph,
    start: impl IntoIterator<Item = EntityRef>,
) -> Vec<EntityRef> {
    let mut queue: VecDeque<EntityRef> = start.into_iter().collect();
    let mut changed = Vec::new();
    while let Some(r) = queue.pop_front() {
        let outcome = recheck(graph, r);
        if outcome.roots_dropped {
            queue.extend(graph.entity(r).children());
        }
        if (outcome.roots_dropped || outcome.tombstoned) && !changed.contains(&r) {
            changed.push(r);
        }
    }
    changed
}

/// Adds `roots` to every entity in the stored subtree below `top`.
///
/// Idempotent. An entity that was tombstoned automatically for lack of
/// roots comes back to life when it gains one. Returns the number of
/// entities whose root set grew.
pub fn register_roots(graph: &mut EntityGraph, top: EntityRef, roots: &[EntityRef]) -> usize {
    if roots.is_empty() {
        return 0;
    }
    let mut grown = 0;
    let mut stack = vec![top];
    let mut visited = HashSet::new();
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let entity = graph.entity_mut(current);
        let was_unrooted = entity.roots.is_empty();
        let before = entity.roots.len();
        entity.roots.extend(roots.iter().copied());
        if entity.roots.len() != before {
            grown += 1;
            if was_unrooted && entity.deleted && !entity.manual_tombstone {
                entity.deleted = false;
                debug!("Revived entity {} on root registration", entity.id);
            }
        }
        stack.extend(graph.entity(current).children());
    }
    grown
}
