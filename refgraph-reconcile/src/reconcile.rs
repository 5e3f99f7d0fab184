use crate::diff::{added_entries, missing_entries, sort_by_order};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// Outcome of a three-way reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation<T> {
    /// The result differs from `current` (membership or order).
    pub changed: bool,
    /// The reconciled collection.
    pub result: Vec<T>,
    /// `baseline − desired`: what the caller removed. Reachability of these
    /// must be re-checked by the caller.
    pub missing: Vec<T>,
    /// `desired − baseline`: what the caller added.
    pub added: Vec<T>,
}

/// Applies the change `baseline → desired` on top of `current`.
///
/// `baseline` need not equal `current`; entries the caller never touched
/// are left alone, so concurrent edits to the same collection are absorbed
/// instead of rejected. Duplicates are collapsed to their first occurrence.
///
/// ```
/// use refgraph_reconcile::reconcile;
///
/// let r = reconcile(&["a", "b"], &["a", "b"], &["b", "c"]);
/// assert!(r.changed);
/// assert_eq!(r.result, vec!["b", "c"]);
/// assert_eq!(r.missing, vec!["a"]);
/// assert_eq!(r.added, vec!["c"]);
/// ```
pub fn reconcile<T: Eq + Hash + Clone>(
    current: &[T],
    baseline: &[T],
    desired: &[T],
) -> Reconciliation<T> {
    let desired = dedup(desired);
    let missing = missing_entries(baseline, &desired);
    let added = added_entries(baseline, &desired);

    let removed: HashSet<&T> = missing.iter().collect();
    let mut seen: HashSet<&T> = HashSet::new();
    let mut result: Vec<T> = current
        .iter()
        .filter(|v| !removed.contains(v) && seen.insert(*v))
        .cloned()
        .collect();

    // Someone may have added the same entry concurrently; don't double it.
    let present: HashSet<T> = result.iter().cloned().collect();
    result.extend(added.iter().filter(|v| !present.contains(*v)).cloned());

    let result = sort_by_order(&desired, result);
    let changed = result.as_slice() != current;

    Reconciliation {
        changed,
        result,
        missing,
        added,
    }
}

fn dedup<T: Eq + Hash + Clone>(values: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    values.iter().filter(|v| seen.insert(*v)).cloned().collect()
}
