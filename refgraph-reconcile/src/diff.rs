//! Set differences and order projection over slices.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Entries of `a` that are not in `b`, in `a`'s order, without duplicates.
pub fn missing_entries<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let b: HashSet<&T> = b.iter().collect();
    let mut seen = HashSet::new();
    a.iter()
        .filter(|x| !b.contains(x) && seen.insert(*x))
        .cloned()
        .collect()
}

/// Entries of `b` that are not in `a`, in `b`'s order, without duplicates.
pub fn added_entries<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    missing_entries(b, a)
}

/// Reorders the entries of `values` that appear in `order` so they follow
/// `order`, leaving every other entry in its slot.
///
/// ```
/// use refgraph_reconcile::sort_by_order;
///
/// let sorted = sort_by_order(&["c", "a"], vec!["a", "x", "c"]);
/// assert_eq!(sorted, vec!["c", "x", "a"]);
/// ```
pub fn sort_by_order<T: Eq + Hash + Clone>(order: &[T], mut values: Vec<T>) -> Vec<T> {
    let rank: HashMap<&T, usize> = order
        .iter()
        .enumerate()
        .rev()
        .map(|(i, v)| (v, i))
        .collect();

    let slots: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| rank.contains_key(v))
        .map(|(i, _)| i)
        .collect();

    let mut ranked: Vec<T> = slots.iter().map(|&i| values[i].clone()).collect();
    ranked.sort_by_key(|v| rank[v]);

    for (slot, value) in slots.into_iter().zip(ranked) {
        values[slot] = value;
    }
    values
}
