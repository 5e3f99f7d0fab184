//! Three-way reconciliation of ordered collections.
//!
//! Child relations are edited by clients that saw the collection at some
//! earlier point (the *baseline*) and now want it to look like *desired*.
//! Meanwhile the stored collection (*current*) may have moved on. The
//! reconciler applies only what the client actually changed:
//!
//! - entries in baseline but not in desired are removed from current
//! - entries in desired but not in baseline are inserted where desired puts them
//! - entries the client kept are reordered to follow desired
//! - entries someone else added concurrently stay where they are
//!
//! The algorithm is pure and generic over the element type; resolving the
//! resulting ids to stored entities is the caller's job.

mod diff;
mod reconcile;

pub use diff::{added_entries, missing_entries, sort_by_order};
pub use reconcile::{Reconciliation, reconcile};
