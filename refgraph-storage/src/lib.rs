//! In-memory storage layer for refgraph.
//!
//! Holds every entity of a data set in one arena, bucketed by type and
//! indexed by id. Entities are never freed: unreachable ones are tombstoned
//! and kept for history, so an [`EntityRef`](refgraph_types::EntityRef)
//! handed out by a graph stays valid for the graph's lifetime.
//!
//! # Concurrency
//!
//! A graph has a single writer. Nothing here locks; the host serializes
//! imports and patches against one graph and runs read-heavy queries on
//! separate snapshots.
//!
//! # Reachability
//!
//! [`reachability`] keeps `Entity::roots` honest after structural removals
//! and tombstones entities that no registered root can reach any more.

mod error;
mod graph;
pub mod reachability;
mod view;

pub use error::{StorageError, StorageResult};
pub use graph::EntityGraph;
pub use view::ViewOptions;
