//! Entity model for refgraph.
//!
//! Defines the types every layer above the arena agrees on:
//! - [`Entity`]: one node of the graph (literals, relations, reverse links, roots, flags)
//! - [`SchemaCatalog`]: per-type literal names, relation names and root flags
//! - [`PropertyKind`]: how a property name is treated by merge and patch
//! - [`FieldVisibility`]: which entity fields show up in default views
//!
//! The catalog is loaded once and consulted explicitly; nothing here probes
//! property names for meaning at runtime.

mod entity;
mod schema;

pub use entity::{Entity, FieldVisibility, TRANSIENT_PROPERTIES};
pub use schema::{PropertyKind, RelationSchema, SchemaCatalog, TypeSchema};
