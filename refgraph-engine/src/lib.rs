//! Import and patch engine for refgraph.
//!
//! [`ImportMerger`] folds nested entity trees into an
//! [`EntityGraph`](refgraph_storage::EntityGraph); [`PatchEngine`] applies
//! commands, i.e. ordered lists of imports, inserts, tombstone toggles and
//! guarded property updates. Both keep reverse links, roots and level
//! aggregates consistent with the forward relations they change.
//!
//! # Example
//!
//! ```
//! use refgraph_engine::{Change, Command, EngineConfig, PatchEngine, TreeNode};
//! use refgraph_model::{SchemaCatalog, TypeSchema};
//! use refgraph_storage::EntityGraph;
//!
//! let schema = SchemaCatalog::new()
//!     .with_type("Doc", TypeSchema::new().literal("title").relation("Section").root())
//!     .with_type("Section", TypeSchema::new().literal("title"));
//! let engine = PatchEngine::new(schema, EngineConfig::default());
//! let mut graph = EntityGraph::new();
//!
//! let tree = TreeNode::new("Doc", "d1")
//!     .with("title", "Handbook")
//!     .with_children("Section", vec![TreeNode::new("Section", "s1")]);
//! let command = Command::new("c1", vec![Change::Import { entity: tree, roots: vec![] }]);
//!
//! assert_eq!(engine.apply(&mut graph, &command).unwrap(), 1);
//! assert_eq!(graph.len(), 2);
//! ```

mod command;
mod config;
mod error;
mod import;
mod level;
mod patch;
mod tree;

pub use command::{Change, Command, ListEntry, PatchValue};
pub use config::{EngineConfig, LevelConfig, LevelIndexMode};
pub use error::{ErrorPayload, ImportError, ImportResult, PatchError, PatchResult, Shape};
pub use import::{ImportMerger, ImportStats};
pub use patch::PatchEngine;
pub use tree::{TreeNode, TreeValue};
