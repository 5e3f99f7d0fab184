//! Nested entity trees, the wire form of imports.

use refgraph_types::{EntityId, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entity of an import tree.
///
/// Literals are scalars, relations are arrays of nested nodes (or a single
/// node for single-child relations). The level label pseudo-property holds
/// an array of strings. Everything else is rejected during validation, not
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, TreeValue>,
}

/// A field value in an import tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeValue {
    Scalar(Scalar),
    Nodes(Vec<TreeNode>),
    Labels(Vec<String>),
    Node(Box<TreeNode>),
}

impl TreeNode {
    pub fn new(entity_type: &str, id: &str) -> Self {
        Self {
            id: Some(EntityId::new(id)),
            entity_type: Some(entity_type.to_string()),
            fields: BTreeMap::new(),
        }
    }

    /// A node whose id will be generated on insert.
    pub fn anonymous(entity_type: &str) -> Self {
        Self {
            id: None,
            entity_type: Some(entity_type.to_string()),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.fields
            .insert(name.to_string(), TreeValue::Scalar(value.into()));
        self
    }

    #[must_use]
    pub fn with_children(mut self, relation: &str, children: Vec<TreeNode>) -> Self {
        self.fields
            .insert(relation.to_string(), TreeValue::Nodes(children));
        self
    }

    #[must_use]
    pub fn with_child(mut self, relation: &str, child: TreeNode) -> Self {
        self.fields
            .insert(relation.to_string(), TreeValue::Node(Box::new(child)));
        self
    }

    #[must_use]
    pub fn with_labels(mut self, property: &str, labels: &[&str]) -> Self {
        let labels = labels.iter().map(|l| (*l).to_string()).collect();
        self.fields
            .insert(property.to_string(), TreeValue::Labels(labels));
        self
    }

    /// The node's id, taken from `id` or, failing that, a string `uuid` field.
    ///
    /// An id that is blank once the `/uuid/` prefix is stripped counts as absent.
    pub fn resolved_id(&self) -> Option<EntityId> {
        let from_id = self.id.as_ref().map(|id| EntityId::new(id.as_str().trim()));
        let from_uuid = match self.fields.get("uuid") {
            Some(TreeValue::Scalar(Scalar::String(s))) => Some(EntityId::new(s.trim())),
            _ => None,
        };
        from_id
            .into_iter()
            .chain(from_uuid)
            .find(|id| !id.is_empty())
    }
}
