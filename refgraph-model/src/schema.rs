use crate::entity::TRANSIENT_PROPERTIES;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a property name is treated when merging or patching an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// Stored as a scalar in `Entity::properties`.
    Literal,
    /// Ordered child collection in `Entity::relations`.
    Relation,
    /// Accepted on input, never stored (`deleted`, `dirty`, `@…`, `$…`).
    Transient,
}

/// Describes one child relation of a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationSchema {
    /// Targets of this relation are root entities in their own right.
    ///
    /// Catalog metadata for views and exports. Reachability anchors on
    /// [`TypeSchema::root`] alone, so the engine never reads this flag.
    #[serde(rename = "isRoot")]
    pub is_root: bool,
    /// The relation holds at most one child.
    pub single: bool,
}

/// Catalogs written by hand often say `"Child": true`; both that and a
/// full relation object are accepted.
fn deserialize_children<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, RelationSchema>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, spec)| {
            let schema = match spec {
                serde_json::Value::Bool(_) => RelationSchema::default(),
                other => RelationSchema::deserialize(other).map_err(D::Error::custom)?,
            };
            Ok((name, schema))
        })
        .collect()
}

/// Literal names, given either as a list or as a `{name: …}` map.
#[derive(Deserialize)]
#[serde(untagged)]
enum PropertySpec {
    List(Vec<String>),
    Map(BTreeMap<String, serde_json::Value>),
}

fn deserialize_properties<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match PropertySpec::deserialize(deserializer)? {
        PropertySpec::List(names) => names.into_iter().collect(),
        PropertySpec::Map(map) => map.into_keys().collect(),
    })
}

/// Schema of one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Literal property names.
    #[serde(default, deserialize_with = "deserialize_properties")]
    pub properties: BTreeSet<String>,
    /// Child relations by name.
    #[serde(default, deserialize_with = "deserialize_children")]
    pub children: BTreeMap<String, RelationSchema>,
    /// Entities of this type anchor reachability for their subtree.
    #[serde(default)]
    pub root: bool,
}

impl TypeSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for adding a literal property.
    #[must_use]
    pub fn literal(mut self, name: &str) -> Self {
        self.properties.insert(name.to_string());
        self
    }

    /// Shorthand for adding a multi-valued child relation.
    #[must_use]
    pub fn relation(mut self, name: &str) -> Self {
        self.children.insert(name.to_string(), RelationSchema::default());
        self
    }

    /// Shorthand for adding a single-valued child relation.
    #[must_use]
    pub fn single_relation(mut self, name: &str) -> Self {
        self.children.insert(
            name.to_string(),
            RelationSchema {
                single: true,
                ..RelationSchema::default()
            },
        );
        self
    }

    /// Marks the type as a root type.
    #[must_use]
    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }
}

/// Per-type schema definitions for the whole data set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub types: BTreeMap<String, TypeSchema>,
}

impl SchemaCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog from its JSON form: `{"types": {"Type": {...}}}`.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Adds or replaces a type definition.
    #[must_use]
    pub fn with_type(mut self, name: &str, schema: TypeSchema) -> Self {
        self.types.insert(name.to_string(), schema);
        self
    }

    pub fn get(&self, entity_type: &str) -> Option<&TypeSchema> {
        self.types.get(entity_type)
    }

    #[must_use]
    pub fn contains_type(&self, entity_type: &str) -> bool {
        self.types.contains_key(entity_type)
    }

    #[must_use]
    pub fn is_root_type(&self, entity_type: &str) -> bool {
        self.get(entity_type).is_some_and(|t| t.root)
    }

    pub fn relation(&self, entity_type: &str, name: &str) -> Option<&RelationSchema> {
        self.get(entity_type)?.children.get(name)
    }

    /// Classifies a property name for an entity type.
    ///
    /// Returns `None` for unknown types and for names the type does not
    /// declare. `id` is a literal of every type.
    pub fn classify(&self, entity_type: &str, name: &str) -> Option<PropertyKind> {
        let schema = self.get(entity_type)?;
        if name.starts_with('@') || name.starts_with('$') || TRANSIENT_PROPERTIES.contains(&name) {
            Some(PropertyKind::Transient)
        } else if name == "id" || schema.properties.contains(name) {
            Some(PropertyKind::Literal)
        } else if schema.children.contains_key(name) {
            Some(PropertyKind::Relation)
        } else {
            None
        }
    }

    /// Names of all root types.
    pub fn root_types(&self) -> impl Iterator<Item = &str> {
        self.types
            .iter()
            .filter(|(_, t)| t.root)
            .map(|(name, _)| name.as_str())
    }
}
