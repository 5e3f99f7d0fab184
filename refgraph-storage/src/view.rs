//! JSON views of stored entities.

use crate::EntityGraph;
use refgraph_model::{Entity, FieldVisibility};
use refgraph_types::EntityRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Which internal fields to render alongside the default view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    pub include_parents: bool,
    pub include_roots: bool,
}

impl ViewOptions {
    /// Renders every field, internal ones included.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            include_parents: true,
            include_roots: true,
        }
    }

    fn wants(&self, field: &str) -> bool {
        match Entity::field_visibility(field) {
            FieldVisibility::Visible => true,
            FieldVisibility::Internal => match field {
                "parents" => self.include_parents,
                "roots" => self.include_roots,
                _ => false,
            },
        }
    }
}

impl EntityGraph {
    /// Renders an entity with references replaced by ids.
    ///
    /// Flags are only rendered when set. Reverse links and roots are
    /// internal and only appear when `options` asks for them.
    pub fn view(&self, r: EntityRef, options: ViewOptions) -> Value {
        let entity = self.entity(r);
        let mut out = Map::new();
        out.insert("id".into(), json!(entity.id));
        out.insert("@type".into(), json!(entity.entity_type));

        for (name, value) in &entity.properties {
            if name != "id" {
                out.insert(name.clone(), json!(value));
            }
        }
        for (name, children) in &entity.relations {
            out.insert(name.clone(), json!(self.ids_of(children)));
        }
        if !entity.level_index.is_empty() {
            out.insert("levelIndex".into(), json!(self.ids_of(&entity.level_index)));
        }
        for (flag, set) in [
            ("unreleased", entity.unreleased),
            ("dirty", entity.dirty),
            ("deleted", entity.deleted),
        ] {
            if set {
                out.insert(flag.into(), Value::Bool(true));
            }
        }

        if options.wants("parents") {
            let parents: Map<String, Value> = entity
                .parents
                .iter()
                .map(|(ty, set)| {
                    let refs: Vec<EntityRef> = set.iter().copied().collect();
                    (ty.clone(), json!(self.ids_of(&refs)))
                })
                .collect();
            out.insert("parents".into(), Value::Object(parents));
        }
        if options.wants("roots") {
            let roots: Vec<EntityRef> = entity.roots.iter().copied().collect();
            out.insert("roots".into(), json!(self.ids_of(&roots)));
        }

        Value::Object(out)
    }

    /// Renders every entity of the graph, grouped by type.
    pub fn view_all(&self, options: ViewOptions) -> Value {
        let mut out = Map::new();
        for ty in self.types() {
            let views: Vec<Value> = self
                .bucket(ty)
                .iter()
                .map(|&r| self.view(r, options))
                .collect();
            out.insert(ty.to_string(), Value::Array(views));
        }
        Value::Object(out)
    }
}
