use pretty_assertions::assert_eq;
use refgraph_engine::{EngineConfig, LevelIndexMode};

#[test]
fn defaults_describe_level_hierarchy() {
    let config = EngineConfig::default();
    assert_eq!(config.id_prefix, None);
    assert_eq!(config.level.relation, "Niveau");
    assert_eq!(config.level.entity_type, "Niveau");
    assert_eq!(config.level.excluded_relation.as_deref(), Some("Vakleergebied"));
    assert_eq!(config.level.label_property, "niveaus");
    assert_eq!(config.level.label_field, "title");
    assert_eq!(config.level.mode, LevelIndexMode::Append);
}

#[test]
fn partial_json_keeps_defaults() {
    let config = EngineConfig::from_json(
        r#"{ "id_prefix": "https://example.org/uuid/", "level": { "mode": "replace" } }"#,
    )
    .unwrap();
    assert_eq!(config.id_prefix.as_deref(), Some("https://example.org/uuid/"));
    assert_eq!(config.level.mode, LevelIndexMode::Replace);
    assert_eq!(config.level.relation, "Niveau");
}

#[test]
fn excluded_relation_can_be_disabled() {
    let config = EngineConfig::from_json(r#"{ "level": { "excluded_relation": null } }"#).unwrap();
    assert_eq!(config.level.excluded_relation, None);
}

#[test]
fn empty_object_is_default() {
    assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
}
