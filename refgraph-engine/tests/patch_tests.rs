//! Tests for PatchEngine: commands, guarded updates and error reporting.

use pretty_assertions::assert_eq;
use refgraph_engine::{
    Change, Command, EngineConfig, ImportError, ListEntry, PatchEngine, PatchError, PatchValue,
    Shape, TreeNode,
};
use refgraph_model::{SchemaCatalog, TypeSchema};
use refgraph_storage::EntityGraph;
use refgraph_types::{EntityId, EntityRef, Scalar};
use serde_json::json;

fn schema() -> SchemaCatalog {
    SchemaCatalog::new()
        .with_type(
            "RootType",
            TypeSchema::new()
                .literal("title")
                .literal("description")
                .relation("ChildType")
                .root(),
        )
        .with_type(
            "ChildType",
            TypeSchema::new()
                .literal("title")
                .relation("ChildType")
                .relation("Niveau")
                .single_relation("Primary"),
        )
        .with_type("Niveau", TypeSchema::new().literal("title"))
}

fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

fn handle(graph: &EntityGraph, s: &str) -> EntityRef {
    graph.get(&id(s)).expect("entity should exist")
}

/// R1 with children C1 and C2, released and clean.
fn setup(config: EngineConfig) -> (PatchEngine, EntityGraph) {
    let engine = PatchEngine::new(schema(), config);
    let mut graph = EntityGraph::new();
    let tree = TreeNode::new("RootType", "R1")
        .with("title", "A")
        .with_children(
            "ChildType",
            vec![
                TreeNode::new("ChildType", "C1").with("title", "one"),
                TreeNode::new("ChildType", "C2").with("title", "two"),
            ],
        );
    engine.import_entity(&mut graph, &tree, &[id("R1")]).unwrap();
    release(&mut graph);
    (engine, graph)
}

fn release(graph: &mut EntityGraph) {
    let all: Vec<EntityRef> = graph.iter().map(|(r, _)| r).collect();
    for r in all {
        let entity = graph.entity_mut(r);
        entity.unreleased = false;
        entity.dirty = false;
    }
}

fn update(
    entity: &str,
    property: &str,
    prev: Option<PatchValue>,
    new: Option<PatchValue>,
) -> Change {
    Change::Update {
        id: id(entity),
        property: property.to_string(),
        prev_value: prev,
        new_value: new,
    }
}

fn run(
    engine: &PatchEngine,
    graph: &mut EntityGraph,
    changes: Vec<Change>,
) -> Result<usize, PatchError> {
    engine.apply(graph, &Command::new("cmd", changes))
}

fn children(graph: &EntityGraph, parent: &str) -> Vec<EntityId> {
    graph.ids_of(graph.entity(handle(graph, parent)).relation("ChildType"))
}

// ── Literal updates ─────────────────────────────────────────────

#[test]
fn literal_update_applies_and_marks_dirty() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let updated = run(
        &engine,
        &mut graph,
        vec![update("R1", "title", Some("A".into()), Some("B".into()))],
    )
    .unwrap();

    let r1 = graph.entity(handle(&graph, "R1"));
    assert_eq!(updated, 1);
    assert_eq!(r1.get_str("title"), Some("B"));
    assert!(r1.dirty);
}

#[test]
fn literal_update_on_unreleased_entity_stays_clean() {
    let (engine, mut graph) = setup(EngineConfig::default());
    graph.entity_mut(handle(&graph, "R1")).unreleased = true;
    run(
        &engine,
        &mut graph,
        vec![update("R1", "title", Some("A".into()), Some("B".into()))],
    )
    .unwrap();

    let r1 = graph.entity(handle(&graph, "R1"));
    assert_eq!(r1.get_str("title"), Some("B"));
    assert!(!r1.dirty);
}

#[test]
fn update_to_current_value_is_a_noop_even_with_stale_baseline() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let updated = run(
        &engine,
        &mut graph,
        vec![update("R1", "title", Some("X".into()), Some("A".into()))],
    )
    .unwrap();

    assert_eq!(updated, 1);
    assert!(!graph.entity(handle(&graph, "R1")).dirty);
}

#[test]
fn conflicting_update_reports_current_value() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![update("R1", "title", Some("X".into()), Some("B".into()))],
    )
    .unwrap_err();

    assert_eq!(err.code(), 409);
    let payload = err.payload();
    assert_eq!(payload.code, 409);
    assert_eq!(payload.details["value"], json!("A"));
    assert_eq!(payload.details["expected"], json!("X"));
    assert_eq!(graph.entity(handle(&graph, "R1")).get_str("title"), Some("A"));
}

#[test]
fn conflict_does_not_stop_later_changes() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![
            update("R1", "title", Some("X".into()), Some("B".into())),
            update("R1", "description", None, Some("added".into())),
        ],
    )
    .unwrap_err();

    assert!(matches!(err, PatchError::Conflict { .. }));
    let r1 = graph.entity(handle(&graph, "R1"));
    assert_eq!(r1.get_str("title"), Some("A"));
    assert_eq!(r1.get_str("description"), Some("added"));
}

#[test]
fn several_failures_are_aggregated() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![
            update("R1", "title", Some("X".into()), Some("B".into())),
            update("R404", "title", None, Some("B".into())),
        ],
    )
    .unwrap_err();

    assert_eq!(err.code(), 400);
    let PatchError::Aggregate(errors) = &err else {
        panic!("expected aggregate, got {err:?}");
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(err.payload().details[1]["code"], json!(404));
    assert_eq!(err.to_string(), "2 errors found");
}

#[test]
fn absent_new_value_removes_property() {
    let (engine, mut graph) = setup(EngineConfig::default());
    run(&engine, &mut graph, vec![update("R1", "title", Some("A".into()), None)]).unwrap();
    assert!(!graph.entity(handle(&graph, "R1")).properties.contains_key("title"));
}

#[test]
fn sentinel_values_keep_and_remove() {
    let (engine, mut graph) = setup(EngineConfig::default());
    run(
        &engine,
        &mut graph,
        vec![update("R1", "title", Some("X".into()), Some("".into()))],
    )
    .unwrap();
    assert_eq!(graph.entity(handle(&graph, "R1")).get_str("title"), Some("A"));

    run(
        &engine,
        &mut graph,
        vec![update("R1", "title", Some("A".into()), Some("-".into()))],
    )
    .unwrap();
    assert!(!graph.entity(handle(&graph, "R1")).properties.contains_key("title"));
}

#[test]
fn prefixed_ids_are_stripped() {
    let config = EngineConfig {
        id_prefix: Some("https://example.org/".into()),
        ..EngineConfig::default()
    };
    let (engine, mut graph) = setup(config);
    run(
        &engine,
        &mut graph,
        vec![update("https://example.org/R1", "title", Some("A".into()), Some("B".into()))],
    )
    .unwrap();
    assert_eq!(graph.entity(handle(&graph, "R1")).get_str("title"), Some("B"));
}

// ── Validation errors ───────────────────────────────────────────

#[test]
fn unknown_entity_is_not_found() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![update("R404", "title", None, Some("B".into()))],
    )
    .unwrap_err();
    assert_eq!(err.code(), 404);
    assert_eq!(err.payload().details["id"], json!("R404"));
}

#[test]
fn shape_mismatches_are_rejected() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![update("R1", "title", None, Some(PatchValue::ids(["C1"])))],
    )
    .unwrap_err();
    assert!(matches!(err, PatchError::TypeMismatch { expected: Shape::Literal, .. }));
    assert_eq!(err.code(), 406);

    let err = run(
        &engine,
        &mut graph,
        vec![update("R1", "ChildType", None, Some("C1".into()))],
    )
    .unwrap_err();
    assert!(matches!(err, PatchError::TypeMismatch { expected: Shape::List, .. }));
}

#[test]
fn unknown_and_transient_properties_are_rejected() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![update("R1", "colour", None, Some("red".into()))],
    )
    .unwrap_err();
    assert!(matches!(err, PatchError::Validation(ImportError::UnknownProperty { .. })));
    assert_eq!(err.code(), 400);

    for property in ["dirty", "id"] {
        let err = run(
            &engine,
            &mut graph,
            vec![update("R1", property, None, Some("x".into()))],
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::ReadOnly { .. }), "{property}: {err:?}");
    }
}

// ── Relation updates ────────────────────────────────────────────

#[test]
fn removing_child_tombstones_it() {
    let (engine, mut graph) = setup(EngineConfig::default());
    run(
        &engine,
        &mut graph,
        vec![update(
            "R1",
            "ChildType",
            Some(PatchValue::ids(["C1", "C2"])),
            Some(PatchValue::ids(["C2"])),
        )],
    )
    .unwrap();

    assert_eq!(children(&graph, "R1"), vec![id("C2")]);
    let c1 = graph.entity(handle(&graph, "C1"));
    assert!(c1.deleted);
    assert!(c1.parents.is_empty());
    assert!(graph.entity(handle(&graph, "R1")).dirty);
}

#[test]
fn concurrent_additions_survive_reorder() {
    let (engine, mut graph) = setup(EngineConfig::default());
    engine
        .import_entity(
            &mut graph,
            &TreeNode::new("RootType", "R1").with_children(
                "ChildType",
                vec![
                    TreeNode::new("ChildType", "C1"),
                    TreeNode::new("ChildType", "C2"),
                    TreeNode::new("ChildType", "C3"),
                ],
            ),
            &[id("R1")],
        )
        .unwrap();

    run(
        &engine,
        &mut graph,
        vec![update(
            "R1",
            "ChildType",
            Some(PatchValue::ids(["C1", "C2"])),
            Some(PatchValue::ids(["C2", "C1"])),
        )],
    )
    .unwrap();

    assert_eq!(children(&graph, "R1"), vec![id("C2"), id("C1"), id("C3")]);
}

#[test]
fn inline_entity_in_list_is_created_under_target_roots() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let new = PatchValue::List(vec![
        ListEntry::Id("C1".into()),
        ListEntry::Id("C2".into()),
        ListEntry::Entity(TreeNode::new("ChildType", "C9").with("title", "nine")),
    ]);
    run(
        &engine,
        &mut graph,
        vec![update("R1", "ChildType", Some(PatchValue::ids(["C1", "C2"])), Some(new))],
    )
    .unwrap();

    let r1 = handle(&graph, "R1");
    assert_eq!(children(&graph, "R1"), vec![id("C1"), id("C2"), id("C9")]);
    let c9 = graph.entity(handle(&graph, "C9"));
    assert!(c9.unreleased);
    assert!(c9.roots.contains(&r1));
    assert!(c9.has_parent(r1));
}

#[test]
fn unknown_list_entry_changes_nothing() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![update(
            "R1",
            "ChildType",
            Some(PatchValue::ids(["C1", "C2"])),
            Some(PatchValue::ids(["C1", "C404"])),
        )],
    )
    .unwrap_err();

    assert_eq!(err.code(), 404);
    assert_eq!(children(&graph, "R1"), vec![id("C1"), id("C2")]);
    assert!(!graph.entity(handle(&graph, "C2")).deleted);
}

#[test]
fn relinking_child_elsewhere_keeps_it_alive() {
    let (engine, mut graph) = setup(EngineConfig::default());
    run(
        &engine,
        &mut graph,
        vec![
            update("C1", "ChildType", None, Some(PatchValue::ids(["C2"]))),
            update(
                "R1",
                "ChildType",
                Some(PatchValue::ids(["C1", "C2"])),
                Some(PatchValue::ids(["C1"])),
            ),
        ],
    )
    .unwrap();

    let c2 = graph.entity(handle(&graph, "C2"));
    assert!(!c2.deleted);
    assert!(c2.has_parent(handle(&graph, "C1")));
    assert!(!c2.has_parent(handle(&graph, "R1")));
}

// ── Insert, delete, import ──────────────────────────────────────

#[test]
fn insert_generates_id_and_inherits_roots() {
    let (engine, mut graph) = setup(EngineConfig::default());
    run(
        &engine,
        &mut graph,
        vec![Change::Insert {
            parent_id: id("R1"),
            relation: "ChildType".into(),
            entity: TreeNode::anonymous("ChildType").with("title", "new"),
        }],
    )
    .unwrap();

    let r1 = handle(&graph, "R1");
    let ids = children(&graph, "R1");
    assert_eq!(ids.len(), 3);
    let inserted = graph.entity(handle(&graph, ids[2].as_str()));
    assert_eq!(inserted.get_str("title"), Some("new"));
    assert!(inserted.unreleased);
    assert!(inserted.roots.contains(&r1));
    assert!(inserted.has_parent(r1));
    assert!(graph.entity(r1).dirty);
}

#[test]
fn insert_into_single_relation_replaces_child() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let insert = |child: &str| Change::Insert {
        parent_id: id("C1"),
        relation: "Primary".into(),
        entity: TreeNode::new("ChildType", child),
    };
    run(&engine, &mut graph, vec![insert("P1"), insert("P2")]).unwrap();

    let c1 = graph.entity(handle(&graph, "C1"));
    assert_eq!(c1.relation("Primary"), &[handle(&graph, "P2")]);
    assert!(graph.entity(handle(&graph, "P1")).deleted);
}

#[test]
fn insert_under_unknown_relation_is_rejected() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let err = run(
        &engine,
        &mut graph,
        vec![Change::Insert {
            parent_id: id("R1"),
            relation: "Sibling".into(),
            entity: TreeNode::new("ChildType", "C7"),
        }],
    )
    .unwrap_err();
    assert_eq!(err.code(), 400);
    assert!(graph.get(&id("C7")).is_none());
}

#[test]
fn manual_delete_survives_relinking() {
    let (engine, mut graph) = setup(EngineConfig::default());
    run(&engine, &mut graph, vec![Change::Delete { id: id("C1") }]).unwrap();
    let c1 = handle(&graph, "C1");
    assert!(graph.entity(c1).deleted);
    assert!(graph.entity(c1).manual_tombstone);
    assert!(graph.entity(c1).dirty);

    run(
        &engine,
        &mut graph,
        vec![
            update(
                "R1",
                "ChildType",
                Some(PatchValue::ids(["C1", "C2"])),
                Some(PatchValue::ids(["C2"])),
            ),
            update(
                "R1",
                "ChildType",
                Some(PatchValue::ids(["C2"])),
                Some(PatchValue::ids(["C2", "C1"])),
            ),
        ],
    )
    .unwrap();
    assert!(graph.entity(c1).deleted);
}

#[test]
fn manual_undelete_survives_unlinking() {
    let (engine, mut graph) = setup(EngineConfig::default());
    run(&engine, &mut graph, vec![Change::Undelete { id: id("C1") }]).unwrap();
    run(
        &engine,
        &mut graph,
        vec![update(
            "R1",
            "ChildType",
            Some(PatchValue::ids(["C1", "C2"])),
            Some(PatchValue::ids(["C2"])),
        )],
    )
    .unwrap();

    let c1 = graph.entity(handle(&graph, "C1"));
    assert!(!c1.deleted);
    assert!(c1.roots.is_empty());
}

#[test]
fn import_change_derives_roots() {
    let (engine, mut graph) = setup(EngineConfig::default());
    let changes = vec![
        Change::Import {
            entity: TreeNode::new("RootType", "R2")
                .with_children("ChildType", vec![TreeNode::new("ChildType", "D1")]),
            roots: vec![],
        },
        Change::Import {
            entity: TreeNode::new("ChildType", "C1")
                .with_children("ChildType", vec![TreeNode::new("ChildType", "G1")]),
            roots: vec![],
        },
    ];
    assert_eq!(run(&engine, &mut graph, changes).unwrap(), 2);

    let r2 = handle(&graph, "R2");
    assert!(graph.entity(handle(&graph, "D1")).roots.contains(&r2));
    assert!(graph.entity(handle(&graph, "G1")).roots.contains(&handle(&graph, "R1")));
}

#[test]
fn empty_command_applies_nothing() {
    let (engine, mut graph) = setup(EngineConfig::default());
    assert_eq!(run(&engine, &mut graph, vec![]).unwrap(), 0);
}

// ── Levels ──────────────────────────────────────────────────────

#[test]
fn level_label_update_propagates_upwards() {
    let (engine, mut graph) = setup(EngineConfig::default());
    engine
        .import_entity(&mut graph, &TreeNode::new("Niveau", "N1").with("title", "groep 3"), &[])
        .unwrap();

    run(
        &engine,
        &mut graph,
        vec![update("C1", "niveaus", None, Some(PatchValue::ids(["groep 3"])))],
    )
    .unwrap();

    let n1 = handle(&graph, "N1");
    let c1 = graph.entity(handle(&graph, "C1"));
    assert_eq!(c1.relation("Niveau"), &[n1]);
    assert_eq!(c1.level_index, vec![n1]);
    assert_eq!(graph.entity(handle(&graph, "R1")).level_index, vec![n1]);
}

// ── Wire format ─────────────────────────────────────────────────

#[test]
fn command_parses_from_json() {
    let json = r#"{
        "id": "cmd-1",
        "author": "editor",
        "message": "fix title",
        "changes": [
            { "kind": "update", "id": "R1", "property": "title",
              "prevValue": "A", "newValue": "B" },
            { "kind": "update", "id": "R1", "property": "ChildType",
              "prevValue": ["C1"], "newValue": ["C1", { "id": "C9", "@type": "ChildType" }] },
            { "kind": "insert", "parentId": "R1", "relation": "ChildType",
              "entity": { "@type": "ChildType", "title": "x" } },
            { "kind": "delete", "id": "C2" },
            { "kind": "import", "entity": { "id": "R2", "@type": "RootType" } }
        ]
    }"#;
    let command: Command = serde_json::from_str(json).unwrap();

    assert_eq!(command.id.as_str(), "cmd-1");
    assert_eq!(command.changes.len(), 5);
    assert_eq!(
        command.changes[0],
        update("R1", "title", Some("A".into()), Some("B".into()))
    );
    let Change::Update {
        new_value: Some(PatchValue::List(entries)),
        ..
    } = &command.changes[1]
    else {
        panic!("expected list update");
    };
    assert!(matches!(&entries[1], ListEntry::Entity(tree) if tree.resolved_id() == Some(id("C9"))));
    assert!(matches!(&command.changes[4], Change::Import { roots, .. } if roots.is_empty()));
}

#[test]
fn scalar_patch_values_keep_their_type() {
    let value: PatchValue = serde_json::from_str("3").unwrap();
    assert_eq!(value, PatchValue::Scalar(Scalar::Number(3.0)));
}
