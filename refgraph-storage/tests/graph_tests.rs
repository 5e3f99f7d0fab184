use refgraph_model::Entity;
use refgraph_storage::{EntityGraph, StorageError};
use refgraph_types::{EntityId, EntityRef};

fn make_entity(id: &str, ty: &str) -> Entity {
    Entity::new(EntityId::new(id), ty)
}

// ── Insert and lookup ────────────────────────────────────────────

#[test]
fn new_graph_is_empty() {
    let graph = EntityGraph::new();
    assert!(graph.is_empty());
    assert_eq!(graph.len(), 0);
    assert!(graph.bucket("RootType").is_empty());
}

#[test]
fn insert_indexes_and_buckets() {
    let mut graph = EntityGraph::new();
    let r = graph.insert(make_entity("root", "RootType")).unwrap();
    let c = graph.insert(make_entity("child", "ChildType")).unwrap();

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.get(&EntityId::new("root")), Some(r));
    assert!(graph.has(&EntityId::new("child")));
    assert_eq!(graph.bucket("ChildType"), &[c]);
    assert_eq!(graph.entity(c).entity_type, "ChildType");
    assert_eq!(graph.types().collect::<Vec<_>>(), vec!["ChildType", "RootType"]);
}

#[test]
fn insert_rejects_duplicate_id() {
    let mut graph = EntityGraph::new();
    graph.insert(make_entity("x", "RootType")).unwrap();
    let err = graph.insert(make_entity("x", "ChildType")).unwrap_err();
    assert!(matches!(err, StorageError::DuplicateId(id) if id.as_str() == "x"));
    assert_eq!(graph.len(), 1);
}

#[test]
fn get_unknown_is_none() {
    let graph = EntityGraph::new();
    assert_eq!(graph.get(&EntityId::new("nope")), None);
    assert!(graph.find(&EntityId::new("nope")).is_none());
}

#[test]
fn require_unknown_is_not_found() {
    let graph = EntityGraph::new();
    let err = graph.require(&EntityId::new("nope")).unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[test]
fn uuid_prefixed_lookup_hits_bare_id() {
    let mut graph = EntityGraph::new();
    let r = graph.insert(make_entity("abc", "RootType")).unwrap();
    assert_eq!(graph.get(&EntityId::new("/uuid/abc")), Some(r));
}

#[test]
fn iter_yields_insertion_order() {
    let mut graph = EntityGraph::new();
    graph.insert(make_entity("a", "T")).unwrap();
    graph.insert(make_entity("b", "T")).unwrap();
    let ids: Vec<_> = graph.iter().map(|(_, e)| e.id.as_str().to_string()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

// ── Id resolution ────────────────────────────────────────────────

#[test]
fn resolve_all_maps_ids() {
    let mut graph = EntityGraph::new();
    let a = graph.insert(make_entity("a", "T")).unwrap();
    let b = graph.insert(make_entity("b", "T")).unwrap();
    let refs = graph.resolve_all(&[EntityId::new("b"), EntityId::new("a")]);
    assert_eq!(refs, vec![b, a]);
    assert_eq!(graph.ids_of(&refs), vec![EntityId::new("b"), EntityId::new("a")]);
}

#[test]
#[should_panic(expected = "invariant violation")]
fn resolve_all_panics_on_unknown_id() {
    let graph = EntityGraph::new();
    let _ = graph.resolve_all(&[EntityId::new("ghost")]);
}

#[test]
#[should_panic(expected = "invariant violation")]
fn dangling_handle_panics() {
    let graph = EntityGraph::new();
    let _ = graph.entity(EntityRef::from_index(7));
}

// ── Reverse links ────────────────────────────────────────────────

#[test]
fn link_parent_uses_parent_type() {
    let mut graph = EntityGraph::new();
    let p = graph.insert(make_entity("p", "RootType")).unwrap();
    let c = graph.insert(make_entity("c", "ChildType")).unwrap();
    assert!(graph.link_parent(p, c));
    assert!(!graph.link_parent(p, c));
    assert!(graph.entity(c).parents["RootType"].contains(&p));
}

#[test]
fn unlink_parent_keeps_link_while_still_a_child() {
    let mut graph = EntityGraph::new();
    let p = graph.insert(make_entity("p", "RootType")).unwrap();
    let c = graph.insert(make_entity("c", "ChildType")).unwrap();
    graph.entity_mut(p).relations.insert("Other".into(), vec![c]);
    graph.link_parent(p, c);

    assert!(!graph.unlink_parent(p, c));
    assert!(graph.entity(c).has_parent(p));

    graph.entity_mut(p).relations.clear();
    assert!(graph.unlink_parent(p, c));
    assert!(graph.entity(c).parents.is_empty());
}
