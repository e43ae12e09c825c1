use std::collections::HashMap;
use tandem_identity::{ElementId, Fingerprint, Registry};
use tandem_parser::parse;

fn resolve_all(registry: &mut Registry, source: &str) -> HashMap<String, ElementId> {
    let output = parse(source);
    output
        .tree
        .preorder()
        .into_iter()
        .map(|node| (Fingerprint::of(node).key(), registry.resolve(node)))
        .collect()
}

const DOCUMENT: &str = r#"
event Start
activity Fulfilment {
    task Pick @at(10, 10)
    task Pack
    flow Pick -> Pack
}
activity Billing {
    task Pick
    task Invoice
}
event Done
flow Start -> Done
"#;

#[test]
fn test_resolve_twice_returns_same_ids() {
    let mut registry = Registry::new("file:///orders.flow");
    let first = resolve_all(&mut registry, DOCUMENT);
    let second = resolve_all(&mut registry, DOCUMENT);
    assert_eq!(first, second);
}

#[test]
fn test_unrelated_sibling_insert_keeps_every_id() {
    let mut registry = Registry::new("file:///orders.flow");
    let before = resolve_all(&mut registry, DOCUMENT);

    let edited = DOCUMENT.replace(
        "activity Billing {\n",
        "activity Billing {\n    task Audit\n",
    );
    let after = resolve_all(&mut registry, &edited);

    for (key, id) in &before {
        assert_eq!(after.get(key), Some(id), "id changed for {key}");
    }
    assert_eq!(after.len(), before.len() + 1);
}

#[test]
fn test_same_name_under_different_containers_gets_distinct_ids() {
    let mut registry = Registry::new("file:///orders.flow");
    let ids = resolve_all(&mut registry, DOCUMENT);
    let fulfilment = &ids[r#"Document[0]/Activity:"Fulfilment"/Task:"Pick""#];
    let billing = &ids[r#"Document[0]/Activity:"Billing"/Task:"Pick""#];
    assert_ne!(fulfilment, billing);
}
