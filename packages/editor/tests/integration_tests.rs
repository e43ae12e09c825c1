//! Integration tests for editor crate: operation → edit → reparse → convert

use tandem_editor::{
    apply, convert, default_providers, Applied, ApplyContext, ConversionContext,
    DiagramTypeConfig, IdIndex, OperationResult, Providers,
};
use tandem_identity::{ElementId, Registry};
use tandem_model::{BoundsChange, DiagramModelRoot, DiagramOperation, Dimension, ModelMetadata, Point};
use tandem_parser::parse;
use tandem_syntax::{apply_edits, SyntaxTree};

/// A document as the orchestrator keeps it, without the async wrapper.
struct Session {
    config: DiagramTypeConfig,
    providers: Providers,
    registry: Registry,
    metadata: ModelMetadata,
    source: String,
    tree: SyntaxTree,
    index: IdIndex,
    model: DiagramModelRoot,
    revision: u64,
}

impl Session {
    fn open(source: &str) -> Self {
        Self::with_config(source, DiagramTypeConfig::workflow())
    }

    fn with_config(source: &str, config: DiagramTypeConfig) -> Self {
        let mut session = Session {
            providers: default_providers(&config),
            config,
            registry: Registry::new("file:///workflow.flow"),
            metadata: ModelMetadata::new(),
            source: String::new(),
            tree: parse("").tree,
            index: IdIndex::default(),
            model: DiagramModelRoot::new("root", "graph", 0),
            revision: 0,
        };
        session.sync(source);
        session
    }

    fn sync(&mut self, source: &str) {
        self.revision += 1;
        let tree = parse(source).tree;
        let output = {
            let mut ctx = ConversionContext::new(
                &self.config,
                &self.providers,
                &mut self.registry,
                &mut self.metadata,
            )
            .with_revision(self.revision);
            convert(&tree, &mut ctx)
        };
        self.tree = tree;
        self.index = output.index;
        self.model = output.model;
        self.source = source.to_string();
    }

    fn apply(&mut self, operation: DiagramOperation) -> OperationResult {
        apply(
            &operation,
            ApplyContext {
                tree: &self.tree,
                source: &self.source,
                config: &self.config,
                providers: &self.providers,
                registry: &mut self.registry,
                metadata: &mut self.metadata,
                index: &self.index,
            },
        )
    }

    /// Apply, then feed the edited text back like the editor would.
    fn execute(&mut self, operation: DiagramOperation) -> Applied {
        let applied = self.apply(operation).unwrap();
        let edited = apply_edits(&self.source, &applied.edits).unwrap();
        self.sync(&edited);
        applied
    }

    fn ids_named(&self, name: &str) -> Vec<ElementId> {
        self.tree
            .preorder()
            .into_iter()
            .filter(|n| n.name().is_some_and(|atom| atom.value == name))
            .filter_map(|n| self.index.id_of(n.index()).cloned())
            .collect()
    }

    fn id(&self, name: &str) -> ElementId {
        self.ids_named(name).remove(0)
    }
}

#[test]
fn test_create_node_round_trip_through_pending_layout() {
    let mut session = Session::open("activity Main {\n  task A\n}\n");
    let main = session.id("Main");

    session.execute(DiagramOperation::CreateNode {
        element_type: "node:task".to_string(),
        location: Some(Point::new(10.0, 20.0)),
        container_id: Some(main.clone()),
    });

    assert_eq!(session.source, "activity Main {\n  task A\n  task Task1\n}\n");
    let created = session.id("Task1");
    let node = session.model.find(&created).unwrap().as_node().unwrap();
    assert_eq!(node.position, Some(Point::new(10.0, 20.0)));
    assert_eq!(node.size, Some(Dimension::new(120.0, 60.0)));
    assert!(session.metadata.pending.is_empty());

    let container = session.model.find(&main).unwrap();
    assert!(container.children().iter().any(|child| child.id() == &created));
}

#[test]
fn test_create_node_round_trip_in_text() {
    let mut config = DiagramTypeConfig::workflow();
    config.layout_in_text = true;
    let mut session = Session::with_config("task A\n", config);

    session.execute(DiagramOperation::CreateNode {
        element_type: "node:event".to_string(),
        location: Some(Point::new(10.0, 20.0)),
        container_id: None,
    });

    assert_eq!(session.source, "task A\nevent Event1 @at(10, 20)\n");
    let created = session.id("Event1");
    let node = session.model.find(&created).unwrap().as_node().unwrap();
    assert_eq!(node.position, Some(Point::new(10.0, 20.0)));
}

#[test]
fn test_delete_then_recreate_mints_fresh_id() {
    let mut session = Session::open("task A\ntask B\n");
    let old_b = session.id("B");

    let applied = session.execute(DiagramOperation::DeleteElement {
        element_ids: vec![old_b.clone()],
    });
    assert_eq!(applied.invalidated, vec![old_b.clone()]);
    assert_eq!(session.source, "task A\n");
    assert!(!session.model.contains(&old_b));
    assert!(!session.registry.contains(&old_b));

    session.sync("task A\ntask B\n");
    let new_b = session.id("B");
    assert_ne!(new_b, old_b);
    assert!(!session.model.contains(&old_b));
}

#[test]
fn test_rename_keeps_id_under_distinct_containers() {
    let mut session = Session::open("activity X { task A }\nactivity Y { task A }\n");
    let ids = session.ids_named("A");
    assert_eq!(ids.len(), 2);
    let in_y = ids[1].clone();

    session.execute(DiagramOperation::EditLabel {
        label_id: in_y.label(),
        text: "C".to_string(),
    });

    assert_eq!(session.source, "activity X { task A }\nactivity Y { task C }\n");
    assert_eq!(session.id("C"), in_y);
    assert_eq!(session.id("A"), ids[0]);
    let label = session.model.find(&in_y).unwrap().label_text();
    assert_eq!(label, Some("C"));
}

#[test]
fn test_change_bounds_without_apply_position() {
    let mut session = Session::open("task A @at(1, 1)\n");
    let a = session.id("A");

    let applied = session.execute(DiagramOperation::ChangeBounds {
        changes: vec![BoundsChange {
            element_id: a.clone(),
            new_position: Some(Point::new(200.0, 50.0)),
            new_size: None,
        }],
    });

    assert!(applied.edits.is_empty());
    assert!(applied.metadata_changed);
    assert_eq!(session.source, "task A @at(1, 1)\n");
    assert_eq!(session.metadata.position(&a), Some(Point::new(200.0, 50.0)));
    let node = session.model.find(&a).unwrap().as_node().unwrap();
    assert_eq!(node.position, Some(Point::new(200.0, 50.0)));
}

#[test]
fn test_unrelated_sibling_insert_keeps_ids() {
    let mut session = Session::open("task A\ntask B\nflow A -> B\n");
    let a = session.id("A");
    let b = session.id("B");
    let edge = session.model.edges()[0].id.clone();

    session.sync("task Z\ntask A\ntask B\nflow A -> B\n");

    assert_eq!(session.id("A"), a);
    assert_eq!(session.id("B"), b);
    assert_eq!(session.model.edges()[0].id, edge);
}

#[test]
fn test_create_edge_then_reconnect() {
    let mut session = Session::open("task A\ntask B\ntask C\n");
    let a = session.id("A");
    let b = session.id("B");
    let c = session.id("C");

    session.execute(DiagramOperation::CreateEdge {
        element_type: "edge:flow".to_string(),
        source_id: a.clone(),
        target_id: b.clone(),
    });
    let edge = session.model.edges()[0].clone();
    assert_eq!((&edge.source_id, &edge.target_id), (&a, &b));

    session.execute(DiagramOperation::ReconnectEdge {
        edge_id: edge.id.clone(),
        new_source_id: None,
        new_target_id: Some(c.clone()),
    });
    assert_eq!(session.source, "task A\ntask B\ntask C\nflow A -> C\n");
    let reconnected = session.model.edges()[0];
    assert_eq!(reconnected.id, edge.id);
    assert_eq!(reconnected.target_id, c);
}

#[test]
fn test_failed_operation_changes_nothing() {
    let mut session = Session::open("task A\n");
    let a = session.id("A");
    let before = session.metadata.clone();
    let registered = session.registry.len();

    let result = session.apply(DiagramOperation::DeleteElement {
        element_ids: vec![a.clone(), ElementId::from("missing-1")],
    });

    assert!(result.is_err());
    assert_eq!(session.metadata, before);
    assert_eq!(session.registry.len(), registered);
    assert!(session.registry.contains(&a));
}
