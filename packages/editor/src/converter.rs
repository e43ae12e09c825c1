//! # Tree → diagram conversion
//!
//! Conversion runs in two phases:
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ identity: resolve every syntax node top-down        │
//! │  - one sibling group at a time (exact, positional,  │
//! │    mint)                                            │
//! │  - cancellation checked between top-level subtrees  │
//! └────────────────────────────────────────────────────┘
//!                          ↓
//! ┌────────────────────────────────────────────────────┐
//! │ build: effective `convertModel` hook                │
//! │  - default: depth-first traversal, edges last       │
//! │  - read-only; never touches the registry            │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! A cancelled conversion rolls back every id minted by the pass and returns
//! an empty model. Only a completed conversion commits adopted pending layout
//! and the rebuilt source ranges into the document metadata.

use crate::config::NodeTypeConfig;
use crate::context::{ConversionContext, ConversionScope, IdIndex};
use crate::providers::{self, ConvertModel, EdgeRequest, NodeRequest};
use crate::references::resolve_reference;
use std::collections::{BTreeMap, HashSet};
use tandem_identity::{ElementId, IdentityPass, PassSummary, Resolution};
use tandem_model::{
    DiagramElement, DiagramModelRoot, LabelElement, ModelMetadata, PendingLayout, PortElement,
};
use tandem_syntax::{NodeIndex, NodeRef, SyntaxTree};

pub const LABEL_TYPE: &str = "label";
pub const PORT_TYPE: &str = "port";

#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub model: DiagramModelRoot,
    pub index: IdIndex,
    pub summary: PassSummary,
    pub cancelled: bool,
}

/// Ids minted in this pass whose fingerprint key had pending layout
#[derive(Default)]
struct Adoption {
    layouts: BTreeMap<ElementId, PendingLayout>,
    keys: Vec<(String, ElementId)>,
}

pub fn convert(tree: &SyntaxTree, ctx: &mut ConversionContext<'_>) -> ConversionOutput {
    let empty_model =
        DiagramModelRoot::new(ctx.root_id.clone(), ctx.config.root_type.clone(), ctx.revision);

    let mut index = IdIndex::default();
    let mut adoption = Adoption::default();
    let mut pass = ctx.registry.begin_pass();

    let root = tree.root();
    let root_id = pass.resolve_root(root).id;
    index.insert(root_id.clone(), root.index());

    let top: Vec<NodeRef<'_>> = root.children().collect();
    let resolved = pass.resolve_siblings(Some(&root_id), &top);
    let mut cancelled = false;
    for (node, resolved) in top.iter().zip(resolved) {
        if ctx.cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        record(ctx.metadata, &mut index, &mut adoption, *node, &resolved.id, &resolved.resolution, &resolved.fingerprint.key());
        resolve_descendants(&mut pass, ctx.metadata, &mut index, &mut adoption, *node, &resolved.id);
    }

    if cancelled {
        pass.rollback();
        tracing::debug!("conversion cancelled during identity resolution");
        return cancelled_output(empty_model);
    }

    let elements = {
        let scope = ConversionScope {
            tree,
            config: ctx.config,
            providers: ctx.providers,
            metadata: ctx.metadata,
            index: &index,
            adopted: &adoption.layouts,
            cancel: &ctx.cancel,
        };
        match providers::convert_model(ctx.providers) {
            Some(hook) => hook.convert_model(&scope),
            None => Some(Vec::new()),
        }
    };

    let Some(children) = elements else {
        pass.rollback();
        tracing::debug!("conversion cancelled while building the model");
        return cancelled_output(empty_model);
    };
    let summary = pass.finish();

    for (key, id) in &adoption.keys {
        ctx.metadata.adopt_pending(key, id);
    }
    rebuild_ranges(ctx.metadata, tree, &index, &root_id);

    let mut model = empty_model;
    model.children = children;
    tracing::debug!(
        nodes = index.len(),
        elements = model.elements().len(),
        minted = summary.minted,
        renamed = summary.renamed,
        adopted = adoption.keys.len(),
        "converted syntax tree"
    );

    ConversionOutput {
        model,
        index,
        summary,
        cancelled: false,
    }
}

fn cancelled_output(model: DiagramModelRoot) -> ConversionOutput {
    ConversionOutput {
        model,
        index: IdIndex::default(),
        summary: PassSummary::default(),
        cancelled: true,
    }
}

fn resolve_descendants(
    pass: &mut IdentityPass<'_>,
    metadata: &ModelMetadata,
    index: &mut IdIndex,
    adoption: &mut Adoption,
    node: NodeRef<'_>,
    id: &ElementId,
) {
    let children: Vec<NodeRef<'_>> = node.children().collect();
    if children.is_empty() {
        return;
    }
    let resolved = pass.resolve_siblings(Some(id), &children);
    for (child, resolved) in children.iter().zip(resolved) {
        record(metadata, index, adoption, *child, &resolved.id, &resolved.resolution, &resolved.fingerprint.key());
        resolve_descendants(pass, metadata, index, adoption, *child, &resolved.id);
    }
}

fn record(
    metadata: &ModelMetadata,
    index: &mut IdIndex,
    adoption: &mut Adoption,
    node: NodeRef<'_>,
    id: &ElementId,
    resolution: &Resolution,
    key: &str,
) {
    index.insert(id.clone(), node.index());
    if *resolution != Resolution::Minted {
        return;
    }
    if let Some(pending) = metadata.pending.get(key) {
        adoption.layouts.insert(id.clone(), pending.clone());
        adoption.keys.push((key.to_string(), id.clone()));
    }
}

fn rebuild_ranges(metadata: &mut ModelMetadata, tree: &SyntaxTree, index: &IdIndex, root_id: &ElementId) {
    metadata.clear_ranges();
    for node in tree.preorder() {
        let Some(id) = index.id_of(node.index()) else {
            continue;
        };
        if id == root_id {
            continue;
        }
        metadata.source_ranges.insert(id.clone(), node.range());
        if let Some(name) = node.name() {
            metadata.name_ranges.insert(id.clone(), name.range);
        }
    }
}

/// Default `convertModel`: depth-first over the tree, nodes nested in their
/// containers, edges appended at the root once every node is known.
///
/// Node types unknown to the diagram type are transparent: their children
/// are lifted into the nearest converted container.
pub struct StandardTraversal;

struct Traversal<'s, 'a> {
    scope: &'s ConversionScope<'a>,
    converted: HashSet<NodeIndex>,
    edges: Vec<NodeRef<'a>>,
}

impl ConvertModel for StandardTraversal {
    fn convert_model(&self, scope: &ConversionScope<'_>) -> Option<Vec<DiagramElement>> {
        let mut traversal = Traversal {
            scope,
            converted: HashSet::new(),
            edges: Vec::new(),
        };

        let mut elements = Vec::new();
        for node in scope.tree.root().children() {
            if scope.is_cancelled() {
                return None;
            }
            traversal.visit(node, &mut elements);
        }

        let edges = std::mem::take(&mut traversal.edges);
        for edge in edges {
            if let Some(element) = traversal.build_edge(edge) {
                elements.push(element);
            }
        }
        Some(elements)
    }
}

impl<'s, 'a> Traversal<'s, 'a> {
    fn visit(&mut self, node: NodeRef<'a>, out: &mut Vec<DiagramElement>) {
        let config = self.scope.config;
        if let Some(node_type) = config.node_type(node.type_tag()) {
            if let Some(element) = self.build_node(node, node_type) {
                out.push(element);
            }
        } else if config.is_edge_type(node.type_tag()) {
            self.edges.push(node);
        } else {
            for child in node.children() {
                self.visit(child, out);
            }
        }
    }

    fn build_node(&mut self, node: NodeRef<'a>, node_type: &NodeTypeConfig) -> Option<DiagramElement> {
        let scope = self.scope;
        let id = scope.id_of(node)?;
        let hook = providers::create_node(scope.providers)?;

        let collapsed = scope.is_collapsed(id);
        let request = NodeRequest {
            node,
            id,
            node_type,
            position: scope.position_of(node, id),
            size: scope.size_of(node, id),
            collapsed,
        };
        let Some(mut element) = hook.create_node(&request) else {
            tracing::trace!(%id, "node skipped by createNode");
            return None;
        };

        if let Some(text) = self.label_of(node) {
            element.children.push(DiagramElement::Label(LabelElement {
                id: id.label(),
                element_type: LABEL_TYPE.to_string(),
                text,
            }));
        }
        for port in &node_type.ports {
            element.children.push(DiagramElement::Port(PortElement {
                id: ElementId::new(format!("{}_port_{}", id, port)),
                element_type: PORT_TYPE.to_string(),
                position: None,
            }));
        }

        self.converted.insert(node.index());
        if !collapsed {
            for child in node.children() {
                self.visit(child, &mut element.children);
            }
        }
        Some(DiagramElement::Node(element))
    }

    fn build_edge(&self, node: NodeRef<'a>) -> Option<DiagramElement> {
        let scope = self.scope;
        let edge_type = scope.config.edge_type(node.type_tag())?;
        let id = scope.id_of(node)?;
        let hook = providers::create_edge(scope.providers)?;

        let source_id = self.endpoint(node, &edge_type.source_property)?;
        let target_id = self.endpoint(node, &edge_type.target_property)?;
        let request = EdgeRequest {
            node,
            id,
            edge_type,
            source_id,
            target_id,
            routing_points: scope
                .metadata
                .routing_points
                .get(id)
                .cloned()
                .unwrap_or_default(),
        };
        let mut element = hook.create_edge(&request)?;

        if node.name().is_some() || node.property("label").is_some() {
            if let Some(text) = self.label_of(node) {
                element.children.push(DiagramElement::Label(LabelElement {
                    id: id.label(),
                    element_type: LABEL_TYPE.to_string(),
                    text,
                }));
            }
        }
        Some(DiagramElement::Edge(element))
    }

    fn endpoint(&self, edge: NodeRef<'a>, property: &str) -> Option<&'a ElementId> {
        let name = &edge.property(property)?.value.value;
        let target = resolve_reference(self.scope.tree, edge.parent(), name, |n| {
            self.converted.contains(&n.index())
        });
        match target {
            Some(node) => self.scope.id_of(node),
            None => {
                tracing::trace!(edge = %edge.index(), %name, "unresolved edge endpoint");
                None
            }
        }
    }

    fn label_of(&self, node: NodeRef<'_>) -> Option<String> {
        providers::get_label(self.scope.providers).and_then(|hook| hook.get_label(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiagramTypeConfig;
    use crate::providers::default_providers;
    use tandem_identity::Registry;
    use tandem_model::Point;
    use tandem_parser::parse;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        config: DiagramTypeConfig,
        providers: crate::providers::Providers,
        registry: Registry,
        metadata: ModelMetadata,
    }

    impl Fixture {
        fn new() -> Self {
            let config = DiagramTypeConfig::workflow();
            let providers = default_providers(&config);
            Self {
                config,
                providers,
                registry: Registry::new("/test.flow"),
                metadata: ModelMetadata::new(),
            }
        }

        fn convert(&mut self, source: &str) -> ConversionOutput {
            let output = parse(source);
            let mut ctx = ConversionContext::new(
                &self.config,
                &self.providers,
                &mut self.registry,
                &mut self.metadata,
            );
            convert(&output.tree, &mut ctx)
        }
    }

    #[test]
    fn test_nodes_nest_and_edges_go_to_root() {
        let mut fx = Fixture::new();
        let output = fx.convert("activity Main {\n  task A\n  task B\n  flow A -> B\n}\n");
        let model = &output.model;

        assert_eq!(model.children.len(), 2);
        let main = model.children[0].as_node().unwrap();
        assert_eq!(main.element_type, "node:activity");
        // label, then the two tasks
        assert_eq!(main.children.len(), 3);
        assert_eq!(main.children[0].label_text(), Some("Main"));

        let edge = model.children[1].as_edge().unwrap();
        assert_eq!(&edge.source_id, main.children[1].id());
        assert_eq!(&edge.target_id, main.children[2].id());
        assert!(edge.children.is_empty());
    }

    #[test]
    fn test_label_ids_derive_from_node_ids() {
        let mut fx = Fixture::new();
        let output = fx.convert("task \"Review PR\"\n");
        let node = &output.model.children[0];
        let label = &node.children()[0];
        assert_eq!(label.id().as_str(), format!("{}_label", node.id()));
        assert_eq!(label.label_text(), Some("Review PR"));
    }

    #[test]
    fn test_unknown_types_are_transparent() {
        let mut fx = Fixture::new();
        let output = fx.convert("lane L {\n  task A\n}\n");
        assert_eq!(output.model.children.len(), 1);
        assert_eq!(output.model.children[0].element_type(), "node:task");
    }

    #[test]
    fn test_unresolved_edges_are_skipped() {
        let mut fx = Fixture::new();
        let output = fx.convert("task A\nflow A -> Missing\n");
        assert!(output.model.edges().is_empty());
        assert_eq!(output.model.nodes().len(), 1);
    }

    #[test]
    fn test_collapsed_container_omits_children() {
        let mut fx = Fixture::new();
        let source = "activity Main {\n  task A\n}\n";
        let first = fx.convert(source);
        let main = first.model.children[0].id().clone();
        fx.metadata.set_collapsed(main.clone(), true);

        let second = fx.convert(source);
        let node = second.model.children[0].as_node().unwrap();
        assert!(node.collapsed);
        assert_eq!(node.children.len(), 1);
        // the hidden task keeps its id
        assert_eq!(first.index.len(), second.index.len());
    }

    #[test]
    fn test_metadata_wins_over_annotation_hint() {
        let mut fx = Fixture::new();
        let first = fx.convert("task A @at(1, 2)\n");
        let id = first.model.children[0].id().clone();
        assert_eq!(
            first.model.children[0].as_node().unwrap().position,
            Some(Point::new(1.0, 2.0))
        );

        fx.metadata.set_position(id, Point::new(50.0, 60.0));
        let second = fx.convert("task A @at(1, 2)\n");
        assert_eq!(
            second.model.children[0].as_node().unwrap().position,
            Some(Point::new(50.0, 60.0))
        );
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let mut fx = Fixture::new();
        let source = "activity X { task A; task B }\nevent Start\nflow Start -> A\n";
        let first = fx.convert(source);
        let second = fx.convert(source);
        assert_eq!(first.model, second.model);
        assert_eq!(second.summary.minted, 0);
    }

    #[test]
    fn test_source_ranges_recorded() {
        let mut fx = Fixture::new();
        let source = "task A\ntask \"B\"\n";
        let output = fx.convert(source);
        let b = output.model.children[1].id();
        let range = fx.metadata.source_range(b).unwrap();
        assert_eq!(&source[range.start..range.end], "task \"B\"");
        let name = fx.metadata.name_ranges[b];
        assert_eq!(&source[name.start..name.end], "\"B\"");
    }

    #[test]
    fn test_cancelled_conversion_rolls_back() {
        let mut fx = Fixture::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let output = parse("task A\ntask B\n");
        let mut ctx = ConversionContext::new(
            &fx.config,
            &fx.providers,
            &mut fx.registry,
            &mut fx.metadata,
        )
        .with_cancel(cancel);
        let result = convert(&output.tree, &mut ctx);

        assert!(result.cancelled);
        assert!(result.model.children.is_empty());
        assert!(fx.registry.is_empty());
        assert!(fx.metadata.source_ranges.is_empty());
    }

    #[test]
    fn test_pending_layout_adopted_by_minted_id() {
        let mut fx = Fixture::new();
        fx.convert("task A\n");
        fx.metadata.pending.insert(
            r#"Document[0]/Task:"Task1""#.to_string(),
            PendingLayout {
                position: Some(Point::new(7.0, 8.0)),
                size: None,
            },
        );

        let output = fx.convert("task A\ntask Task1\n");
        let created = output.model.children[1].as_node().unwrap();
        assert_eq!(created.position, Some(Point::new(7.0, 8.0)));
        assert!(fx.metadata.pending.is_empty());
        assert_eq!(fx.metadata.position(&created.id), Some(Point::new(7.0, 8.0)));
    }

    #[test]
    fn test_malformed_tree_converts_best_effort() {
        let mut fx = Fixture::new();
        let output = fx.convert("task A\ntask : :\nactivity Open {\n  task B\n");
        let names: Vec<_> = output
            .model
            .elements()
            .into_iter()
            .filter_map(|e| e.label_text())
            .collect();
        assert!(names.contains(&"A"));
        assert!(names.contains(&"B"));
    }
}
