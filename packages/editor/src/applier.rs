//! # Diagram operation → text edits
//!
//! Every [`DiagramOperation`] is handled on its own: resolve the ids it names
//! through the last conversion's [`IdIndex`], compute edits against the
//! current source, and commit metadata and registry changes only when the
//! whole operation succeeds.
//!
//! ```text
//! createNode      → insert statement (container body or document end)
//! deleteElement   → delete outer ranges, cascade dependent edges
//! changeBounds    → applyPosition/applySize edits, else metadata only
//! createEdge      → insert edge statement in the lowest common container
//! reconnectEdge   → replace one endpoint token
//! editLabel       → replace the name token, keep its quoting
//! updateProperty  → replace or insert a `key: value` member
//! ```
//!
//! The registry is never asked to mint here; the reparse and conversion that
//! follow the edit assign ids to new nodes.

use crate::config::DiagramTypeConfig;
use crate::context::IdIndex;
use crate::providers::{self, AstEdgeRequest, AstNodeRequest, Providers};
use crate::references::resolve_reference;
use tandem_identity::{ElementId, Fingerprint, Registry};
use tandem_model::{
    BoundsChange, DiagramOperation, Dimension, ModelMetadata, PendingLayout, Point,
};
use tandem_parser::{format_name, is_identifier, quote};
use tandem_syntax::{apply_edits, NodeRef, SyntaxTree, TextEdit, TextRange};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationFailure {
    #[error("Element '{0}' not found")]
    NotFound(ElementId),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid operation: {0}")]
    Invalid(String),
}

impl OperationFailure {
    fn invalid(message: impl Into<String>) -> Self {
        OperationFailure::Invalid(message.into())
    }

    fn unsupported(message: impl Into<String>) -> Self {
        OperationFailure::Unsupported(message.into())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub edits: Vec<TextEdit>,
    /// Ids removed from the registry
    pub invalidated: Vec<ElementId>,
    pub metadata_changed: bool,
}

pub type OperationResult = Result<Applied, OperationFailure>;

pub struct ApplyContext<'a> {
    pub tree: &'a SyntaxTree,
    pub source: &'a str,
    pub config: &'a DiagramTypeConfig,
    pub providers: &'a Providers,
    pub registry: &'a mut Registry,
    pub metadata: &'a mut ModelMetadata,
    /// Node ↔ id mapping of the conversion `tree` came from
    pub index: &'a IdIndex,
}

/// Apply `operation`. On failure neither the registry nor the metadata is
/// touched and no edits are returned.
pub fn apply(operation: &DiagramOperation, ctx: ApplyContext<'_>) -> OperationResult {
    let mut applier = Applier {
        tree: ctx.tree,
        source: ctx.source,
        config: ctx.config,
        providers: ctx.providers,
        index: ctx.index,
        registry: &*ctx.registry,
        metadata: ctx.metadata.clone(),
        metadata_changed: false,
        invalidated: Vec::new(),
    };

    let result = applier.dispatch(operation).and_then(|edits| {
        apply_edits(ctx.source, &edits)
            .map(|_| edits)
            .map_err(|e| OperationFailure::invalid(e.to_string()))
    });
    let Applier {
        metadata,
        metadata_changed,
        invalidated,
        ..
    } = applier;

    match result {
        Ok(edits) => {
            for id in &invalidated {
                ctx.registry.invalidate(id);
            }
            if metadata_changed {
                *ctx.metadata = metadata;
            }
            tracing::debug!(
                kind = operation.kind(),
                edits = edits.len(),
                invalidated = invalidated.len(),
                "applied diagram operation"
            );
            Ok(Applied {
                edits,
                invalidated,
                metadata_changed,
            })
        }
        Err(failure) => {
            tracing::debug!(kind = operation.kind(), error = %failure, "diagram operation rejected");
            Err(failure)
        }
    }
}

struct Applier<'a> {
    tree: &'a SyntaxTree,
    source: &'a str,
    config: &'a DiagramTypeConfig,
    providers: &'a Providers,
    index: &'a IdIndex,
    registry: &'a Registry,
    /// Scratch copy, committed on success
    metadata: ModelMetadata,
    metadata_changed: bool,
    invalidated: Vec<ElementId>,
}

type Edits = Result<Vec<TextEdit>, OperationFailure>;

impl<'a> Applier<'a> {
    fn dispatch(&mut self, operation: &DiagramOperation) -> Edits {
        match operation {
            DiagramOperation::CreateNode {
                element_type,
                location,
                container_id,
            } => self.apply_create_node(element_type, *location, container_id.as_ref()),
            DiagramOperation::DeleteElement { element_ids } => self.apply_delete(element_ids),
            DiagramOperation::ChangeBounds { changes } => self.apply_change_bounds(changes),
            DiagramOperation::CreateEdge {
                element_type,
                source_id,
                target_id,
            } => self.apply_create_edge(element_type, source_id, target_id),
            DiagramOperation::ReconnectEdge {
                edge_id,
                new_source_id,
                new_target_id,
            } => self.apply_reconnect_edge(edge_id, new_source_id.as_ref(), new_target_id.as_ref()),
            DiagramOperation::EditLabel { label_id, text } => self.apply_edit_label(label_id, text),
            DiagramOperation::UpdateProperty {
                element_ids,
                property,
                value,
            } => self.apply_update_property(element_ids, property, value),
        }
    }

    fn apply_create_node(
        &mut self,
        element_type: &str,
        location: Option<Point>,
        container_id: Option<&ElementId>,
    ) -> Edits {
        let node_type = self
            .config
            .find_node_type(element_type)
            .ok_or_else(|| OperationFailure::invalid(format!("unknown node type '{}'", element_type)))?;
        let writer = providers::create_ast_node(self.providers)
            .ok_or_else(|| OperationFailure::unsupported("createAstNode is disabled"))?;

        let container = match container_id {
            Some(id) => {
                let node = self.node(id)?;
                if !self.is_container(node) {
                    return Err(OperationFailure::invalid(format!("'{}' cannot contain nodes", id)));
                }
                node
            }
            None => self.tree.root(),
        };

        let name = self.unique_name(node_type.name_prefix());
        let written_name = format_name(&name, false);
        let fragment = match (location, providers::apply_position(self.providers)) {
            (Some(position), Some(hook)) => hook.position_fragment(position),
            _ => None,
        };

        let statement = writer
            .create_ast_node(&AstNodeRequest {
                node_type,
                name: &written_name,
                position: fragment.as_deref(),
            })
            .ok_or_else(|| OperationFailure::invalid("createAstNode produced no statement"))?;
        let edit = self.insert_member(container, &statement)?;

        let position = if fragment.is_some() { None } else { location };
        let size = if providers::apply_size(self.providers).is_some() {
            None
        } else {
            node_type.default_size
        };
        if position.is_some() || size.is_some() {
            let index = container
                .children()
                .filter(|c| c.type_tag() == node_type.type_tag)
                .count();
            let key = Fingerprint::of(container)
                .child(&node_type.type_tag, index, Some(&name))
                .key();
            tracing::trace!(%key, "pending layout for created node");
            self.metadata.pending.insert(key, PendingLayout { position, size });
            self.metadata_changed = true;
        }

        Ok(vec![edit])
    }

    fn apply_delete(&mut self, element_ids: &[ElementId]) -> Edits {
        if element_ids.is_empty() {
            return Err(OperationFailure::invalid("no elements to delete"));
        }

        let mut targets: Vec<(NodeRef<'a>, TextRange)> = Vec::new();
        for id in element_ids {
            let node = self.node(id)?;
            if node.parent().is_none() {
                return Err(OperationFailure::invalid("the document root cannot be deleted"));
            }
            let owner = id.label_owner().unwrap_or_else(|| id.clone());
            let range = self
                .metadata
                .source_range(&owner)
                .unwrap_or_else(|| node.range());
            targets.push((node, range));
        }

        for edge in self.dependent_edges(&targets) {
            targets.push((edge, edge.range()));
        }

        let mut ranges: Vec<TextRange> = targets.iter().map(|(_, range)| *range).collect();
        ranges.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut deleted: Vec<TextRange> = Vec::new();
        for range in ranges {
            if deleted.iter().any(|outer| outer.contains_range(&range)) {
                continue;
            }
            deleted.push(range);
        }

        for node in self.tree.preorder().into_iter().skip(1) {
            if !deleted.iter().any(|range| range.contains_range(&node.range())) {
                continue;
            }
            if let Some(id) = self.index.id_of(node.index()) {
                self.metadata.remove(id);
                self.invalidated.push(id.clone());
            }
        }
        self.metadata_changed = true;

        let mut spans: Vec<TextRange> = Vec::new();
        for range in &deleted {
            let span = owned_lines(self.source, *range);
            match spans.last_mut() {
                Some(last) if span.start < last.end => *last = last.cover(&span),
                _ => spans.push(span),
            }
        }
        Ok(spans.into_iter().map(TextEdit::delete).collect())
    }

    /// Edges whose endpoints resolve into any of `targets`.
    fn dependent_edges(&self, targets: &[(NodeRef<'a>, TextRange)]) -> Vec<NodeRef<'a>> {
        let doomed = |node: NodeRef<'_>| {
            targets
                .iter()
                .any(|(target, _)| target.index() == node.index() || target.is_ancestor_of(&node))
        };

        self.tree
            .preorder()
            .into_iter()
            .filter(|edge| !doomed(*edge))
            .filter(|edge| {
                let Some(edge_type) = self.config.edge_type(edge.type_tag()) else {
                    return false;
                };
                [&edge_type.source_property, &edge_type.target_property]
                    .into_iter()
                    .filter_map(|key| edge.property(key))
                    .filter_map(|property| self.resolve_endpoint(*edge, &property.value.value))
                    .any(|endpoint| doomed(endpoint))
            })
            .collect()
    }

    fn apply_change_bounds(&mut self, changes: &[BoundsChange]) -> Edits {
        if changes.is_empty() {
            return Err(OperationFailure::invalid("no bounds to change"));
        }
        let position_hook = providers::apply_position(self.providers);
        let size_hook = providers::apply_size(self.providers);

        let mut edits = Vec::new();
        for change in changes {
            let id = &change.element_id;
            if id.label_owner().is_some() {
                return Err(OperationFailure::unsupported(format!("label '{}' has no bounds", id)));
            }
            let node = self.node(id)?;
            if self.config.is_edge_type(node.type_tag()) {
                return Err(OperationFailure::unsupported(format!("edge '{}' has no bounds", id)));
            }

            if let Some(position) = change.new_position {
                match position_hook {
                    Some(hook) => {
                        edits.extend(hook.apply_position(node, position, self.source));
                        self.metadata.positions.remove(id);
                    }
                    None => self.metadata.set_position(id.clone(), position),
                }
                self.metadata_changed = true;
            }
            if let Some(size) = change.new_size {
                match size_hook {
                    Some(hook) => {
                        edits.extend(hook.apply_size(node, size, self.source));
                        self.metadata.sizes.remove(id);
                    }
                    None => self.metadata.set_size(id.clone(), clamp_size(size)),
                }
                self.metadata_changed = true;
            }
        }
        Ok(edits)
    }

    fn apply_create_edge(&mut self, element_type: &str, source_id: &ElementId, target_id: &ElementId) -> Edits {
        let edge_type = self
            .config
            .find_edge_type(element_type)
            .ok_or_else(|| OperationFailure::invalid(format!("unknown edge type '{}'", element_type)))?;
        let writer = providers::create_ast_edge(self.providers)
            .ok_or_else(|| OperationFailure::unsupported("createAstEdge is disabled"))?;

        let source = self.endpoint_node(source_id)?;
        let target = self.endpoint_node(target_id)?;
        let container = source
            .ancestors()
            .find(|ancestor| ancestor.is_ancestor_of(&target))
            .unwrap_or_else(|| self.tree.root());

        let source_name = self.reference_to(source, container, None)?;
        let target_name = self.reference_to(target, container, None)?;
        let statement = writer
            .create_ast_edge(&AstEdgeRequest {
                edge_type,
                source: &source_name,
                target: &target_name,
            })
            .ok_or_else(|| OperationFailure::invalid("createAstEdge produced no statement"))?;

        Ok(vec![self.insert_member(container, &statement)?])
    }

    fn apply_reconnect_edge(
        &mut self,
        edge_id: &ElementId,
        new_source: Option<&ElementId>,
        new_target: Option<&ElementId>,
    ) -> Edits {
        let edge = self.node(edge_id)?;
        let edge_type = self
            .config
            .edge_type(edge.type_tag())
            .ok_or_else(|| OperationFailure::invalid(format!("'{}' is not an edge", edge_id)))?;
        if new_source.is_none() && new_target.is_none() {
            return Err(OperationFailure::invalid("nothing to reconnect"));
        }
        let scope = edge.parent().unwrap_or_else(|| self.tree.root());

        let mut edits = Vec::new();
        for (endpoint_id, key) in [
            (new_source, &edge_type.source_property),
            (new_target, &edge_type.target_property),
        ] {
            let Some(endpoint_id) = endpoint_id else {
                continue;
            };
            let endpoint = self.endpoint_node(endpoint_id)?;
            let property = edge.property(key).ok_or_else(|| {
                OperationFailure::invalid(format!("edge '{}' has no '{}' reference", edge_id, key))
            })?;
            let text = self.reference_to(endpoint, scope, Some(property.value.quoted))?;
            edits.push(TextEdit::replace(property.value.range, text));
        }
        Ok(edits)
    }

    fn apply_edit_label(&mut self, label_id: &ElementId, text: &str) -> Edits {
        if text.is_empty() {
            return Err(OperationFailure::invalid("label text cannot be empty"));
        }
        let node = self.node(label_id)?;
        let owner = label_id.label_owner().unwrap_or_else(|| label_id.clone());

        let Some(name) = node.name() else {
            if self.config.is_edge_type(node.type_tag()) {
                return Ok(vec![self.property_edit(node, "label", text)?]);
            }
            let at = node.data().keyword_range.end;
            return Ok(vec![TextEdit::insert(at, format!(" {}", format_name(text, false)))]);
        };

        let range = self
            .metadata
            .name_ranges
            .get(&owner)
            .copied()
            .unwrap_or(name.range);
        let mut edits = vec![TextEdit::replace(range, format_name(text, name.quoted))];

        // Keep edges attached to the renamed node
        for edge in self.tree.preorder() {
            let Some(edge_type) = self.config.edge_type(edge.type_tag()) else {
                continue;
            };
            for key in [&edge_type.source_property, &edge_type.target_property] {
                let Some(property) = edge.property(key) else {
                    continue;
                };
                if self.resolve_endpoint(edge, &property.value.value) == Some(node) {
                    edits.push(TextEdit::replace(
                        property.value.range,
                        format_name(text, property.value.quoted),
                    ));
                }
            }
        }
        Ok(edits)
    }

    fn apply_update_property(&mut self, element_ids: &[ElementId], property: &str, value: &str) -> Edits {
        if element_ids.is_empty() {
            return Err(OperationFailure::invalid("no elements selected"));
        }
        if property == "name" {
            let mut edits = Vec::new();
            for id in element_ids {
                edits.extend(self.apply_edit_label(id, value)?);
            }
            return Ok(edits);
        }
        if !is_identifier(property) {
            return Err(OperationFailure::invalid(format!("'{}' is not a valid property name", property)));
        }

        let mut edits = Vec::new();
        for id in element_ids {
            let node = self.node(id)?;
            edits.push(self.property_edit(node, property, value)?);
        }
        Ok(edits)
    }

    fn property_edit(&self, node: NodeRef<'a>, key: &str, value: &str) -> Result<TextEdit, OperationFailure> {
        match node.property(key) {
            Some(existing) => Ok(TextEdit::replace(
                existing.value.range,
                format_value(value, existing.value.quoted),
            )),
            None => self.insert_member(node, &format!("{}: {}", key, format_value(value, false))),
        }
    }

    // Helpers

    /// Node of a live id. Ids already invalidated, e.g. by a delete whose
    /// edits have not come back yet, are not found.
    fn node(&self, id: &ElementId) -> Result<NodeRef<'a>, OperationFailure> {
        let owner = id.label_owner().unwrap_or_else(|| id.clone());
        if !self.registry.contains(&owner) {
            return Err(OperationFailure::NotFound(id.clone()));
        }
        self.index
            .node_of(&owner)
            .and_then(|index| self.tree.get(index))
            .ok_or_else(|| OperationFailure::NotFound(id.clone()))
    }

    fn endpoint_node(&self, id: &ElementId) -> Result<NodeRef<'a>, OperationFailure> {
        let node = self.node(id)?;
        if !self.config.is_node_type(node.type_tag()) {
            return Err(OperationFailure::invalid(format!("'{}' cannot be an edge endpoint", id)));
        }
        Ok(node)
    }

    fn resolve_endpoint(&self, edge: NodeRef<'a>, name: &str) -> Option<NodeRef<'a>> {
        resolve_reference(self.tree, edge.parent(), name, |n| {
            self.config.is_node_type(n.type_tag())
        })
    }

    /// Name to write inside `scope` so that it resolves back to `node`.
    fn reference_to(
        &self,
        node: NodeRef<'a>,
        scope: NodeRef<'a>,
        quoted: Option<bool>,
    ) -> Result<String, OperationFailure> {
        let name = node.name().ok_or_else(|| {
            OperationFailure::invalid(format!("node '{}' has no name to reference", node.type_tag()))
        })?;
        let resolved = resolve_reference(self.tree, Some(scope), &name.value, |n| {
            self.config.is_node_type(n.type_tag())
        });
        if resolved != Some(node) {
            return Err(OperationFailure::invalid(format!(
                "name '{}' does not refer to a unique node here",
                name.value
            )));
        }
        Ok(format_name(&name.value, quoted.unwrap_or(name.quoted)))
    }

    fn is_container(&self, node: NodeRef<'_>) -> bool {
        self.config
            .node_type(node.type_tag())
            .is_some_and(|t| t.container)
    }

    fn unique_name(&self, prefix: &str) -> String {
        let taken: std::collections::HashSet<&str> = self
            .tree
            .preorder()
            .into_iter()
            .filter_map(|n| n.name().map(|atom| atom.value.as_str()))
            .collect();
        (1..)
            .map(|n| format!("{}{}", prefix, n))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| prefix.to_string())
    }

    /// Insert `statement` as the last member of `container`.
    fn insert_member(&self, container: NodeRef<'a>, statement: &str) -> Result<TextEdit, OperationFailure> {
        let source = self.source;
        if container.parent().is_none() {
            let separator = if source.is_empty() || source.ends_with('\n') {
                ""
            } else {
                "\n"
            };
            return Ok(TextEdit::insert(source.len(), format!("{}{}\n", separator, statement)));
        }

        let indent = line_indent(source, container.range().start);
        let child_indent = container
            .children()
            .map(|child| child.range().start)
            .find(|start| owns_line_start(source, *start))
            .map(|start| line_indent(source, start))
            .unwrap_or_else(|| format!("{}  ", indent));

        match container.body() {
            Some(body) => {
                let close = body
                    .close_offset()
                    .ok_or_else(|| OperationFailure::invalid("container block is not closed"))?;
                let line = line_start(source, close);
                if source[line..close].trim().is_empty() {
                    Ok(TextEdit::insert(line, format!("{}{}\n", child_indent, statement)))
                } else {
                    Ok(TextEdit::insert(
                        close,
                        format!("\n{}{}\n{}", child_indent, statement, indent),
                    ))
                }
            }
            None => Ok(TextEdit::insert(
                container.range().end,
                format!(" {{\n{}{}\n{}}}", child_indent, statement, indent),
            )),
        }
    }
}

fn clamp_size(size: Dimension) -> Dimension {
    Dimension::new(size.width.max(0.0), size.height.max(0.0))
}

/// Bare when it reads back as the same atom, quoted otherwise.
fn format_value(value: &str, was_quoted: bool) -> String {
    if !was_quoted && (is_identifier(value) || value.parse::<f64>().is_ok()) {
        value.to_string()
    } else {
        quote(value)
    }
}

fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |nl| nl + 1)
}

fn line_indent(source: &str, offset: usize) -> String {
    source[line_start(source, offset)..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

fn owns_line_start(source: &str, offset: usize) -> bool {
    source[line_start(source, offset)..offset].trim().is_empty()
}

/// Grow `range` to whole lines when nothing else shares them.
fn owned_lines(source: &str, range: TextRange) -> TextRange {
    let start = line_start(source, range.start);
    let end = source[range.end..]
        .find('\n')
        .map_or(source.len(), |nl| range.end + nl + 1);
    let trailing = source[range.end..end].trim();
    let trailing_ok = trailing.is_empty() || trailing == ";" || trailing.starts_with("//");
    if owns_line_start(source, range.start) && trailing_ok {
        TextRange::new(start, end)
    } else {
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ConversionContext;
    use crate::converter::convert;
    use crate::providers::default_providers;
    use tandem_parser::parse;

    struct Doc {
        source: String,
        config: DiagramTypeConfig,
        providers: Providers,
        registry: Registry,
        metadata: ModelMetadata,
        tree: SyntaxTree,
        index: IdIndex,
    }

    impl Doc {
        fn new(source: &str) -> Self {
            Self::with_config(source, DiagramTypeConfig::workflow())
        }

        fn with_config(source: &str, config: DiagramTypeConfig) -> Self {
            let providers = default_providers(&config);
            let mut doc = Doc {
                source: String::new(),
                providers,
                config,
                registry: Registry::new("/test.flow"),
                metadata: ModelMetadata::new(),
                tree: parse("").tree,
                index: IdIndex::default(),
            };
            doc.sync(source);
            doc
        }

        fn sync(&mut self, source: &str) {
            let output = parse(source);
            let mut ctx = ConversionContext::new(
                &self.config,
                &self.providers,
                &mut self.registry,
                &mut self.metadata,
            );
            self.index = convert(&output.tree, &mut ctx).index;
            self.tree = output.tree;
            self.source = source.to_string();
        }

        fn id(&self, name: &str) -> ElementId {
            let node = self
                .tree
                .preorder()
                .into_iter()
                .find(|n| n.name().is_some_and(|a| a.value == name))
                .unwrap();
            self.index.id_of(node.index()).unwrap().clone()
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

        fn edited(&self, applied: &Applied) -> String {
            apply_edits(&self.source, &applied.edits).unwrap()
        }
    }

    fn create(element_type: &str, location: Option<Point>, container_id: Option<ElementId>) -> DiagramOperation {
        DiagramOperation::CreateNode {
            element_type: element_type.to_string(),
            location,
            container_id,
        }
    }

    #[test]
    fn test_create_node_at_document_end() {
        let mut doc = Doc::new("task A");
        let applied = doc.apply(create("node:task", None, None)).unwrap();
        assert_eq!(doc.edited(&applied), "task A\ntask Task1\n");
    }

    #[test]
    fn test_create_node_inside_container() {
        let mut doc = Doc::new("activity Main {\n    task A\n}\n");
        let main = doc.id("Main");
        let applied = doc.apply(create("Task", None, Some(main))).unwrap();
        assert_eq!(
            doc.edited(&applied),
            "activity Main {\n    task A\n    task Task1\n}\n"
        );
    }

    #[test]
    fn test_create_node_in_inline_and_bodyless_containers() {
        let mut doc = Doc::new("activity X { task A }\nactivity Y\n");
        let x = doc.id("X");
        let applied = doc.apply(create("Event", None, Some(x))).unwrap();
        assert_eq!(
            doc.edited(&applied),
            "activity X { task A \n  event Event1\n}\nactivity Y\n"
        );

        let y = doc.id("Y");
        let applied = doc.apply(create("Task", None, Some(y))).unwrap();
        assert_eq!(
            doc.edited(&applied),
            "activity X { task A }\nactivity Y {\n  task Task1\n}\n"
        );
    }

    #[test]
    fn test_create_node_records_pending_layout() {
        let mut doc = Doc::new("activity Main {\n  task Task1\n}\n");
        let main = doc.id("Main");
        let applied = doc
            .apply(create("node:task", Some(Point::new(10.0, 20.0)), Some(main)))
            .unwrap();
        assert!(applied.metadata_changed);
        let pending = &doc.metadata.pending[r#"Document[0]/Activity:"Main"/Task:"Task2""#];
        assert_eq!(pending.position, Some(Point::new(10.0, 20.0)));
        assert_eq!(pending.size, Some(Dimension::new(120.0, 60.0)));
    }

    #[test]
    fn test_create_node_writes_position_when_layout_in_text() {
        let mut config = DiagramTypeConfig::workflow();
        config.layout_in_text = true;
        let mut doc = Doc::with_config("", config);
        let applied = doc
            .apply(create("node:task", Some(Point::new(10.5, 20.0)), None))
            .unwrap();
        assert_eq!(doc.edited(&applied), "task Task1 @at(10.5, 20)\n");
        assert!(doc.metadata.pending.is_empty());
    }

    #[test]
    fn test_create_node_failures_leave_state_alone() {
        let mut doc = Doc::new("task A\n");
        let a = doc.id("A");
        let before = doc.metadata.clone();

        let err = doc.apply(create("node:unknown", None, None)).unwrap_err();
        assert!(matches!(err, OperationFailure::Invalid(_)));

        let err = doc
            .apply(create("node:task", Some(Point::new(1.0, 1.0)), Some(a)))
            .unwrap_err();
        assert!(matches!(err, OperationFailure::Invalid(_)));

        let err = doc
            .apply(create("node:task", None, Some(ElementId::from("nope-1"))))
            .unwrap_err();
        assert_eq!(err, OperationFailure::NotFound(ElementId::from("nope-1")));
        assert_eq!(doc.metadata, before);
    }

    #[test]
    fn test_delete_removes_whole_line_and_cascades_edges() {
        let mut doc = Doc::new("task A\ntask B\nflow A -> B\ntask C\n");
        let b = doc.id("B");
        let applied = doc
            .apply(DiagramOperation::DeleteElement {
                element_ids: vec![b.clone()],
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task A\ntask C\n");
        assert_eq!(applied.invalidated.len(), 2);
        assert!(!doc.registry.contains(&b));
    }

    #[test]
    fn test_delete_nested_skips_contained_ranges() {
        let mut doc = Doc::new("activity Main {\n  task A\n}\ntask B\n");
        let main = doc.id("Main");
        let a = doc.id("A");
        let applied = doc
            .apply(DiagramOperation::DeleteElement {
                element_ids: vec![a.clone(), main.clone()],
            })
            .unwrap();
        assert_eq!(applied.edits.len(), 1);
        assert_eq!(doc.edited(&applied), "task B\n");
        assert!(!doc.registry.contains(&a));
        assert!(!doc.registry.contains(&main));
    }

    #[test]
    fn test_delete_inline_statement_keeps_neighbours() {
        let mut doc = Doc::new("task A; task B\n");
        let b = doc.id("B");
        let applied = doc
            .apply(DiagramOperation::DeleteElement {
                element_ids: vec![b],
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task A; \n");
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let mut doc = Doc::new("task A\n");
        let a = doc.id("A");
        let len = doc.registry.len();
        let err = doc
            .apply(DiagramOperation::DeleteElement {
                element_ids: vec![a.clone(), ElementId::from("gone-7")],
            })
            .unwrap_err();
        assert_eq!(err, OperationFailure::NotFound(ElementId::from("gone-7")));
        assert!(doc.registry.contains(&a));
        assert_eq!(doc.registry.len(), len);
    }

    #[test]
    fn test_invalidated_ids_are_not_found_before_resync() {
        let mut doc = Doc::new("task A\ntask B\ntask C\n");
        let b = doc.id("B");
        let delete = DiagramOperation::DeleteElement {
            element_ids: vec![b.clone()],
        };
        let applied = doc.apply(delete.clone()).unwrap();
        assert_eq!(doc.edited(&applied), "task A\ntask C\n");

        // The tree still holds B until the edited text is synced
        assert_eq!(doc.apply(delete).unwrap_err(), OperationFailure::NotFound(b.clone()));
        let err = doc
            .apply(DiagramOperation::EditLabel {
                label_id: b.label(),
                text: "B2".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, OperationFailure::NotFound(b.label()));
    }

    #[test]
    fn test_change_bounds_metadata_only() {
        let mut doc = Doc::new("task A\n");
        let a = doc.id("A");
        let applied = doc
            .apply(DiagramOperation::ChangeBounds {
                changes: vec![BoundsChange {
                    element_id: a.clone(),
                    new_position: Some(Point::new(5.0, 6.0)),
                    new_size: Some(Dimension::new(-1.0, 30.0)),
                }],
            })
            .unwrap();
        assert!(applied.edits.is_empty());
        assert_eq!(doc.metadata.position(&a), Some(Point::new(5.0, 6.0)));
        assert_eq!(doc.metadata.size(&a), Some(Dimension::new(0.0, 30.0)));
    }

    #[test]
    fn test_change_bounds_in_text() {
        let mut config = DiagramTypeConfig::workflow();
        config.layout_in_text = true;
        let mut doc = Doc::with_config("task A @at(1, 1)\n", config);
        let a = doc.id("A");
        let applied = doc
            .apply(DiagramOperation::ChangeBounds {
                changes: vec![BoundsChange {
                    element_id: a.clone(),
                    new_position: Some(Point::new(5.0, 6.0)),
                    new_size: Some(Dimension::new(100.0, 30.0)),
                }],
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task A @at(5, 6) @size(100, 30)\n");
        assert_eq!(doc.metadata.position(&a), None);
    }

    #[test]
    fn test_change_bounds_rejects_edges() {
        let mut doc = Doc::new("task A\ntask B\nflow A -> B\n");
        let flow = doc.index.id_of(doc.tree.preorder()[3].index()).unwrap().clone();
        let err = doc
            .apply(DiagramOperation::ChangeBounds {
                changes: vec![BoundsChange {
                    element_id: flow,
                    new_position: Some(Point::new(0.0, 0.0)),
                    new_size: None,
                }],
            })
            .unwrap_err();
        assert!(matches!(err, OperationFailure::Unsupported(_)));
    }

    #[test]
    fn test_create_edge_in_common_container() {
        let mut doc = Doc::new("activity Main {\n  task A\n  task \"B c\"\n}\n");
        let a = doc.id("A");
        let b = doc.id("B c");
        let applied = doc
            .apply(DiagramOperation::CreateEdge {
                element_type: "edge:flow".to_string(),
                source_id: a,
                target_id: b,
            })
            .unwrap();
        assert_eq!(
            doc.edited(&applied),
            "activity Main {\n  task A\n  task \"B c\"\n  flow A -> \"B c\"\n}\n"
        );
    }

    #[test]
    fn test_create_edge_across_containers_goes_to_root() {
        let mut doc = Doc::new("activity X { task A }\nactivity Y { task B }\n");
        let a = doc.id("A");
        let b = doc.id("B");
        let applied = doc
            .apply(DiagramOperation::CreateEdge {
                element_type: "Flow".to_string(),
                source_id: a,
                target_id: b,
            })
            .unwrap();
        assert!(doc.edited(&applied).ends_with("activity Y { task B }\nflow A -> B\n"));
    }

    #[test]
    fn test_create_edge_rejects_shadowed_names() {
        let mut doc = Doc::new("activity X { task A }\nactivity Y { task A }\ntask B\n");
        let second_a = doc
            .tree
            .preorder()
            .into_iter()
            .filter(|n| n.name().is_some_and(|a| a.value == "A"))
            .nth(1)
            .map(|n| doc.index.id_of(n.index()).unwrap().clone())
            .unwrap();
        let b = doc.id("B");
        let err = doc
            .apply(DiagramOperation::CreateEdge {
                element_type: "edge:flow".to_string(),
                source_id: second_a,
                target_id: b,
            })
            .unwrap_err();
        assert!(matches!(err, OperationFailure::Invalid(_)));
    }

    #[test]
    fn test_reconnect_replaces_only_endpoint_token() {
        let mut doc = Doc::new("task A\ntask B\ntask C\nflow A -> \"B\"\n");
        let flow = doc.index.id_of(doc.tree.preorder()[4].index()).unwrap().clone();
        let c = doc.id("C");
        let applied = doc
            .apply(DiagramOperation::ReconnectEdge {
                edge_id: flow,
                new_source_id: None,
                new_target_id: Some(c),
            })
            .unwrap();
        assert_eq!(applied.edits.len(), 1);
        assert_eq!(doc.edited(&applied), "task A\ntask B\ntask C\nflow A -> \"C\"\n");
    }

    #[test]
    fn test_edit_label_preserves_quoting() {
        let mut doc = Doc::new("task \"Review\"\ntask Plain\n");
        let review = doc.id("Review");
        let applied = doc
            .apply(DiagramOperation::EditLabel {
                label_id: review.label(),
                text: "Ship it".to_string(),
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task \"Ship it\"\ntask Plain\n");

        let plain = doc.id("Plain");
        let applied = doc
            .apply(DiagramOperation::EditLabel {
                label_id: plain.label(),
                text: "Still_plain".to_string(),
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task \"Review\"\ntask Still_plain\n");

        let applied = doc
            .apply(DiagramOperation::EditLabel {
                label_id: plain.label(),
                text: "two words".to_string(),
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task \"Review\"\ntask \"two words\"\n");
    }

    #[test]
    fn test_edit_label_updates_edge_references() {
        let mut doc = Doc::new("task A\ntask B\nflow A -> B\n");
        let a = doc.id("A");
        let applied = doc
            .apply(DiagramOperation::EditLabel {
                label_id: a.label(),
                text: "Start".to_string(),
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task Start\ntask B\nflow Start -> B\n");
    }

    #[test]
    fn test_update_property_replace_and_insert() {
        let mut doc = Doc::new("task A {\n  owner: bob\n}\ntask B\n");
        let a = doc.id("A");
        let b = doc.id("B");
        let applied = doc
            .apply(DiagramOperation::UpdateProperty {
                element_ids: vec![a, b],
                property: "owner".to_string(),
                value: "Alice Smith".to_string(),
            })
            .unwrap();
        assert_eq!(
            doc.edited(&applied),
            "task A {\n  owner: \"Alice Smith\"\n}\ntask B {\n  owner: \"Alice Smith\"\n}\n"
        );
    }

    #[test]
    fn test_update_property_name_renames() {
        let mut doc = Doc::new("task A\n");
        let a = doc.id("A");
        let applied = doc
            .apply(DiagramOperation::UpdateProperty {
                element_ids: vec![a],
                property: "name".to_string(),
                value: "A2".to_string(),
            })
            .unwrap();
        assert_eq!(doc.edited(&applied), "task A2\n");
    }

    #[test]
    fn test_owned_lines() {
        let source = "task A\n  task B; \ntask C // note\nx task D\n";
        let b = source.find("task B").unwrap();
        assert_eq!(
            owned_lines(source, TextRange::new(b, b + 6)),
            TextRange::new(7, 18)
        );
        let c = source.find("task C").unwrap();
        assert_eq!(owned_lines(source, TextRange::new(c, c + 6)).end, c + 15);
        let d = source.find("task D").unwrap();
        assert_eq!(
            owned_lines(source, TextRange::new(d, d + 6)),
            TextRange::new(d, d + 6)
        );
    }
}
