//! Per-request conversion state

use crate::config::DiagramTypeConfig;
use crate::providers::{self, Providers};
use std::collections::{BTreeMap, HashMap};
use tandem_identity::{ElementId, Registry};
use tandem_model::{Dimension, ModelMetadata, PendingLayout, Point};
use tandem_syntax::{NodeIndex, NodeRef, SyntaxTree};
use tokio_util::sync::CancellationToken;

/// Everything a conversion needs. Built per request by the orchestrator; the
/// registry and metadata are borrowed from the document state.
pub struct ConversionContext<'a> {
    pub config: &'a DiagramTypeConfig,
    pub providers: &'a Providers,
    pub registry: &'a mut Registry,
    pub metadata: &'a mut ModelMetadata,
    pub cancel: CancellationToken,
    /// Revision stamped on the produced model root
    pub revision: u64,
    /// Id of the produced model root, usually the document uri
    pub root_id: String,
}

impl<'a> ConversionContext<'a> {
    pub fn new(
        config: &'a DiagramTypeConfig,
        providers: &'a Providers,
        registry: &'a mut Registry,
        metadata: &'a mut ModelMetadata,
    ) -> Self {
        Self {
            config,
            providers,
            registry,
            metadata,
            cancel: CancellationToken::new(),
            revision: 0,
            root_id: "root".to_string(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }
}

/// Node ↔ id mapping produced by one conversion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdIndex {
    by_id: HashMap<ElementId, NodeIndex>,
    by_node: HashMap<NodeIndex, ElementId>,
}

impl IdIndex {
    pub fn insert(&mut self, id: ElementId, node: NodeIndex) {
        self.by_node.insert(node, id.clone());
        self.by_id.insert(id, node);
    }

    pub fn id_of(&self, node: NodeIndex) -> Option<&ElementId> {
        self.by_node.get(&node)
    }

    pub fn node_of(&self, id: &ElementId) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ElementId> {
        self.by_id.keys()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Read-only view handed to the `convertModel` hook
pub struct ConversionScope<'a> {
    pub tree: &'a SyntaxTree,
    pub config: &'a DiagramTypeConfig,
    pub providers: &'a Providers,
    pub metadata: &'a ModelMetadata,
    pub index: &'a IdIndex,
    /// Pending layout claimed by ids minted in this pass
    pub adopted: &'a BTreeMap<ElementId, PendingLayout>,
    pub cancel: &'a CancellationToken,
}

impl<'a> ConversionScope<'a> {
    pub fn id_of(&self, node: NodeRef<'_>) -> Option<&'a ElementId> {
        self.index.id_of(node.index())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stored layout first, then pending layout, then the source hint.
    pub fn position_of(&self, node: NodeRef<'_>, id: &ElementId) -> Option<Point> {
        self.metadata
            .position(id)
            .or_else(|| self.adopted.get(id).and_then(|p| p.position))
            .or_else(|| providers::get_position(self.providers).and_then(|hook| hook.get_position(node)))
    }

    pub fn size_of(&self, node: NodeRef<'_>, id: &ElementId) -> Option<Dimension> {
        self.metadata
            .size(id)
            .or_else(|| self.adopted.get(id).and_then(|p| p.size))
            .or_else(|| providers::get_size(self.providers).and_then(|hook| hook.get_size(node)))
    }

    pub fn is_collapsed(&self, id: &ElementId) -> bool {
        self.metadata.is_collapsed(id)
    }
}
