//! Per-document state owned by the orchestrator

use std::collections::HashSet;
use tandem_editor::{
    apply, convert, providers, ApplyContext, ConversionContext, ConversionOutput, DiagramTypeConfig,
    IdIndex, OperationResult, Providers,
};
use tandem_identity::{ElementId, Registry};
use tandem_model::{
    DiagramModelRoot, DiagramOperation, LayoutRecord, Marker, ModelMetadata, ValidationReport,
};
use tandem_parser::parse;
use tandem_syntax::{apply_edits, has_errors, Diagnostic, EditError, SyntaxTree, TextEdit};
use tokio_util::sync::CancellationToken;

/// What a conversion needs besides the document itself
pub struct Pipeline<'a> {
    pub config: &'a DiagramTypeConfig,
    pub providers: &'a Providers,
    pub cancel: CancellationToken,
}

impl<'a> Pipeline<'a> {
    /// Pipeline that is never cancelled, for one-shot use.
    pub fn new(config: &'a DiagramTypeConfig, providers: &'a Providers) -> Self {
        Self {
            config,
            providers,
            cancel: CancellationToken::new(),
        }
    }

    fn context<'d>(
        &self,
        uri: &str,
        revision: u64,
        registry: &'d mut Registry,
        metadata: &'d mut ModelMetadata,
    ) -> ConversionContext<'d>
    where
        'a: 'd,
    {
        ConversionContext::new(self.config, self.providers, registry, metadata)
            .with_cancel(self.cancel.child_token())
            .with_revision(revision)
            .with_root_id(uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Converted,
    /// Version not newer than the current one
    Stale,
    Cancelled,
}

/// Text, tree, ids and layout of one open document
pub struct DocumentState {
    pub uri: String,
    pub source: String,
    pub version: i64,
    /// Bumped by every completed conversion
    pub revision: u64,
    pub tree: SyntaxTree,
    pub diagnostics: Vec<Diagnostic>,
    pub index: IdIndex,
    pub model: DiagramModelRoot,
    pub registry: Registry,
    pub metadata: ModelMetadata,
    /// Edits were handed out and the text they produce has not been synced
    pub awaiting_sync: bool,
}

/// A document as it would look after some edits, converted against copies
/// of the registry and metadata.
pub struct Preview {
    pub source: String,
    pub tree: SyntaxTree,
    pub conversion: ConversionOutput,
}

impl DocumentState {
    /// Unconverted state; call [`DocumentState::refresh`] before use.
    pub fn new(uri: &str, source: &str, version: i64, root_type: &str) -> Self {
        let output = parse(source);
        Self {
            uri: uri.to_string(),
            source: source.to_string(),
            version,
            revision: 0,
            tree: output.tree,
            diagnostics: output.diagnostics,
            index: IdIndex::default(),
            model: DiagramModelRoot::new(uri, root_type, 0),
            registry: Registry::new(uri),
            metadata: ModelMetadata::new(),
            awaiting_sync: false,
        }
    }

    /// Restore ids and layout saved by an earlier session.
    pub fn restore(&mut self, record: &LayoutRecord) {
        let report = self.registry.import_state(record.registry_state());
        self.metadata = record.metadata();
        if !report.skipped.is_empty() {
            tracing::warn!(uri = %self.uri, skipped = report.skipped.len(), "ignored inconsistent saved ids");
        }
        tracing::debug!(uri = %self.uri, imported = report.imported, "restored layout record");
    }

    pub fn capture(&self) -> LayoutRecord {
        LayoutRecord::capture(&self.uri, &self.metadata, self.registry.export_state())
    }

    /// Reconvert the current tree, e.g. after a metadata-only change.
    pub fn refresh(&mut self, pipeline: &Pipeline<'_>) -> SyncOutcome {
        let output = {
            let mut ctx =
                pipeline.context(&self.uri, self.revision + 1, &mut self.registry, &mut self.metadata);
            convert(&self.tree, &mut ctx)
        };
        if output.cancelled {
            return SyncOutcome::Cancelled;
        }
        self.revision += 1;
        self.index = output.index;
        self.model = output.model;
        SyncOutcome::Converted
    }

    /// Replace the text and reconvert. Older or equal versions are ignored.
    ///
    /// After a parse without errors, registry entries and layout for ids that
    /// no longer appear are dropped.
    pub fn sync(&mut self, content: &str, version: i64, pipeline: &Pipeline<'_>) -> SyncOutcome {
        if version <= self.version && self.revision > 0 {
            tracing::debug!(uri = %self.uri, version, current = self.version, "ignoring stale sync");
            return SyncOutcome::Stale;
        }

        let parsed = parse(content);
        let output = {
            let mut ctx =
                pipeline.context(&self.uri, self.revision + 1, &mut self.registry, &mut self.metadata);
            convert(&parsed.tree, &mut ctx)
        };
        if output.cancelled {
            tracing::debug!(uri = %self.uri, version, "sync cancelled, keeping previous tree");
            return SyncOutcome::Cancelled;
        }

        if !has_errors(&parsed.diagnostics) {
            let live: HashSet<ElementId> = output.index.ids().cloned().collect();
            let dropped = self.registry.retain(&live);
            self.metadata.retain_ids(|id| live.contains(id));
            if !dropped.is_empty() {
                tracing::debug!(uri = %self.uri, dropped = dropped.len(), "dropped stale ids");
            }
        }

        self.source = content.to_string();
        self.version = version;
        self.revision += 1;
        self.tree = parsed.tree;
        self.diagnostics = parsed.diagnostics;
        self.index = output.index;
        self.model = output.model;
        self.awaiting_sync = false;
        SyncOutcome::Converted
    }

    /// Apply `operation` to the current tree. Once it yields edits the
    /// document waits for them to come back through [`DocumentState::sync`].
    pub fn apply(&mut self, operation: &DiagramOperation, pipeline: &Pipeline<'_>) -> OperationResult {
        let applied = apply(
            operation,
            ApplyContext {
                tree: &self.tree,
                source: &self.source,
                config: pipeline.config,
                providers: pipeline.providers,
                registry: &mut self.registry,
                metadata: &mut self.metadata,
                index: &self.index,
            },
        )?;
        if !applied.edits.is_empty() {
            self.awaiting_sync = true;
        }
        Ok(applied)
    }

    /// Parse diagnostics followed by those of the `validation` hook.
    pub fn check(&self, pipeline: &Pipeline<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics.clone();
        if let Some(hook) = providers::validation(pipeline.providers) {
            diagnostics.extend(hook.validate(&self.tree, pipeline.config));
        }
        diagnostics
    }

    /// [`DocumentState::check`] as markers on diagram elements.
    pub fn validate(&self, pipeline: &Pipeline<'_>) -> ValidationReport {
        let markers = self
            .check(pipeline)
            .iter()
            .map(|diagnostic| Marker::from_diagnostic(diagnostic, self.marker_target(diagnostic)))
            .collect();
        ValidationReport::new(markers)
    }

    /// Element a diagnostic belongs to: its node, or the innermost converted
    /// node around its start.
    fn marker_target(&self, diagnostic: &Diagnostic) -> Option<ElementId> {
        if let Some(id) = diagnostic.node.and_then(|node| self.index.id_of(node)) {
            return Some(id.clone());
        }
        let node = self.tree.node_at(diagnostic.range.start);
        std::iter::once(node)
            .chain(node.ancestors())
            .filter(|n| n.parent().is_some())
            .find_map(|n| self.index.id_of(n.index()).cloned())
    }

    /// Convert the text `edits` would produce without committing anything.
    pub fn preview(&self, edits: &[TextEdit], pipeline: &Pipeline<'_>) -> Result<Preview, EditError> {
        let source = apply_edits(&self.source, edits)?;
        let parsed = parse(&source);
        let mut registry = self.registry.clone();
        let mut metadata = self.metadata.clone();
        let conversion = {
            let mut ctx = pipeline.context(&self.uri, self.revision + 1, &mut registry, &mut metadata);
            convert(&parsed.tree, &mut ctx)
        };
        Ok(Preview {
            source,
            tree: parsed.tree,
            conversion,
        })
    }
}
