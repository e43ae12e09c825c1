//! # Synchronization orchestrator
//!
//! One [`Workspace`] serves many documents. Each document lives behind its own
//! async mutex, so requests against one document run one at a time while
//! documents stay independent.
//!
//! ```text
//! diagram op ─→ executeOperation ─→ edits ─→ text editor
//!                                              │
//! model ←── convert ←── parse ←── syncDocument ┘
//! ```
//!
//! Every public method returns a response value. Errors become
//! `{success: false, error}`; a panic inside a request becomes
//! `"internal error"`.

use crate::config::{ConfigError, WorkspaceConfig};
use crate::document::{DocumentState, Pipeline, SyncOutcome};
use crate::protocol::*;
use crate::store::{JsonFileLayoutStore, LayoutStore, MemoryLayoutStore, StoreError};
use futures::FutureExt;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tandem_editor::{
    context_menu_items, property_sheet, providers, DiagramTypeConfig, OperationFailure, Providers,
};
use tandem_identity::{ElementId, Fingerprint, RegistryState};
use tandem_model::{DiagramOperation, ValidationReport};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

pub type DocumentHandle = Arc<Mutex<DocumentState>>;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Announced after a document's model changed outside of a request that
/// already returned it, e.g. after the file changed on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUpdate {
    pub document_uri: String,
    pub version: i64,
    pub revision: u64,
    pub timestamp: i64,
}

impl ModelUpdate {
    fn of(doc: &DocumentState) -> Self {
        Self {
            document_uri: doc.uri.clone(),
            version: doc.version,
            revision: doc.revision,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Document '{0}' is not open")]
    NotOpen(String),

    #[error("Failed to read document '{uri}': {source}")]
    Read {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Operation(#[from] OperationFailure),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} is disabled")]
    Disabled(&'static str),

    #[error("Document '{0}' has edits awaiting syncDocument")]
    AwaitingSync(String),

    #[error("Conversion was cancelled")]
    Cancelled,

    #[error("internal error")]
    Internal,
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

pub struct Workspace {
    config: DiagramTypeConfig,
    providers: Providers,
    store: Arc<dyn LayoutStore>,
    documents: RwLock<HashMap<String, DocumentHandle>>,
    updates: broadcast::Sender<ModelUpdate>,
    shutdown: CancellationToken,
}

impl Workspace {
    pub fn new(config: DiagramTypeConfig, providers: Providers, store: Arc<dyn LayoutStore>) -> Self {
        Self {
            config,
            providers,
            store,
            documents: RwLock::new(HashMap::new()),
            updates: broadcast::channel(UPDATE_CHANNEL_CAPACITY).0,
            shutdown: CancellationToken::new(),
        }
    }

    /// Workspace with the effective providers and layout store of `config`.
    pub fn from_config(config: &WorkspaceConfig) -> WorkspaceResult<Self> {
        let merged = config.providers(None)?;
        let store: Arc<dyn LayoutStore> = match &config.layout_dir {
            Some(dir) => Arc::new(JsonFileLayoutStore::new(dir)),
            None => Arc::new(MemoryLayoutStore::new()),
        };
        tracing::info!(
            diagram_type = %config.diagram_type.id,
            disabled = merged.disabled_features.len(),
            "workspace ready"
        );
        Ok(Self::new(config.diagram_type.clone(), merged.providers, store))
    }

    pub fn config(&self) -> &DiagramTypeConfig {
        &self.config
    }

    /// Cancel conversions in flight; later requests convert nothing.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelUpdate> {
        self.updates.subscribe()
    }

    fn announce(&self, doc: &DocumentState) {
        // No subscribers is fine
        let _ = self.updates.send(ModelUpdate::of(doc));
    }

    /// Re-read an open document after its file changed on disk.
    ///
    /// Returns whether the model changed. Unopened files and content equal to
    /// the current text are ignored.
    pub async fn reload_from_disk(&self, path: &std::path::Path) -> WorkspaceResult<bool> {
        let uri = path_to_uri(path);
        let Ok(handle) = self.handle(&uri).await else {
            return Ok(false);
        };
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| WorkspaceError::Read {
                uri: uri.clone(),
                source,
            })?;

        let mut doc = handle.lock().await;
        if doc.source == content {
            return Ok(false);
        }
        let version = doc.version + 1;
        match doc.sync(&content, version, &self.pipeline()) {
            SyncOutcome::Converted => {
                tracing::info!(uri = %uri, version, "reloaded from disk");
                self.announce(&doc);
                Ok(true)
            }
            SyncOutcome::Stale => Ok(false),
            SyncOutcome::Cancelled => Err(WorkspaceError::Cancelled),
        }
    }

    pub async fn open_documents(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.documents.read().await.keys().cloned().collect();
        uris.sort();
        uris
    }

    pub async fn document_version(&self, uri: &str) -> Option<i64> {
        let handle = self.documents.read().await.get(uri).cloned()?;
        let doc = handle.lock().await;
        Some(doc.version)
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            config: &self.config,
            providers: &self.providers,
            cancel: self.shutdown.child_token(),
        }
    }

    async fn handle(&self, uri: &str) -> WorkspaceResult<DocumentHandle> {
        self.documents
            .read()
            .await
            .get(uri)
            .cloned()
            .ok_or_else(|| WorkspaceError::NotOpen(uri.to_string()))
    }

    /// Open documents are used as they are; otherwise `file://` URIs are read
    /// from disk.
    async fn handle_or_load(&self, uri: &str) -> WorkspaceResult<DocumentHandle> {
        if let Ok(handle) = self.handle(uri).await {
            return Ok(handle);
        }
        let path = uri_to_path(uri);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| WorkspaceError::Read {
                uri: uri.to_string(),
                source,
            })?;
        self.open(uri, &content, 0).await
    }

    async fn open(&self, uri: &str, content: &str, version: i64) -> WorkspaceResult<DocumentHandle> {
        let mut doc = DocumentState::new(uri, content, version, &self.config.root_type);
        match self.store.load(uri) {
            Ok(Some(record)) => doc.restore(&record),
            Ok(None) => {}
            Err(e) => tracing::warn!(uri, error = %e, "ignoring unreadable layout record"),
        }
        if doc.refresh(&self.pipeline()) == SyncOutcome::Cancelled {
            return Err(WorkspaceError::Cancelled);
        }

        let handle = Arc::new(Mutex::new(doc));
        let mut documents = self.documents.write().await;
        // A concurrent open of the same document wins if it got here first
        let handle = documents.entry(uri.to_string()).or_insert(handle).clone();
        tracing::debug!(uri, version, "opened document");
        Ok(handle)
    }

    async fn guarded<T, F>(&self, method: &'static str, request: F) -> T
    where
        T: Failure,
        F: Future<Output = WorkspaceResult<T>>,
    {
        match AssertUnwindSafe(request).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::debug!(method, error = %e, "request failed");
                T::failure(e.to_string())
            }
            Err(_) => {
                tracing::error!(method, "request panicked");
                T::failure(WorkspaceError::Internal.to_string())
            }
        }
    }

    // RPC surface

    pub async fn open_document(&self, uri: &str, content: &str, version: i64) -> AckResponse {
        self.guarded("openDocument", async {
            let handle = self.handle(uri).await;
            match handle {
                Ok(handle) => {
                    let outcome = handle.lock().await.sync(content, version, &self.pipeline());
                    if outcome == SyncOutcome::Cancelled {
                        return Err(WorkspaceError::Cancelled);
                    }
                }
                Err(_) => {
                    self.open(uri, content, version).await?;
                }
            }
            Ok(AckResponse::ok())
        })
        .await
    }

    pub async fn close_document(&self, uri: &str) -> AckResponse {
        self.guarded("closeDocument", async {
            self.documents
                .write()
                .await
                .remove(uri)
                .ok_or_else(|| WorkspaceError::NotOpen(uri.to_string()))?;
            tracing::debug!(uri, "closed document");
            Ok(AckResponse::ok())
        })
        .await
    }

    pub async fn load_model(
        &self,
        uri: &str,
        saved_id_map: Option<BTreeMap<String, ElementId>>,
        saved_fingerprints: Option<BTreeMap<ElementId, Fingerprint>>,
    ) -> LoadModelResponse {
        self.guarded("loadModel", async {
            let handle = self.handle_or_load(uri).await?;
            let mut doc = handle.lock().await;
            if let Some(id_map) = saved_id_map {
                let state = RegistryState {
                    id_map,
                    fingerprints: saved_fingerprints.unwrap_or_default(),
                };
                let report = doc.registry.import_state(state);
                tracing::debug!(uri, imported = report.imported, skipped = report.skipped.len(), "imported saved ids");
                if doc.refresh(&self.pipeline()) == SyncOutcome::Cancelled {
                    return Err(WorkspaceError::Cancelled);
                }
            }
            Ok(LoadModelResponse::of(&doc))
        })
        .await
    }

    pub async fn save_model(&self, uri: &str) -> AckResponse {
        self.guarded("saveModel", async {
            let record = self.handle(uri).await?.lock().await.capture();
            self.store.save(&record)?;
            Ok(AckResponse::ok())
        })
        .await
    }

    pub async fn execute_operation(&self, uri: &str, operation: DiagramOperation) -> ExecuteOperationResponse {
        self.guarded("executeOperation", async {
            let handle = self.handle(uri).await?;
            let mut doc = handle.lock().await;
            ensure_synced(&doc)?;
            let pipeline = self.pipeline();
            let applied = doc.apply(&operation, &pipeline)?;

            let updated_model = if applied.edits.is_empty() {
                // Nothing for the editor to send back; the change is live now
                if doc.refresh(&pipeline) == SyncOutcome::Cancelled {
                    return Err(WorkspaceError::Cancelled);
                }
                doc.model.clone()
            } else {
                let preview = doc
                    .preview(&applied.edits, &pipeline)
                    .map_err(|e| OperationFailure::Invalid(e.to_string()))?;
                preview.conversion.model
            };

            Ok(ExecuteOperationResponse {
                success: true,
                error: None,
                edits: Some(applied.edits),
                updated_model: Some(updated_model),
            })
        })
        .await
    }

    /// Run the layout engine and store its result as the document layout.
    pub async fn request_layout(&self, uri: &str, options: Option<tandem_features::LayoutOptions>) -> LayoutResponse {
        self.guarded("requestLayout", async {
            let (engine, defaults) =
                providers::layout(&self.providers).ok_or(WorkspaceError::Disabled("layout"))?;
            let options = match &options {
                Some(custom) => defaults.merged_with(custom),
                None => defaults.clone(),
            };

            let handle = self.handle(uri).await?;
            let mut doc = handle.lock().await;
            ensure_synced(&doc)?;
            let result = engine.layout(&doc.model, &options);
            let previous = doc.metadata.clone();
            for (id, position) in &result.positions {
                doc.metadata.set_position(id.clone(), *position);
            }
            for (id, size) in &result.sizes {
                doc.metadata.set_size(id.clone(), *size);
            }
            for (id, points) in &result.routing_points {
                doc.metadata.routing_points.insert(id.clone(), points.clone());
            }
            if doc.refresh(&self.pipeline()) == SyncOutcome::Cancelled {
                doc.metadata = previous;
                return Err(WorkspaceError::Cancelled);
            }

            Ok(LayoutResponse {
                positions: result.positions,
                sizes: result.sizes,
                routing_points: result.routing_points,
                bounds: result.bounds,
                error: None,
            })
        })
        .await
    }

    pub async fn get_tool_palette(&self, uri: &str) -> ToolPaletteResponse {
        self.guarded("getToolPalette", async {
            self.handle(uri).await?;
            let palette = providers::tool_palette(&self.providers)
                .ok_or(WorkspaceError::Disabled("toolPalette"))?;
            Ok(ToolPaletteResponse {
                groups: palette.groups.clone().unwrap_or_default(),
                error: None,
            })
        })
        .await
    }

    pub async fn get_context_menu(
        &self,
        uri: &str,
        selected_ids: &[ElementId],
        _position: Option<tandem_model::Point>,
    ) -> ContextMenuResponse {
        self.guarded("getContextMenu", async {
            let handle = self.handle(uri).await?;
            let menu = providers::context_menu(&self.providers)
                .ok_or(WorkspaceError::Disabled("contextMenu"))?;
            let doc = handle.lock().await;
            Ok(ContextMenuResponse {
                items: context_menu_items(menu, selected_ids, &doc.model, &self.config),
                error: None,
            })
        })
        .await
    }

    /// Parse diagnostics plus the `validation` hook, as markers on elements.
    pub async fn validate(&self, uri: &str) -> ValidationReport {
        self.guarded("validate", async {
            let handle = self.handle(uri).await?;
            let doc = handle.lock().await;
            Ok(doc.validate(&self.pipeline()))
        })
        .await
    }

    /// Re-entry point after the text editor changed the document.
    pub async fn sync_document(&self, uri: &str, content: &str, version: i64) -> AckResponse {
        self.guarded("syncDocument", async {
            match self.handle(uri).await {
                Ok(handle) => {
                    let mut doc = handle.lock().await;
                    match doc.sync(content, version, &self.pipeline()) {
                        SyncOutcome::Converted => self.announce(&doc),
                        SyncOutcome::Stale => {}
                        SyncOutcome::Cancelled => return Err(WorkspaceError::Cancelled),
                    }
                }
                Err(_) => {
                    self.open(uri, content, version).await?;
                }
            }
            Ok(AckResponse::ok())
        })
        .await
    }

    pub async fn get_properties(&self, uri: &str, element_ids: &[ElementId]) -> PropertiesResponse {
        self.guarded("getProperties", async {
            let handle = self.handle(uri).await?;
            let doc = handle.lock().await;
            let sheet = property_sheet(&doc.tree, &doc.index, &self.config, element_ids);
            Ok(PropertiesResponse {
                success: true,
                properties: sheet.properties,
                type_label: sheet.type_label,
                is_multi_select: sheet.is_multi_select,
                error: None,
            })
        })
        .await
    }

    /// Edits for the property change, with the sheet as it will read once the
    /// editor applies them.
    pub async fn update_property(
        &self,
        uri: &str,
        element_ids: &[ElementId],
        property: &str,
        value: &str,
    ) -> UpdatePropertyResponse {
        self.guarded("updateProperty", async {
            let handle = self.handle(uri).await?;
            let mut doc = handle.lock().await;
            ensure_synced(&doc)?;
            let pipeline = self.pipeline();
            let operation = DiagramOperation::UpdateProperty {
                element_ids: element_ids.to_vec(),
                property: property.to_string(),
                value: value.to_string(),
            };
            let applied = doc.apply(&operation, &pipeline)?;
            let preview = doc
                .preview(&applied.edits, &pipeline)
                .map_err(|e| OperationFailure::Invalid(e.to_string()))?;
            let sheet = property_sheet(&preview.tree, &preview.conversion.index, &self.config, element_ids);

            Ok(UpdatePropertyResponse {
                success: true,
                edits: Some(applied.edits),
                properties: Some(sheet.properties),
                error: None,
            })
        })
        .await
    }

    pub async fn set_collapsed(&self, uri: &str, element_id: &ElementId, collapsed: bool) -> LoadModelResponse {
        self.guarded("setCollapsed", async {
            let handle = self.handle(uri).await?;
            let mut doc = handle.lock().await;
            ensure_synced(&doc)?;
            if !doc.index.contains(element_id) {
                return Err(OperationFailure::NotFound(element_id.clone()).into());
            }
            doc.metadata.set_collapsed(element_id.clone(), collapsed);
            if doc.refresh(&self.pipeline()) == SyncOutcome::Cancelled {
                return Err(WorkspaceError::Cancelled);
            }
            Ok(LoadModelResponse::of(&doc))
        })
        .await
    }
}

/// Fails while edits handed out earlier have not come back through
/// `syncDocument`.
fn ensure_synced(doc: &DocumentState) -> WorkspaceResult<()> {
    if doc.awaiting_sync {
        return Err(WorkspaceError::AwaitingSync(doc.uri.clone()));
    }
    Ok(())
}

pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

pub fn path_to_uri(path: &std::path::Path) -> String {
    format!("file://{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::from_config(&WorkspaceConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_document_reports_error() {
        let ws = workspace();
        let response = ws.get_properties("file:///missing.flow", &[]).await;
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Document 'file:///missing.flow' is not open")
        );
    }

    #[tokio::test]
    async fn test_validate_maps_markers_to_elements() {
        let ws = workspace();
        ws.open_document("file:///v.flow", "task A\nflow A -> Missing\n", 1).await;
        let report = ws.validate("file:///v.flow").await;
        assert!(!report.markers.is_empty());
        assert!(report.markers.iter().all(|m| m.element_id.is_some()));
    }

    #[tokio::test]
    async fn test_disabled_palette() {
        let config = WorkspaceConfig {
            disabled_features: vec!["toolPalette".to_string()],
            ..Default::default()
        };
        let ws = Workspace::from_config(&config).unwrap();
        ws.open_document("file:///p.flow", "", 1).await;
        let response = ws.get_tool_palette("file:///p.flow").await;
        assert!(response.groups.is_empty());
        assert_eq!(response.error.as_deref(), Some("toolPalette is disabled"));
    }

    #[tokio::test]
    async fn test_panics_become_internal_errors() {
        let ws = workspace();
        let response: AckResponse = ws
            .guarded("test", async {
                if ws.config().id.is_empty() {
                    return Ok(AckResponse::ok());
                }
                panic!("boom")
            })
            .await;
        assert_eq!(response, AckResponse::failure("internal error".to_string()));
    }

    #[tokio::test]
    async fn test_sync_announces_update() {
        let ws = workspace();
        let mut updates = ws.subscribe();
        ws.sync_document("file:///u.flow", "task A\n", 1).await;
        ws.sync_document("file:///u.flow", "task A\ntask B\n", 2).await;

        let update = updates.recv().await.unwrap();
        assert_eq!(update.document_uri, "file:///u.flow");
        assert_eq!(update.version, 2);
    }

    #[tokio::test]
    async fn test_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.flow");
        std::fs::write(&path, "task A\n").unwrap();
        let uri = path_to_uri(&path);

        let ws = workspace();
        assert!(!ws.reload_from_disk(&path).await.unwrap());
        ws.open_document(&uri, "task A\n", 1).await;
        assert!(!ws.reload_from_disk(&path).await.unwrap());

        std::fs::write(&path, "task A\ntask B\n").unwrap();
        assert!(ws.reload_from_disk(&path).await.unwrap());
        assert_eq!(ws.document_version(&uri).await, Some(2));
    }

    #[tokio::test]
    async fn test_cancelled_layout_keeps_previous_metadata() {
        let ws = workspace();
        ws.open_document("file:///l.flow", "task A\ntask B\n", 1).await;
        ws.shutdown();

        let response = ws.request_layout("file:///l.flow", None).await;
        assert_eq!(response.error.as_deref(), Some("Conversion was cancelled"));
        assert!(response.positions.is_empty());

        let handle = ws.handle("file:///l.flow").await.unwrap();
        assert!(handle.lock().await.metadata.positions.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_reopen_is_reported() {
        let ws = workspace();
        assert!(ws.open_document("file:///o.flow", "task A\n", 1).await.success);
        ws.shutdown();

        let response = ws.open_document("file:///o.flow", "task A\ntask B\n", 2).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Conversion was cancelled"));
        assert_eq!(ws.document_version("file:///o.flow").await, Some(1));
    }

    #[test]
    fn test_uri_paths() {
        assert_eq!(uri_to_path("file:///tmp/a.flow"), PathBuf::from("/tmp/a.flow"));
        assert_eq!(path_to_uri(std::path::Path::new("/tmp/a.flow")), "file:///tmp/a.flow");
    }
}
