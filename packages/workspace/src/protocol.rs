//! JSON request and response shapes of the RPC surface

use crate::document::DocumentState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tandem_editor::PropertyEntry;
use tandem_features::{LayoutOptions, MenuItem, PaletteGroup};
use tandem_identity::{ElementId, Fingerprint};
use tandem_model::{Bounds, DiagramModelRoot, DiagramOperation, Dimension, Point};
use tandem_syntax::{TextEdit, TextRange};

// Requests

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDocumentParams {
    pub document_uri: String,
    pub content: String,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParams {
    pub document_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModelParams {
    pub document_uri: String,
    #[serde(default)]
    pub saved_id_map: Option<BTreeMap<String, ElementId>>,
    #[serde(default)]
    pub saved_fingerprints: Option<BTreeMap<ElementId, Fingerprint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOperationParams {
    pub document_uri: String,
    pub operation: DiagramOperation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLayoutParams {
    pub document_uri: String,
    #[serde(default)]
    pub options: Option<LayoutOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenuParams {
    pub document_uri: String,
    #[serde(default)]
    pub selected_ids: Vec<ElementId>,
    #[serde(default)]
    pub position: Option<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDocumentParams {
    pub document_uri: String,
    pub content: String,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesParams {
    pub document_uri: String,
    pub element_ids: Vec<ElementId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyParams {
    pub document_uri: String,
    pub element_ids: Vec<ElementId>,
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCollapsedParams {
    pub document_uri: String,
    pub element_id: ElementId,
    pub collapsed: bool,
}

// Responses

/// Failure shape shared by every response
pub trait Failure: Sized {
    fn failure(error: String) -> Self;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }
}

impl Failure for AckResponse {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }
}

/// Layout and identity state sent with a model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadataPayload {
    pub positions: BTreeMap<ElementId, Point>,
    pub sizes: BTreeMap<ElementId, Dimension>,
    pub routing_points: BTreeMap<ElementId, Vec<Point>>,
    pub source_ranges: BTreeMap<ElementId, TextRange>,
    pub id_map: BTreeMap<String, ElementId>,
    pub fingerprints: BTreeMap<ElementId, Fingerprint>,
}

impl ModelMetadataPayload {
    pub fn of(doc: &DocumentState) -> Self {
        let identity = doc.registry.export_state();
        Self {
            positions: doc.metadata.positions.clone(),
            sizes: doc.metadata.sizes.clone(),
            routing_points: doc.metadata.routing_points.clone(),
            source_ranges: doc.metadata.source_ranges.clone(),
            id_map: identity.id_map,
            fingerprints: identity.fingerprints,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModelResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram_model_root: Option<DiagramModelRoot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelMetadataPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadModelResponse {
    pub fn of(doc: &DocumentState) -> Self {
        Self {
            success: true,
            diagram_model_root: Some(doc.model.clone()),
            metadata: Some(ModelMetadataPayload::of(doc)),
            error: None,
        }
    }
}

impl Failure for LoadModelResponse {
    fn failure(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOperationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<Vec<TextEdit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_model: Option<DiagramModelRoot>,
}

impl Failure for ExecuteOperationResponse {
    fn failure(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub positions: BTreeMap<ElementId, Point>,
    pub sizes: BTreeMap<ElementId, Dimension>,
    pub routing_points: BTreeMap<ElementId, Vec<Point>>,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Failure for LayoutResponse {
    fn failure(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPaletteResponse {
    pub groups: Vec<PaletteGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Failure for ToolPaletteResponse {
    fn failure(error: String) -> Self {
        Self {
            groups: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenuResponse {
    pub items: Vec<MenuItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Failure for ContextMenuResponse {
    fn failure(error: String) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesResponse {
    pub success: bool,
    pub properties: Vec<PropertyEntry>,
    pub type_label: String,
    pub is_multi_select: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Failure for PropertiesResponse {
    fn failure(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<Vec<TextEdit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertyEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Failure for UpdatePropertyResponse {
    fn failure(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

impl Failure for tandem_model::ValidationReport {
    fn failure(error: String) -> Self {
        tracing::debug!(%error, "validation unavailable");
        Self::default()
    }
}
