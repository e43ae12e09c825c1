//! Persisted layout record, the unit stored by layout stores.

use crate::geometry::{Dimension, Point};
use crate::metadata::{ModelMetadata, Viewport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tandem_identity::{ElementId, Fingerprint, RegistryState};

pub const LAYOUT_RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub version: u32,
    pub file_uri: String,
    pub timestamp: DateTime<Utc>,
    pub positions: BTreeMap<ElementId, Point>,
    pub sizes: BTreeMap<ElementId, Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_points: Option<BTreeMap<ElementId, Vec<Point>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub id_map: BTreeMap<String, ElementId>,
    #[serde(default)]
    pub fingerprints: BTreeMap<ElementId, Fingerprint>,
    #[serde(default)]
    pub collapsed: BTreeSet<ElementId>,
}

impl LayoutRecord {
    pub fn capture(file_uri: &str, metadata: &ModelMetadata, identity: RegistryState) -> Self {
        Self {
            version: LAYOUT_RECORD_VERSION,
            file_uri: file_uri.to_string(),
            timestamp: Utc::now(),
            positions: metadata.positions.clone(),
            sizes: metadata.sizes.clone(),
            routing_points: (!metadata.routing_points.is_empty())
                .then(|| metadata.routing_points.clone()),
            viewport: metadata.viewport,
            id_map: identity.id_map,
            fingerprints: identity.fingerprints,
            collapsed: metadata.collapsed.clone(),
        }
    }

    pub fn registry_state(&self) -> RegistryState {
        RegistryState {
            id_map: self.id_map.clone(),
            fingerprints: self.fingerprints.clone(),
        }
    }

    /// Metadata restored from this record; source ranges are rebuilt by the
    /// next conversion.
    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            positions: self.positions.clone(),
            sizes: self.sizes.clone(),
            routing_points: self.routing_points.clone().unwrap_or_default(),
            collapsed: self.collapsed.clone(),
            viewport: self.viewport,
            ..Default::default()
        }
    }
}
