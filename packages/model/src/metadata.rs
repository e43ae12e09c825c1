//! Per-document layout metadata, keyed by element id.

use crate::geometry::{Dimension, Point};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tandem_identity::ElementId;
use tandem_syntax::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub scroll: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll: Point::default(),
            zoom: 1.0,
        }
    }
}

/// Layout requested for a node that does not exist yet, applied when the
/// node first converts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLayout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    #[serde(default)]
    pub positions: BTreeMap<ElementId, Point>,
    #[serde(default)]
    pub sizes: BTreeMap<ElementId, Dimension>,
    #[serde(default)]
    pub routing_points: BTreeMap<ElementId, Vec<Point>>,
    #[serde(default)]
    pub collapsed: BTreeSet<ElementId>,
    #[serde(default)]
    pub source_ranges: BTreeMap<ElementId, TextRange>,
    #[serde(default)]
    pub name_ranges: BTreeMap<ElementId, TextRange>,
    /// Keyed by the fingerprint key the new node is expected to have
    #[serde(default)]
    pub pending: BTreeMap<String, PendingLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl ModelMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, id: &ElementId) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn size(&self, id: &ElementId) -> Option<Dimension> {
        self.sizes.get(id).copied()
    }

    pub fn set_position(&mut self, id: ElementId, position: Point) {
        self.positions.insert(id, position);
    }

    pub fn set_size(&mut self, id: ElementId, size: Dimension) {
        self.sizes.insert(id, size);
    }

    pub fn is_collapsed(&self, id: &ElementId) -> bool {
        self.collapsed.contains(id)
    }

    pub fn set_collapsed(&mut self, id: ElementId, collapsed: bool) {
        if collapsed {
            self.collapsed.insert(id);
        } else {
            self.collapsed.remove(&id);
        }
    }

    pub fn source_range(&self, id: &ElementId) -> Option<TextRange> {
        self.source_ranges.get(id).copied()
    }

    /// Move pending layout registered under `key` onto `id`.
    pub fn adopt_pending(&mut self, key: &str, id: &ElementId) -> bool {
        let Some(pending) = self.pending.remove(key) else {
            return false;
        };
        if let Some(position) = pending.position {
            self.positions.insert(id.clone(), position);
        }
        if let Some(size) = pending.size {
            self.sizes.insert(id.clone(), size);
        }
        true
    }

    /// Forget everything stored for `id`.
    pub fn remove(&mut self, id: &ElementId) {
        self.positions.remove(id);
        self.sizes.remove(id);
        self.routing_points.remove(id);
        self.collapsed.remove(id);
        self.source_ranges.remove(id);
        self.name_ranges.remove(id);
    }

    /// Drop layout for ids `keep` rejects. Source ranges are rebuilt by every
    /// conversion and are cleared separately.
    pub fn retain_ids(&mut self, keep: impl Fn(&ElementId) -> bool) {
        self.positions.retain(|id, _| keep(id));
        self.sizes.retain(|id, _| keep(id));
        self.routing_points.retain(|id, _| keep(id));
        self.collapsed.retain(|id| keep(id));
    }

    pub fn clear_ranges(&mut self) {
        self.source_ranges.clear();
        self.name_ranges.clear();
    }
}
