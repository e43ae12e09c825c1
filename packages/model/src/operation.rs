use crate::geometry::{Dimension, Point};
use serde::{Deserialize, Serialize};
use tandem_identity::ElementId;

/// New position and/or size for one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsChange {
    pub element_id: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_size: Option<Dimension>,
}

/// A discrete user edit on the diagram view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DiagramOperation {
    CreateNode {
        element_type: String,
        #[serde(default)]
        location: Option<Point>,
        #[serde(default)]
        container_id: Option<ElementId>,
    },
    DeleteElement {
        element_ids: Vec<ElementId>,
    },
    ChangeBounds {
        changes: Vec<BoundsChange>,
    },
    CreateEdge {
        element_type: String,
        source_id: ElementId,
        target_id: ElementId,
    },
    ReconnectEdge {
        edge_id: ElementId,
        #[serde(default)]
        new_source_id: Option<ElementId>,
        #[serde(default)]
        new_target_id: Option<ElementId>,
    },
    EditLabel {
        label_id: ElementId,
        text: String,
    },
    UpdateProperty {
        element_ids: Vec<ElementId>,
        property: String,
        value: String,
    },
}

impl DiagramOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            DiagramOperation::CreateNode { .. } => "createNode",
            DiagramOperation::DeleteElement { .. } => "deleteElement",
            DiagramOperation::ChangeBounds { .. } => "changeBounds",
            DiagramOperation::CreateEdge { .. } => "createEdge",
            DiagramOperation::ReconnectEdge { .. } => "reconnectEdge",
            DiagramOperation::EditLabel { .. } => "editLabel",
            DiagramOperation::UpdateProperty { .. } => "updateProperty",
        }
    }
}
