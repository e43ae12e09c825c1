use crate::geometry::{Dimension, Point};
use serde::{Deserialize, Serialize};
use tandem_identity::ElementId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiagramElement {
    Node(NodeElement),
    Edge(EdgeElement),
    Label(LabelElement),
    Port(PortElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeElement {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub children: Vec<DiagramElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeElement {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: String,
    pub source_id: ElementId,
    pub target_id: ElementId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing_points: Vec<Point>,
    #[serde(default)]
    pub children: Vec<DiagramElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelElement {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortElement {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

impl DiagramElement {
    pub fn id(&self) -> &ElementId {
        match self {
            DiagramElement::Node(n) => &n.id,
            DiagramElement::Edge(e) => &e.id,
            DiagramElement::Label(l) => &l.id,
            DiagramElement::Port(p) => &p.id,
        }
    }

    pub fn element_type(&self) -> &str {
        match self {
            DiagramElement::Node(n) => &n.element_type,
            DiagramElement::Edge(e) => &e.element_type,
            DiagramElement::Label(l) => &l.element_type,
            DiagramElement::Port(p) => &p.element_type,
        }
    }

    pub fn children(&self) -> &[DiagramElement] {
        match self {
            DiagramElement::Node(n) => &n.children,
            DiagramElement::Edge(e) => &e.children,
            DiagramElement::Label(_) | DiagramElement::Port(_) => &[],
        }
    }

    pub fn as_node(&self) -> Option<&NodeElement> {
        match self {
            DiagramElement::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeElement> {
        match self {
            DiagramElement::Edge(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&LabelElement> {
        match self {
            DiagramElement::Label(l) => Some(l),
            _ => None,
        }
    }

    /// Text of the first label child, if any.
    pub fn label_text(&self) -> Option<&str> {
        self.children()
            .iter()
            .find_map(|child| child.as_label().map(|l| l.text.as_str()))
    }
}

/// The full diagram for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramModelRoot {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    pub revision: u64,
    pub children: Vec<DiagramElement>,
}

impl DiagramModelRoot {
    pub fn new(id: impl Into<String>, element_type: impl Into<String>, revision: u64) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            revision,
            children: Vec::new(),
        }
    }

    /// Every element, depth-first in rendering order.
    pub fn elements(&self) -> Vec<&DiagramElement> {
        let mut out = Vec::new();
        let mut stack: Vec<&DiagramElement> = self.children.iter().rev().collect();
        while let Some(element) = stack.pop() {
            out.push(element);
            stack.extend(element.children().iter().rev());
        }
        out
    }

    pub fn find(&self, id: &ElementId) -> Option<&DiagramElement> {
        self.elements().into_iter().find(|e| e.id() == id)
    }

    pub fn nodes(&self) -> Vec<&NodeElement> {
        self.elements()
            .into_iter()
            .filter_map(DiagramElement::as_node)
            .collect()
    }

    pub fn edges(&self) -> Vec<&EdgeElement> {
        self.elements()
            .into_iter()
            .filter_map(DiagramElement::as_edge)
            .collect()
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.find(id).is_some()
    }

    /// Same model ignoring the revision counter.
    pub fn same_content(&self, other: &DiagramModelRoot) -> bool {
        self.id == other.id
            && self.element_type == other.element_type
            && self.children == other.children
    }
}
