//! Diagram type configuration
//!
//! One [`DiagramTypeConfig`] describes which syntax node types become diagram
//! nodes, which become edges, and how new ones are written back as text. It is
//! built once per document language and passed by reference into the
//! converter and the applier.

use serde::{Deserialize, Serialize};
use tandem_linter::ReferenceSpec;
use tandem_model::Dimension;
use tandem_parser::keyword_for;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeConfig {
    /// Syntax type tag, e.g. `Task`
    pub type_tag: String,
    /// Source keyword; derived from the type tag when absent
    #[serde(default)]
    pub keyword: Option<String>,
    /// Diagram element type, e.g. `node:task`
    pub element_type: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Statement template with `{keyword}`, `{name}` and `{position}` holes
    #[serde(default = "default_node_template")]
    pub template: String,
    #[serde(default)]
    pub default_size: Option<Dimension>,
    /// Whether nodes of this type may hold child nodes
    #[serde(default)]
    pub container: bool,
    #[serde(default)]
    pub shape: Option<String>,
    /// Port names emitted as children of every node of this type
    #[serde(default)]
    pub ports: Vec<String>,
    /// Prefix for generated names; the type tag when absent
    #[serde(default)]
    pub name_prefix: Option<String>,
}

fn default_node_template() -> String {
    "{keyword} {name}{position}".to_string()
}

impl NodeTypeConfig {
    pub fn new(type_tag: &str, element_type: &str) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            keyword: None,
            element_type: element_type.to_string(),
            label: None,
            template: default_node_template(),
            default_size: None,
            container: false,
            shape: None,
            ports: Vec::new(),
            name_prefix: None,
        }
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.default_size = Some(Dimension::new(width, height));
        self
    }

    pub fn with_shape(mut self, shape: &str) -> Self {
        self.shape = Some(shape.to_string());
        self
    }

    pub fn keyword(&self) -> String {
        self.keyword
            .clone()
            .unwrap_or_else(|| keyword_for(&self.type_tag))
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.type_tag)
    }

    pub fn name_prefix(&self) -> &str {
        self.name_prefix.as_deref().unwrap_or(&self.type_tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeTypeConfig {
    pub type_tag: String,
    #[serde(default)]
    pub keyword: Option<String>,
    pub element_type: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_source_property")]
    pub source_property: String,
    #[serde(default = "default_target_property")]
    pub target_property: String,
}

fn default_source_property() -> String {
    "source".to_string()
}

fn default_target_property() -> String {
    "target".to_string()
}

impl EdgeTypeConfig {
    pub fn new(type_tag: &str, element_type: &str) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            keyword: None,
            element_type: element_type.to_string(),
            label: None,
            source_property: default_source_property(),
            target_property: default_target_property(),
        }
    }

    pub fn keyword(&self) -> String {
        self.keyword
            .clone()
            .unwrap_or_else(|| keyword_for(&self.type_tag))
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.type_tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramTypeConfig {
    pub id: String,
    #[serde(default = "default_root_type")]
    pub root_type: String,
    #[serde(default)]
    pub node_types: Vec<NodeTypeConfig>,
    #[serde(default)]
    pub edge_types: Vec<EdgeTypeConfig>,
    /// Write positions and sizes into the source as `@at` / `@size`
    /// annotations instead of keeping them in layout metadata only
    #[serde(default)]
    pub layout_in_text: bool,
}

fn default_root_type() -> String {
    "graph".to_string()
}

impl Default for DiagramTypeConfig {
    fn default() -> Self {
        Self::workflow()
    }
}

impl DiagramTypeConfig {
    /// Built-in workflow diagram: activities hold tasks and events, flows
    /// connect them.
    pub fn workflow() -> Self {
        Self {
            id: "workflow".to_string(),
            root_type: default_root_type(),
            node_types: vec![
                NodeTypeConfig::new("Activity", "node:activity")
                    .container()
                    .with_size(320.0, 200.0)
                    .with_shape("rectangle"),
                NodeTypeConfig::new("Task", "node:task")
                    .with_size(120.0, 60.0)
                    .with_shape("rounded"),
                NodeTypeConfig::new("Event", "node:event")
                    .with_size(40.0, 40.0)
                    .with_shape("circle"),
            ],
            edge_types: vec![EdgeTypeConfig::new("Flow", "edge:flow")],
            layout_in_text: false,
        }
    }

    pub fn node_type(&self, type_tag: &str) -> Option<&NodeTypeConfig> {
        self.node_types.iter().find(|t| t.type_tag == type_tag)
    }

    pub fn edge_type(&self, type_tag: &str) -> Option<&EdgeTypeConfig> {
        self.edge_types.iter().find(|t| t.type_tag == type_tag)
    }

    /// Node type by element type (`node:task`) or type tag (`Task`).
    pub fn find_node_type(&self, type_id: &str) -> Option<&NodeTypeConfig> {
        self.node_types
            .iter()
            .find(|t| t.element_type == type_id)
            .or_else(|| self.node_type(type_id))
    }

    pub fn find_edge_type(&self, type_id: &str) -> Option<&EdgeTypeConfig> {
        self.edge_types
            .iter()
            .find(|t| t.element_type == type_id)
            .or_else(|| self.edge_type(type_id))
    }

    pub fn is_node_type(&self, type_tag: &str) -> bool {
        self.node_type(type_tag).is_some()
    }

    pub fn is_edge_type(&self, type_tag: &str) -> bool {
        self.edge_type(type_tag).is_some()
    }

    /// Reference properties checked by the dangling-reference lint rule.
    pub fn reference_specs(&self) -> Vec<ReferenceSpec> {
        self.edge_types
            .iter()
            .map(|edge| ReferenceSpec {
                type_tag: edge.type_tag.clone(),
                properties: vec![edge.source_property.clone(), edge.target_property.clone()],
            })
            .collect()
    }

    pub fn known_types(&self) -> Vec<String> {
        self.node_types
            .iter()
            .map(|t| t.type_tag.clone())
            .chain(self.edge_types.iter().map(|t| t.type_tag.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_lookup() {
        let config = DiagramTypeConfig::workflow();
        assert!(config.node_type("Activity").unwrap().container);
        assert_eq!(config.find_node_type("node:task").unwrap().type_tag, "Task");
        assert_eq!(config.find_node_type("Task").unwrap().element_type, "node:task");
        assert!(config.is_edge_type("Flow"));
        assert!(!config.is_node_type("Flow"));
        assert_eq!(config.edge_type("Flow").unwrap().keyword(), "flow");
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{
            "id": "states",
            "nodeTypes": [{ "typeTag": "State", "elementType": "node:state" }],
            "edgeTypes": [{ "typeTag": "Transition", "elementType": "edge:transition",
                            "sourceProperty": "from", "targetProperty": "to" }]
        }"#;
        let config: DiagramTypeConfig = serde_json::from_str(json).unwrap();
        let state = config.node_type("State").unwrap();
        assert_eq!(state.template, "{keyword} {name}{position}");
        assert_eq!(state.keyword(), "state");
        assert!(!state.container);
        assert_eq!(config.root_type, "graph");
        assert!(!config.layout_in_text);

        let specs = config.reference_specs();
        assert_eq!(specs[0].properties, vec!["from", "to"]);
        assert_eq!(config.known_types(), vec!["State", "Transition"]);
    }
}
