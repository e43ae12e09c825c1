//! Property sheet for the current selection

use crate::config::DiagramTypeConfig;
use crate::context::IdIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tandem_identity::ElementId;
use tandem_syntax::{NodeRef, SyntaxTree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEntry {
    pub key: String,
    /// Empty when a multi-selection disagrees
    pub value: String,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySheet {
    pub properties: Vec<PropertyEntry>,
    pub type_label: String,
    pub is_multi_select: bool,
}

/// Build the sheet for `element_ids`. Label ids stand for their owner;
/// unknown ids are skipped. With several elements only the keys they all
/// share are listed.
pub fn property_sheet(
    tree: &SyntaxTree,
    index: &IdIndex,
    config: &DiagramTypeConfig,
    element_ids: &[ElementId],
) -> PropertySheet {
    let nodes: Vec<NodeRef<'_>> = element_ids
        .iter()
        .filter_map(|id| {
            let owner = id.label_owner().unwrap_or_else(|| id.clone());
            index.node_of(&owner).and_then(|node| tree.get(node))
        })
        .collect();

    let Some(first) = nodes.first() else {
        return PropertySheet::default();
    };

    let rows: Vec<Vec<PropertyEntry>> = nodes.iter().map(|node| rows_of(*node)).collect();
    let mut properties = rows[0].clone();
    for other in &rows[1..] {
        let values: BTreeMap<&str, &str> = other
            .iter()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
            .collect();
        properties.retain_mut(|entry| match values.get(entry.key.as_str()) {
            Some(value) => {
                if *value != entry.value {
                    entry.value.clear();
                }
                true
            }
            None => false,
        });
    }

    let same_type = nodes.iter().all(|node| node.type_tag() == first.type_tag());
    let type_label = if same_type {
        type_label(config, first.type_tag())
    } else {
        "Mixed".to_string()
    };

    PropertySheet {
        properties,
        type_label,
        is_multi_select: nodes.len() > 1,
    }
}

fn rows_of(node: NodeRef<'_>) -> Vec<PropertyEntry> {
    let mut rows = Vec::new();
    if let Some(name) = node.name() {
        rows.push(PropertyEntry {
            key: "name".to_string(),
            value: name.value.clone(),
            editable: true,
        });
    }
    for property in node.properties() {
        rows.push(PropertyEntry {
            key: property.key.clone(),
            value: property.value.value.clone(),
            editable: true,
        });
    }
    for annotation in &node.data().annotations {
        let args: Vec<&str> = annotation.args.iter().map(|a| a.value.as_str()).collect();
        rows.push(PropertyEntry {
            key: format!("@{}", annotation.name),
            value: args.join(", "),
            editable: false,
        });
    }
    rows
}

fn type_label(config: &DiagramTypeConfig, type_tag: &str) -> String {
    if let Some(node_type) = config.node_type(type_tag) {
        return node_type.display_label().to_string();
    }
    if let Some(edge_type) = config.edge_type(type_tag) {
        return edge_type.display_label().to_string();
    }
    type_tag.to_string()
}
