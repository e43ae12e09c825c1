//! Context menu filtering for a selection

use crate::config::DiagramTypeConfig;
use tandem_features::{ContextMenu, MenuItem};
use tandem_identity::ElementId;
use tandem_model::{DiagramElement, DiagramModelRoot};

const DELETE_ACTION: &str = "deleteElement";
const EDIT_LABEL_ACTION: &str = "editLabel";
const COLLAPSE_ACTION: &str = "setCollapsed";

/// Items of `menu` that apply to `selection` in `model`.
///
/// Nothing is offered for an empty selection. Custom items with actions this
/// module does not know are always kept.
pub fn context_menu_items(
    menu: &ContextMenu,
    selection: &[ElementId],
    model: &DiagramModelRoot,
    config: &DiagramTypeConfig,
) -> Vec<MenuItem> {
    if selection.is_empty() {
        return Vec::new();
    }
    let single = match selection {
        [id] => {
            let owner = id.label_owner().unwrap_or_else(|| id.clone());
            model.find(&owner)
        }
        _ => None,
    };

    menu.items
        .iter()
        .flatten()
        .filter(|item| match item.action.as_str() {
            DELETE_ACTION => menu.show_delete != Some(false),
            EDIT_LABEL_ACTION => single.is_some_and(|element| element.label_text().is_some()),
            COLLAPSE_ACTION => {
                menu.show_collapse != Some(false) && collapse_applies(item, single, config)
            }
            _ => true,
        })
        .cloned()
        .collect()
}

fn collapse_applies(item: &MenuItem, element: Option<&DiagramElement>, config: &DiagramTypeConfig) -> bool {
    let Some(node) = element.and_then(DiagramElement::as_node) else {
        return false;
    };
    let container = config
        .find_node_type(&node.element_type)
        .is_some_and(|t| t.container);
    if !container {
        return false;
    }
    match item.id.as_str() {
        "collapse" => !node.collapsed,
        "expand" => node.collapsed,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::default_context_menu;
    use tandem_model::{LabelElement, NodeElement};

    fn node(id: &str, element_type: &str, collapsed: bool) -> DiagramElement {
        DiagramElement::Node(NodeElement {
            id: ElementId::from(id),
            element_type: element_type.to_string(),
            position: None,
            size: None,
            shape: None,
            collapsed,
            children: vec![DiagramElement::Label(LabelElement {
                id: ElementId::from(id).label(),
                element_type: "label".to_string(),
                text: id.to_string(),
            })],
        })
    }

    fn model() -> DiagramModelRoot {
        let mut root = DiagramModelRoot::new("root", "graph", 1);
        root.children = vec![
            node("main", "node:activity", false),
            node("closed", "node:activity", true),
            node("task", "node:task", false),
        ];
        root
    }

    fn ids(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn test_empty_selection() {
        let items = context_menu_items(
            &default_context_menu(),
            &[],
            &model(),
            &DiagramTypeConfig::workflow(),
        );
        assert!(items.is_empty());
    }

    #[test]
    fn test_collapse_follows_state() {
        let config = DiagramTypeConfig::workflow();
        let menu = default_context_menu();
        let items = context_menu_items(&menu, &[ElementId::from("main")], &model(), &config);
        assert_eq!(ids(&items), vec!["edit-label", "delete", "collapse"]);

        let items = context_menu_items(&menu, &[ElementId::from("closed")], &model(), &config);
        assert_eq!(ids(&items), vec!["edit-label", "delete", "expand"]);

        let items = context_menu_items(&menu, &[ElementId::from("task")], &model(), &config);
        assert_eq!(ids(&items), vec!["edit-label", "delete"]);
    }

    #[test]
    fn test_multi_selection_and_flags() {
        let config = DiagramTypeConfig::workflow();
        let mut menu = default_context_menu();
        let selection = [ElementId::from("main"), ElementId::from("task")];
        let items = context_menu_items(&menu, &selection, &model(), &config);
        assert_eq!(ids(&items), vec!["delete"]);

        menu.show_delete = Some(false);
        let items = context_menu_items(&menu, &selection, &model(), &config);
        assert!(items.is_empty());
    }
}
