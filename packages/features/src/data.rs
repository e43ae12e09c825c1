//! Field-structured provider data.
//!
//! These are the only provider values deep merge looks into. Every field is
//! optional so a custom value can override part of a default one; lists are
//! replaced wholesale.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteItem {
    pub id: String,
    pub label: String,
    pub element_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteGroup {
    pub id: String,
    pub label: String,
    pub items: Vec<PaletteItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPalette {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<PaletteGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_search: Option<bool>,
}

impl ToolPalette {
    pub fn merged_with(&self, custom: &ToolPalette) -> ToolPalette {
        ToolPalette {
            title: custom.title.clone().or_else(|| self.title.clone()),
            groups: custom.groups.clone().or_else(|| self.groups.clone()),
            show_search: custom.show_search.or(self.show_search),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    /// Operation kind or command the client runs
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<MenuItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_collapse: Option<bool>,
}

impl ContextMenu {
    pub fn merged_with(&self, custom: &ContextMenu) -> ContextMenu {
        ContextMenu {
            items: custom.items.clone().or_else(|| self.items.clone()),
            show_delete: custom.show_delete.or(self.show_delete),
            show_collapse: custom.show_collapse.or(self.show_collapse),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spacing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<f64>,
}

impl Spacing {
    pub fn merged_with(&self, custom: &Spacing) -> Spacing {
        Spacing {
            horizontal: custom.horizontal.or(self.horizontal),
            vertical: custom.vertical.or(self.vertical),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Spacing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
}

impl LayoutOptions {
    pub fn merged_with(&self, custom: &LayoutOptions) -> LayoutOptions {
        let spacing = match (&self.spacing, &custom.spacing) {
            (Some(default), Some(custom)) => Some(default.merged_with(custom)),
            (default, custom) => custom.or(*default),
        };
        LayoutOptions {
            algorithm: custom.algorithm.clone().or_else(|| self.algorithm.clone()),
            columns: custom.columns.or(self.columns),
            spacing,
            padding: custom.padding.or(self.padding),
        }
    }
}
