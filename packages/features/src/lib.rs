//! Feature provider sets and the override merger that composes default
//! behavior with per-language customizations.

pub mod data;
pub mod merge;
pub mod name;
pub mod set;

pub use data::{ContextMenu, LayoutOptions, MenuItem, PaletteGroup, PaletteItem, Spacing, ToolPalette};
pub use merge::{merge, MergeError, MergeOptions, MergePolicy, MergeResult, Mergeable};
pub use name::FeatureName;
pub use set::{FeatureProviderSet, Slot};
