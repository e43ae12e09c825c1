//! # Tandem Editor
//!
//! Both directions between a document's syntax tree and its diagram.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: .flow text → syntax tree            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ converter: tree → diagram model             │
//! │  - identity pass against the registry       │
//! │  - convertModel / createNode / createEdge   │
//! │  - layout from metadata, pending, hints     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ applier: diagram operation → text edits     │
//! │  - createAstNode / createAstEdge            │
//! │  - applyPosition / applySize or metadata    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Text is the source of truth**: the diagram is always derived
//! 2. **Ids survive reparses**: the registry carries them across edits
//! 3. **Edits, not writes**: operations produce edits the text editor applies
//! 4. **Hooks are features**: every step can be overridden or disabled
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tandem_editor::{apply, convert, default_providers, ApplyContext, ConversionContext};
//!
//! let config = DiagramTypeConfig::workflow();
//! let providers = default_providers(&config);
//! let tree = tandem_parser::parse(source).tree;
//!
//! let mut ctx = ConversionContext::new(&config, &providers, &mut registry, &mut metadata);
//! let output = convert(&tree, &mut ctx);
//!
//! let applied = apply(&operation, ApplyContext { tree: &tree, index: &output.index, .. })?;
//! ```

pub mod applier;
pub mod config;
pub mod context;
pub mod converter;
pub mod layout;
pub mod menus;
pub mod properties;
pub mod providers;
pub mod references;

pub use applier::{apply, Applied, ApplyContext, OperationFailure, OperationResult};
pub use config::{DiagramTypeConfig, EdgeTypeConfig, NodeTypeConfig};
pub use context::{ConversionContext, ConversionScope, IdIndex};
pub use converter::{convert, ConversionOutput, StandardTraversal};
pub use layout::{GridLayout, LayoutEngine, LayoutResult};
pub use menus::context_menu_items;
pub use properties::{property_sheet, PropertyEntry, PropertySheet};
pub use providers::{default_providers, Provider, Providers};
