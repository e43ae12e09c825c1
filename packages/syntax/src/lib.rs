//! Syntax primitives shared by host parsers and the diagram pipeline:
//! byte ranges, text edits, the arena syntax tree and diagnostics.

pub mod diagnostic;
pub mod range;
pub mod tree;

pub use diagnostic::{has_errors, Diagnostic, Severity};
pub use range::{apply_edits, line_col, EditError, TextEdit, TextRange};
pub use tree::{Annotation, Atom, Body, NodeData, NodeIndex, NodeRef, Property, SyntaxNode, SyntaxTree};
