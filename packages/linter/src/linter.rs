use crate::rules::RuleRegistry;
use serde::{Deserialize, Serialize};
use tandem_syntax::{Diagnostic, SyntaxTree};

/// Node type whose properties name other nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSpec {
    pub type_tag: String,
    pub properties: Vec<String>,
}

/// Options for configuring the linter
#[derive(Debug, Default)]
pub struct LintOptions {
    /// Custom rule registry (uses default if None)
    pub registry: Option<RuleRegistry>,

    pub references: Vec<ReferenceSpec>,

    /// Type tags the diagram knows about; `None` skips the check
    pub known_types: Option<Vec<String>>,
}

/// What rules see besides the node under inspection
pub struct LintContext<'a> {
    pub tree: &'a SyntaxTree,
    pub references: &'a [ReferenceSpec],
    pub known_types: Option<&'a [String]>,
}

/// Lint a syntax tree and return diagnostics in document order
pub fn lint_tree(tree: &SyntaxTree, options: LintOptions) -> Vec<Diagnostic> {
    let registry = options.registry.unwrap_or_default();
    let context = LintContext {
        tree,
        references: &options.references,
        known_types: options.known_types.as_deref(),
    };

    let mut diagnostics = Vec::new();
    for rule in registry.rules() {
        diagnostics.extend(rule.check_tree(&context));
    }

    for node in tree.preorder().into_iter().skip(1) {
        for rule in registry.rules() {
            diagnostics.extend(rule.check_node(node, &context));
        }
    }

    diagnostics.sort_by_key(|d| (d.range.start, d.range.end));
    diagnostics
}
