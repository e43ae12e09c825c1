use crate::linter::LintContext;
use crate::rules::LintRule;
use tandem_identity::Segment;
use tandem_syntax::{Diagnostic, NodeRef};

/// Siblings that share type and name cannot be told apart after a move
pub struct AmbiguousIdentityRule;

impl LintRule for AmbiguousIdentityRule {
    fn name(&self) -> &'static str {
        "ambiguous-identity"
    }

    fn description(&self) -> &'static str {
        "Warn about sibling nodes with the same type and name"
    }

    fn check_tree(&self, context: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for parent in context.tree.preorder() {
            let children: Vec<NodeRef<'_>> = parent.children().collect();
            for (node, segment) in children.iter().zip(Segment::for_siblings(&children)) {
                if segment.ordinal > 0 {
                    diagnostics.push(self.duplicate(*node, &segment));
                }
            }
        }
        diagnostics
    }
}

impl AmbiguousIdentityRule {
    fn duplicate(&self, node: NodeRef<'_>, segment: &Segment) -> Diagnostic {
        let name = segment.name.clone().unwrap_or_default();
        let range = node.name().map(|n| n.range).unwrap_or(node.range());
        Diagnostic::warning(
            self.name(),
            format!(
                "{} '{}' has the same name as an earlier sibling; its diagram identity is ambiguous",
                segment.type_tag, name
            ),
            range,
        )
        .with_node(node.index())
        .with_suggestion(format!("Rename the duplicate '{}'", name))
    }
}
