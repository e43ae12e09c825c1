use crate::linter::LintContext;
use crate::rules::LintRule;
use tandem_syntax::{Diagnostic, NodeRef};

/// Nodes of a type the diagram does not know are kept in text but not shown
pub struct UnknownTypeRule;

impl LintRule for UnknownTypeRule {
    fn name(&self) -> &'static str {
        "unknown-type"
    }

    fn description(&self) -> &'static str {
        "Report node types the diagram cannot display"
    }

    fn check_node(&self, node: NodeRef<'_>, context: &LintContext<'_>) -> Vec<Diagnostic> {
        let Some(known) = context.known_types else {
            return Vec::new();
        };
        if known.iter().any(|t| t == node.type_tag()) {
            return Vec::new();
        }
        vec![Diagnostic::info(
            self.name(),
            format!("'{}' nodes are not shown in the diagram", node.type_tag()),
            node.data().keyword_range,
        )
        .with_node(node.index())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linter::{lint_tree, LintOptions};
    use crate::rules::RuleRegistry;
    use tandem_parser::parse;

    #[test]
    fn test_unknown_types_are_info() {
        let mut registry = RuleRegistry::empty();
        registry.add_rule(Box::new(UnknownTypeRule));
        let options = LintOptions {
            registry: Some(registry),
            references: Vec::new(),
            known_types: Some(vec!["Task".into()]),
        };
        let diagnostics = lint_tree(&parse("task A\nnote N\n").tree, options);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, tandem_syntax::Severity::Info);
        assert_eq!(diagnostics[0].range.start, 7);
    }
}
