use crate::linter::LintContext;
use crate::rules::LintRule;
use tandem_syntax::{Diagnostic, NodeRef};

pub struct EmptyNameRule;

impl LintRule for EmptyNameRule {
    fn name(&self) -> &'static str {
        "empty-name"
    }

    fn description(&self) -> &'static str {
        "Disallow blank quoted names"
    }

    fn check_node(&self, node: NodeRef<'_>, _context: &LintContext<'_>) -> Vec<Diagnostic> {
        match node.name() {
            Some(name) if name.value.trim().is_empty() => vec![Diagnostic::warning(
                self.name(),
                format!("{} has an empty name", node.type_tag()),
                name.range,
            )
            .with_node(node.index())
            .with_suggestion("Give the node a name or remove the quotes")],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linter::{lint_tree, LintOptions};
    use crate::rules::RuleRegistry;
    use tandem_parser::parse;

    #[test]
    fn test_blank_name() {
        let mut registry = RuleRegistry::empty();
        registry.add_rule(Box::new(EmptyNameRule));
        let options = LintOptions {
            registry: Some(registry),
            ..Default::default()
        };
        let diagnostics = lint_tree(&parse("task \"  \"\ntask A\n").tree, options);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "empty-name");
    }
}
