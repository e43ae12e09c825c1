use crate::linter::LintContext;
use crate::rules::LintRule;
use std::collections::HashSet;
use tandem_syntax::{Diagnostic, NodeRef};

/// Reference properties must name an existing node
pub struct DanglingReferenceRule;

impl LintRule for DanglingReferenceRule {
    fn name(&self) -> &'static str {
        "dangling-reference"
    }

    fn description(&self) -> &'static str {
        "Disallow references to nodes that do not exist"
    }

    fn check_node(&self, node: NodeRef<'_>, context: &LintContext<'_>) -> Vec<Diagnostic> {
        let Some(spec) = context
            .references
            .iter()
            .find(|spec| spec.type_tag == node.type_tag())
        else {
            return Vec::new();
        };

        let names: HashSet<&str> = context
            .tree
            .preorder()
            .into_iter()
            .filter_map(|n| n.name().map(|a| a.value.as_str()))
            .collect();

        let mut diagnostics = Vec::new();
        for key in &spec.properties {
            match node.property(key) {
                Some(property) if !names.contains(property.value.value.as_str()) => {
                    diagnostics.push(
                        Diagnostic::error(
                            self.name(),
                            format!(
                                "{} {} '{}' does not name any node",
                                node.type_tag(),
                                key,
                                property.value.value
                            ),
                            property.value.range,
                        )
                        .with_node(node.index()),
                    );
                }
                Some(_) => {}
                None => diagnostics.push(
                    Diagnostic::error(
                        self.name(),
                        format!("{} is missing its '{}' reference", node.type_tag(), key),
                        node.range(),
                    )
                    .with_node(node.index()),
                ),
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linter::{lint_tree, LintOptions, ReferenceSpec};
    use crate::rules::RuleRegistry;
    use tandem_parser::parse;

    fn options() -> LintOptions {
        let mut registry = RuleRegistry::empty();
        registry.add_rule(Box::new(DanglingReferenceRule));
        LintOptions {
            registry: Some(registry),
            references: vec![ReferenceSpec {
                type_tag: "Flow".into(),
                properties: vec!["source".into(), "target".into()],
            }],
            known_types: None,
        }
    }

    #[test]
    fn test_reports_unknown_target() {
        let source = "task A\nflow A -> Missing\n";
        let diagnostics = lint_tree(&parse(source).tree, options());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Missing"));
        assert_eq!(&source[diagnostics[0].range.start..diagnostics[0].range.end], "Missing");
    }

    #[test]
    fn test_reports_missing_property() {
        let diagnostics = lint_tree(&parse("task A\nflow { source: A }\n").tree, options());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'target'"));
    }

    #[test]
    fn test_valid_references_pass() {
        let diagnostics = lint_tree(
            &parse("activity X { task A }\ntask B\nflow A -> B\n").tree,
            options(),
        );
        assert!(diagnostics.is_empty());
    }
}
