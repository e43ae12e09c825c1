mod linter;
mod rules;

pub use linter::{lint_tree, LintContext, LintOptions, ReferenceSpec};
pub use rules::{
    AmbiguousIdentityRule, DanglingReferenceRule, EmptyNameRule, LintRule, RuleRegistry,
    UnknownTypeRule,
};
pub use tandem_syntax::{Diagnostic, Severity};
