mod ambiguous_identity;
mod dangling_reference;
mod empty_name;
mod unknown_type;

pub use ambiguous_identity::AmbiguousIdentityRule;
pub use dangling_reference::DanglingReferenceRule;
pub use empty_name::EmptyNameRule;
pub use unknown_type::UnknownTypeRule;

use crate::linter::LintContext;
use tandem_syntax::{Diagnostic, NodeRef};

/// A check over flow documents. Rules report through either hook or both.
pub trait LintRule: Send + Sync {
    /// Rule code carried by its diagnostics, e.g. `dangling-reference`
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Called once per node below the document root
    fn check_node(&self, _node: NodeRef<'_>, _context: &LintContext<'_>) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Called once per document, before any node
    fn check_tree(&self, _context: &LintContext<'_>) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// Ordered set of rules a lint run applies
pub struct RuleRegistry {
    rules: Vec<Box<dyn LintRule>>,
}

impl RuleRegistry {
    /// The built-in rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(AmbiguousIdentityRule),
                Box::new(DanglingReferenceRule),
                Box::new(EmptyNameRule),
                Box::new(UnknownTypeRule),
            ],
        }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[Box<dyn LintRule>] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: Box<dyn LintRule>) {
        self.rules.push(rule);
    }

    /// Drop the rules named in `names`
    pub fn without(mut self, names: &[&str]) -> Self {
        self.rules.retain(|rule| !names.contains(&rule.name()));
        self
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|rule| rule.name()).collect();
        f.debug_struct("RuleRegistry").field("rules", &names).finish()
    }
}
