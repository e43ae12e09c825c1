//! Name resolution for edge endpoints

use tandem_syntax::{NodeRef, SyntaxTree};

/// Node an endpoint `name` written inside `scope` refers to.
///
/// A sibling in the same scope wins; otherwise the first accepted node with
/// that name in document order.
pub fn resolve_reference<'t>(
    tree: &'t SyntaxTree,
    scope: Option<NodeRef<'t>>,
    name: &str,
    accept: impl Fn(NodeRef<'t>) -> bool,
) -> Option<NodeRef<'t>> {
    let candidates: Vec<NodeRef<'t>> = tree
        .preorder()
        .into_iter()
        .filter(|node| node.name().is_some_and(|atom| atom.value == name))
        .filter(|node| accept(*node))
        .collect();

    candidates
        .iter()
        .find(|node| node.parent() == scope)
        .or_else(|| candidates.first())
        .copied()
}
