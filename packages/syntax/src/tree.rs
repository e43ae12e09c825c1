//! Arena syntax tree shared by host parsers and the diagram pipeline.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeIndex`];
//! parent links are indices, so the tree is freely cloneable and has no
//! reference cycles. Readers go through [`NodeRef`], a copyable cursor that
//! implements the read-only [`SyntaxNode`] trait.

use crate::range::TextRange;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scalar token: a name, a property value or an annotation argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Unescaped value
    pub value: String,
    /// Range of the token as written, quotes included
    pub range: TextRange,
    pub quoted: bool,
}

impl Atom {
    pub fn bare(value: impl Into<String>, range: TextRange) -> Self {
        Self {
            value: value.into(),
            range,
            quoted: false,
        }
    }

    pub fn quoted(value: impl Into<String>, range: TextRange) -> Self {
        Self {
            value: value.into(),
            range,
            quoted: true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }
}

/// `key: value` member of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub key_range: TextRange,
    pub value: Atom,
    /// Whole member, key through value
    pub range: TextRange,
}

/// `@name(arg, ...)` attached to a node header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub args: Vec<Atom>,
    pub range: TextRange,
}

impl Annotation {
    pub fn number_args(&self) -> Vec<f64> {
        self.args.iter().filter_map(Atom::as_f64).collect()
    }
}

/// Braced member block of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// `{` through `}` inclusive; runs to end of input when unclosed
    pub range: TextRange,
    pub closed: bool,
}

impl Body {
    /// Offset of the closing brace, if there is one.
    pub fn close_offset(&self) -> Option<usize> {
        self.closed.then(|| self.range.end - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub type_tag: String,
    pub keyword_range: TextRange,
    pub name: Option<Atom>,
    pub properties: Vec<Property>,
    pub annotations: Vec<Annotation>,
    pub body: Option<Body>,
    pub range: TextRange,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
}

impl NodeData {
    pub fn new(type_tag: impl Into<String>, range: TextRange) -> Self {
        Self {
            type_tag: type_tag.into(),
            keyword_range: TextRange::empty(range.start),
            range,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Create a tree holding only a root node of `root_type` spanning `range`.
    pub fn new(root_type: impl Into<String>, range: TextRange) -> Self {
        Self {
            nodes: vec![NodeData::new(root_type, range)],
        }
    }

    /// Append `data` as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeIndex, mut data: NodeData) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        data.parent = Some(parent);
        data.children.clear();
        self.nodes.push(data);
        self.nodes[parent.0].children.push(index);
        index
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            index: Self::ROOT,
        }
    }

    pub fn get(&self, index: NodeIndex) -> Option<NodeRef<'_>> {
        (index.0 < self.nodes.len()).then_some(NodeRef { tree: self, index })
    }

    /// # Panics
    /// If `index` does not belong to this tree.
    pub fn node(&self, index: NodeIndex) -> NodeRef<'_> {
        assert!(index.0 < self.nodes.len(), "node {index} out of bounds");
        NodeRef { tree: self, index }
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut NodeData> {
        self.nodes.get_mut(index.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All nodes in document order (pre-order, root first).
    pub fn preorder(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            out.push(self.node(index));
            stack.extend(self.nodes[index.0].children.iter().rev().copied());
        }
        out
    }

    /// Deepest node whose range contains `offset`.
    pub fn node_at(&self, offset: usize) -> NodeRef<'_> {
        let mut current = self.root();
        'descend: loop {
            for child in current.children() {
                if child.range().contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }
}

/// Read-only view of a syntax node, independent of the host parser.
pub trait SyntaxNode: Copy {
    fn type_tag(&self) -> &str;
    fn name(&self) -> Option<&str>;
    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn range(&self) -> TextRange;
    fn is_same(&self, other: &Self) -> bool;

    /// Position among the parent's children that share this node's type tag.
    fn same_type_index(&self) -> usize {
        let Some(parent) = self.parent() else {
            return 0;
        };
        parent
            .children()
            .iter()
            .filter(|sibling| sibling.type_tag() == self.type_tag())
            .take_while(|sibling| !sibling.is_same(self))
            .count()
    }
}

#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    index: NodeIndex,
}

impl<'t> NodeRef<'t> {
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.index.0]
    }

    pub fn type_tag(&self) -> &'t str {
        &self.data().type_tag
    }

    pub fn name(&self) -> Option<&'t Atom> {
        self.data().name.as_ref()
    }

    pub fn range(&self) -> TextRange {
        self.data().range
    }

    pub fn body(&self) -> Option<Body> {
        self.data().body
    }

    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.data().parent.map(|index| NodeRef {
            tree: self.tree,
            index,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&index| NodeRef { tree, index })
    }

    /// Parent chain, nearest first, root last.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'t>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn is_ancestor_of(&self, other: &NodeRef<'_>) -> bool {
        other.ancestors().any(|a| a.index == self.index)
    }

    pub fn properties(&self) -> &'t [Property] {
        &self.data().properties
    }

    pub fn property(&self, key: &str) -> Option<&'t Property> {
        self.data().properties.iter().find(|p| p.key == key)
    }

    pub fn annotation(&self, name: &str) -> Option<&'t Annotation> {
        self.data().annotations.iter().find(|a| a.name == name)
    }

    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.index == other.index
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("index", &self.index)
            .field("type_tag", &self.type_tag())
            .field("name", &self.name().map(|n| n.value.as_str()))
            .finish()
    }
}

impl<'t> SyntaxNode for NodeRef<'t> {
    fn type_tag(&self) -> &str {
        NodeRef::type_tag(self)
    }

    fn name(&self) -> Option<&str> {
        NodeRef::name(self).map(|atom| atom.value.as_str())
    }

    fn parent(&self) -> Option<Self> {
        NodeRef::parent(self)
    }

    fn children(&self) -> Vec<Self> {
        NodeRef::children(self).collect()
    }

    fn range(&self) -> TextRange {
        NodeRef::range(self)
    }

    fn is_same(&self, other: &Self) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(type_tag: &str, name: &str, start: usize, end: usize) -> NodeData {
        let mut data = NodeData::new(type_tag, TextRange::new(start, end));
        data.name = Some(Atom::bare(name, TextRange::new(start, end)));
        data
    }

    fn sample() -> SyntaxTree {
        let mut tree = SyntaxTree::new("Document", TextRange::new(0, 100));
        let activity = tree.add_node(SyntaxTree::ROOT, named("Activity", "Main", 0, 60));
        tree.add_node(activity, named("Task", "A", 10, 20));
        tree.add_node(activity, named("Event", "Start", 20, 30));
        tree.add_node(activity, named("Task", "B", 30, 40));
        tree.add_node(SyntaxTree::ROOT, named("Task", "C", 70, 80));
        tree
    }

    #[test]
    fn test_preorder_is_document_order() {
        let tree = sample();
        let names: Vec<_> = tree
            .preorder()
            .iter()
            .map(|n| n.name().map(|a| a.value.clone()).unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["", "Main", "A", "Start", "B", "C"]);
    }

    #[test]
    fn test_same_type_index_counts_only_matching_siblings() {
        let tree = sample();
        let b = tree.node(NodeIndex(4));
        assert_eq!(SyntaxNode::same_type_index(&b), 1);
        let start = tree.node(NodeIndex(3));
        assert_eq!(SyntaxNode::same_type_index(&start), 0);
        assert_eq!(SyntaxNode::same_type_index(&tree.root()), 0);
    }

    #[test]
    fn test_node_at_finds_deepest() {
        let tree = sample();
        assert_eq!(tree.node_at(15).index(), NodeIndex(2));
        assert_eq!(tree.node_at(50).index(), NodeIndex(1));
        assert_eq!(tree.node_at(90).index(), SyntaxTree::ROOT);
    }

    #[test]
    fn test_ancestors() {
        let tree = sample();
        let a = tree.node(NodeIndex(2));
        let chain: Vec<_> = a.ancestors().map(|n| n.index()).collect();
        assert_eq!(chain, vec![NodeIndex(1), SyntaxTree::ROOT]);
        assert!(tree.node(NodeIndex(1)).is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&tree.node(NodeIndex(1))));
        assert_eq!(a.depth(), 2);
    }

    #[test]
    fn test_body_close_offset() {
        let body = Body {
            range: TextRange::new(5, 12),
            closed: true,
        };
        assert_eq!(body.close_offset(), Some(11));
        let open = Body {
            range: TextRange::new(5, 12),
            closed: false,
        };
        assert_eq!(open.close_offset(), None);
    }
}
