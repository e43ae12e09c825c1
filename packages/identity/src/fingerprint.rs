//! Structural fingerprints
//!
//! A fingerprint identifies "the same" syntax node across reparses by the
//! path from the document root down to it:
//!
//! ```text
//! Document[0] / Activity:"Main" / Task:"A"
//! Document[0] / Activity:"Main" / Task[2]          (unnamed: positional)
//! Document[0] / Task:"A" / ... / Task:"A"#1         (second sibling named A)
//! ```
//!
//! Names are preferred over positional indices because indices shift when
//! siblings are inserted. The same-type index is still recorded in every
//! segment. Siblings sharing type and name get an ordinal suffix in document
//! order, so keys within one tree never collide.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tandem_syntax::SyntaxNode;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub type_tag: String,
    /// Index among siblings with the same type tag
    pub index: usize,
    pub name: Option<String>,
    /// Position among earlier siblings with the same type and name
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ordinal: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Segment {
    pub fn key(&self) -> String {
        let mut key = match &self.name {
            Some(name) => format!("{}:{:?}", self.type_tag, name),
            None => format!("{}[{}]", self.type_tag, self.index),
        };
        if self.ordinal > 0 {
            key.push_str(&format!("#{}", self.ordinal));
        }
        key
    }

    /// Segments of one complete sibling group, in document order.
    ///
    /// Same-type indices and name ordinals come out of a single scan, so a
    /// group costs linear time however wide it is.
    pub fn for_siblings<N: SyntaxNode>(nodes: &[N]) -> Vec<Segment> {
        let mut by_type: HashMap<&str, usize> = HashMap::new();
        let mut by_name: HashMap<(&str, &str), usize> = HashMap::new();
        nodes
            .iter()
            .map(|node| {
                let type_tag = node.type_tag();
                let index = by_type.entry(type_tag).or_insert(0);
                let segment_index = *index;
                *index += 1;

                let name = node.name();
                let ordinal = match name {
                    Some(name) => {
                        let seen = by_name.entry((type_tag, name)).or_insert(0);
                        *seen += 1;
                        *seen - 1
                    }
                    None => 0,
                };
                Segment {
                    type_tag: type_tag.to_string(),
                    index: segment_index,
                    name: name.map(str::to_string),
                    ordinal,
                }
            })
            .collect()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Equality and hashing follow the canonical key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub segments: Vec<Segment>,
}

impl Fingerprint {
    /// Derive the fingerprint of `node` by walking to the document root.
    pub fn of<N: SyntaxNode>(node: N) -> Self {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(node) = current {
            segments.push(segment_of(&node));
            current = node.parent();
        }
        segments.reverse();
        Self { segments }
    }

    /// Fingerprints of a complete sibling group whose parent has the
    /// fingerprint `parent` (`None` when the group is the document root).
    pub fn of_siblings<N: SyntaxNode>(parent: Option<&Fingerprint>, nodes: &[N]) -> Vec<Fingerprint> {
        Segment::for_siblings(nodes)
            .into_iter()
            .map(|segment| {
                let mut segments = parent.map(|p| p.segments.clone()).unwrap_or_default();
                segments.push(segment);
                Fingerprint { segments }
            })
            .collect()
    }

    /// Canonical string key used by the exact-match index.
    pub fn key(&self) -> String {
        self.segments
            .iter()
            .map(Segment::key)
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn leaf(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn parent(&self) -> Option<Fingerprint> {
        match self.segments.len() {
            0 | 1 => None,
            n => Some(Fingerprint {
                segments: self.segments[..n - 1].to_vec(),
            }),
        }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True when the node shares type, name and ancestor path with an
    /// earlier sibling.
    pub fn is_ambiguous(&self) -> bool {
        self.leaf().is_some_and(|s| s.ordinal > 0)
    }

    /// Key the node would have without its collision ordinal.
    pub fn base_key(&self) -> String {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.ordinal = 0;
        }
        Fingerprint { segments }.key()
    }

    /// Fingerprint of a not-yet-parsed child appended under `self`.
    pub fn child(&self, type_tag: &str, index: usize, name: Option<&str>) -> Fingerprint {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            type_tag: type_tag.to_string(),
            index,
            name: name.map(str::to_string),
            ordinal: 0,
        });
        Fingerprint { segments }
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Fingerprint {}

impl std::hash::Hash for Fingerprint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

fn segment_of<N: SyntaxNode>(node: &N) -> Segment {
    let siblings = match node.parent() {
        Some(parent) => parent.children(),
        None => vec![*node],
    };
    match siblings.iter().position(|sibling| sibling.is_same(node)) {
        Some(position) => Segment::for_siblings(&siblings).swap_remove(position),
        None => Segment::for_siblings(&[*node]).remove(0),
    }
}
