//! # Identity passes
//!
//! A conversion resolves a whole tree at once, top-down, one sibling group at
//! a time. Each group goes through three phases:
//!
//! 1. **exact**: the fingerprint key is indexed, reuse its id
//! 2. **positional**: an id that was anchored at the same (parent id, type,
//!    same-type index) and was not claimed by anything else in this pass is
//!    reused; this is what keeps a renamed node's id
//! 3. **mint**: everything left gets a fresh id
//!
//! A pass journals every registry change. Dropping it without calling
//! [`IdentityPass::finish`] undoes them, so a cancelled conversion leaves no
//! entries for ids that were never handed out.

use crate::fingerprint::Fingerprint;
use crate::id::ElementId;
use crate::registry::{anchor_for, Anchor, Entry, Registry};
use std::collections::{HashMap, HashSet};
use tandem_syntax::SyntaxNode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Fingerprint key was already indexed
    Existing,
    /// Reused by position after the key changed
    Renamed { previous_key: String },
    Minted,
}

/// Node sharing type, name and ancestor path with an earlier sibling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub id: ElementId,
    pub base_key: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub id: ElementId,
    pub fingerprint: Fingerprint,
    pub resolution: Resolution,
}

impl Resolved {
    pub fn is_ambiguous(&self) -> bool {
        self.fingerprint.is_ambiguous()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub existing: usize,
    pub renamed: usize,
    pub minted: usize,
    pub collisions: Vec<Collision>,
}

impl PassSummary {
    pub fn resolved(&self) -> usize {
        self.existing + self.renamed + self.minted
    }
}

enum Undo {
    Remove(ElementId),
    Restore(ElementId, Entry),
}

pub struct IdentityPass<'r> {
    registry: &'r mut Registry,
    anchors: HashMap<Anchor, ElementId>,
    claimed: HashSet<ElementId>,
    /// Fingerprints handed out in this pass, extended by child groups
    paths: HashMap<ElementId, Fingerprint>,
    journal: Vec<Undo>,
    summary: PassSummary,
    finished: bool,
}

impl Registry {
    pub fn begin_pass(&mut self) -> IdentityPass<'_> {
        IdentityPass {
            anchors: self.anchors(),
            registry: self,
            claimed: HashSet::new(),
            paths: HashMap::new(),
            journal: Vec::new(),
            summary: PassSummary::default(),
            finished: false,
        }
    }
}

impl<'r> IdentityPass<'r> {
    pub fn resolve_root<N: SyntaxNode>(&mut self, root: N) -> Resolved {
        let mut resolved = self.resolve_siblings(None, &[root]);
        resolved.remove(0)
    }

    /// Resolve one complete sibling group. `parent` is the id already resolved
    /// for the group's parent node in this pass.
    pub fn resolve_siblings<N: SyntaxNode>(
        &mut self,
        parent: Option<&ElementId>,
        nodes: &[N],
    ) -> Vec<Resolved> {
        let prefix = match parent.and_then(|id| self.paths.get(id)) {
            Some(path) => Some(path.clone()),
            None => nodes.first().and_then(|n| n.parent()).map(Fingerprint::of),
        };
        let fingerprints = Fingerprint::of_siblings(prefix.as_ref(), nodes);
        let keys: Vec<String> = fingerprints.iter().map(Fingerprint::key).collect();
        let mut ids: Vec<Option<(ElementId, Resolution)>> = vec![None; nodes.len()];

        for (slot, key) in ids.iter_mut().zip(&keys) {
            if let Some(id) = self.registry.lookup(key) {
                if !self.claimed.contains(id) {
                    let id = id.clone();
                    self.claimed.insert(id.clone());
                    *slot = Some((id, Resolution::Existing));
                }
            }
        }

        for (slot, fingerprint) in ids.iter_mut().zip(&fingerprints) {
            if slot.is_some() {
                continue;
            }
            let anchor = anchor_for(parent.cloned(), fingerprint);
            let Some(candidate) = self.anchors.get(&anchor) else {
                continue;
            };
            if self.claimed.contains(candidate) || !self.registry.contains(candidate) {
                continue;
            }
            let candidate = candidate.clone();
            self.claimed.insert(candidate.clone());
            let previous_key = self.rekey(&candidate, fingerprint.clone());
            *slot = Some((candidate, Resolution::Renamed { previous_key }));
        }

        let mut resolved = Vec::with_capacity(nodes.len());
        for (slot, fingerprint) in ids.into_iter().zip(fingerprints) {
            let anchor = anchor_for(parent.cloned(), &fingerprint);
            let (id, resolution) = match slot {
                Some((id, resolution)) => {
                    self.set_anchor(&id, anchor);
                    (id, resolution)
                }
                None => {
                    let id = self.registry.mint(fingerprint.clone(), Some(anchor));
                    self.journal.push(Undo::Remove(id.clone()));
                    self.claimed.insert(id.clone());
                    (id, Resolution::Minted)
                }
            };

            match resolution {
                Resolution::Existing => self.summary.existing += 1,
                Resolution::Renamed { .. } => self.summary.renamed += 1,
                Resolution::Minted => self.summary.minted += 1,
            }
            if fingerprint.is_ambiguous() {
                let collision = Collision {
                    id: id.clone(),
                    base_key: fingerprint.base_key(),
                    ordinal: fingerprint.leaf().map(|s| s.ordinal).unwrap_or_default(),
                };
                tracing::warn!(
                    id = %collision.id,
                    key = %collision.base_key,
                    ordinal = collision.ordinal,
                    "ambiguous fingerprint, using ordinal tie-break"
                );
                self.summary.collisions.push(collision);
            }

            self.paths.insert(id.clone(), fingerprint.clone());
            resolved.push(Resolved {
                id,
                fingerprint,
                resolution,
            });
        }
        resolved
    }

    /// Ids handed out so far in this pass.
    pub fn claimed(&self) -> &HashSet<ElementId> {
        &self.claimed
    }

    pub fn summary(&self) -> &PassSummary {
        &self.summary
    }

    /// Keep every change made during the pass.
    pub fn finish(mut self) -> PassSummary {
        self.finished = true;
        self.journal.clear();
        tracing::debug!(
            existing = self.summary.existing,
            renamed = self.summary.renamed,
            minted = self.summary.minted,
            collisions = self.summary.collisions.len(),
            "identity pass finished"
        );
        std::mem::take(&mut self.summary)
    }

    /// Undo every change made during the pass.
    pub fn rollback(mut self) {
        self.undo();
        self.finished = true;
    }

    fn undo(&mut self) {
        let undone = self.journal.len();
        while let Some(step) = self.journal.pop() {
            match step {
                Undo::Remove(id) => {
                    self.registry.invalidate(&id);
                }
                Undo::Restore(id, entry) => {
                    if let Some(current) = self.registry.entries.get(&id) {
                        if self.registry.by_key.get(&current.key) == Some(&id) {
                            let key = current.key.clone();
                            self.registry.by_key.remove(&key);
                        }
                    }
                    self.registry.by_key.insert(entry.key.clone(), id.clone());
                    self.registry.entries.insert(id, entry);
                }
            }
        }
        if undone > 0 {
            tracing::debug!(undone, "identity pass rolled back");
        }
    }

    fn rekey(&mut self, id: &ElementId, fingerprint: Fingerprint) -> String {
        let key = fingerprint.key();
        let Some(entry) = self.registry.entries.get_mut(id) else {
            return String::new();
        };
        let previous = entry.clone();
        entry.key = key.clone();
        entry.fingerprint = fingerprint;
        if self.registry.by_key.get(&previous.key) == Some(id) {
            self.registry.by_key.remove(&previous.key);
        }
        self.registry.by_key.insert(key, id.clone());
        let previous_key = previous.key.clone();
        self.journal.push(Undo::Restore(id.clone(), previous));
        previous_key
    }

    fn set_anchor(&mut self, id: &ElementId, anchor: Anchor) {
        let Some(entry) = self.registry.entries.get_mut(id) else {
            return;
        };
        if entry.anchor.as_ref() == Some(&anchor) {
            return;
        }
        let previous = entry.clone();
        entry.anchor = Some(anchor);
        self.journal.push(Undo::Restore(id.clone(), previous));
    }
}

impl Drop for IdentityPass<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.undo();
        }
    }
}
