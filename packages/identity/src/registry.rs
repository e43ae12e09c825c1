//! Stable identity registry
//!
//! Maps fingerprint keys to [`ElementId`]s for the lifetime of a document
//! session. Two indices are kept in step:
//!
//! - exact match: `fingerprint key → id`
//! - reverse: `id → entry` (fingerprint plus the positional anchor used to
//!   recognise renamed nodes, see [`crate::pass`])

use crate::fingerprint::Fingerprint;
use crate::id::{ElementId, IdGenerator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tandem_syntax::SyntaxNode;

/// Where a node sat in its parent the last time it was resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub parent: Option<ElementId>,
    pub type_tag: String,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) key: String,
    pub(crate) fingerprint: Fingerprint,
    pub(crate) anchor: Option<Anchor>,
}

/// Serializable form of the registry indices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryState {
    pub id_map: BTreeMap<String, ElementId>,
    pub fingerprints: BTreeMap<ElementId, Fingerprint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Ids that had no fingerprint, or whose fingerprint disagreed with its key
    pub skipped: Vec<ElementId>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    pub(crate) ids: IdGenerator,
    pub(crate) by_key: HashMap<String, ElementId>,
    pub(crate) entries: BTreeMap<ElementId, Entry>,
}

impl Registry {
    pub fn new(document_uri: &str) -> Self {
        Self::with_generator(IdGenerator::new(document_uri))
    }

    pub fn with_generator(ids: IdGenerator) -> Self {
        Self {
            ids,
            by_key: HashMap::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Id for `node`: the indexed one when its fingerprint is known, otherwise
    /// a freshly minted one.
    pub fn resolve<N: SyntaxNode>(&mut self, node: N) -> ElementId {
        let fingerprint = Fingerprint::of(node);
        if let Some(id) = self.by_key.get(&fingerprint.key()) {
            return id.clone();
        }
        let anchor = fingerprint
            .parent()
            .and_then(|parent| self.by_key.get(&parent.key()).cloned())
            .map(|parent| anchor_for(Some(parent), &fingerprint));
        self.mint(fingerprint, anchor)
    }

    pub(crate) fn mint(&mut self, fingerprint: Fingerprint, anchor: Option<Anchor>) -> ElementId {
        let id = self.ids.next_id();
        let key = fingerprint.key();
        tracing::trace!(%id, %key, "minted element id");
        self.by_key.insert(key.clone(), id.clone());
        self.entries.insert(
            id.clone(),
            Entry {
                key,
                fingerprint,
                anchor,
            },
        );
        id
    }

    pub fn lookup(&self, key: &str) -> Option<&ElementId> {
        self.by_key.get(key)
    }

    pub fn lookup_fingerprint(&self, fingerprint: &Fingerprint) -> Option<&ElementId> {
        self.lookup(&fingerprint.key())
    }

    pub fn fingerprint_of(&self, id: &ElementId) -> Option<&Fingerprint> {
        self.entries.get(id).map(|entry| &entry.fingerprint)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ElementId> {
        self.entries.keys()
    }

    pub fn seed(&self) -> &str {
        self.ids.seed()
    }

    /// Forget `id`. Returns false when it was not indexed.
    pub fn invalidate(&mut self, id: &ElementId) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        if self.by_key.get(&entry.key) == Some(id) {
            self.by_key.remove(&entry.key);
        }
        tracing::debug!(%id, key = %entry.key, "invalidated element id");
        true
    }

    /// Drop every entry not in `keep`, returning the removed ids.
    pub fn retain(&mut self, keep: &HashSet<ElementId>) -> Vec<ElementId> {
        let stale: Vec<ElementId> = self
            .entries
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            self.invalidate(id);
        }
        stale
    }

    pub fn export_state(&self) -> RegistryState {
        RegistryState {
            id_map: self
                .by_key
                .iter()
                .map(|(key, id)| (key.clone(), id.clone()))
                .collect(),
            fingerprints: self
                .entries
                .iter()
                .map(|(id, entry)| (id.clone(), entry.fingerprint.clone()))
                .collect(),
        }
    }

    /// Restore a previously exported index on top of the current one.
    ///
    /// The id counter moves past every imported id so ids minted afterwards
    /// never collide with restored ones.
    pub fn import_state(&mut self, state: RegistryState) -> ImportReport {
        let mut report = ImportReport::default();

        for (key, id) in state.id_map {
            self.ids.advance_past(&id);
            let Some(fingerprint) = state.fingerprints.get(&id) else {
                report.skipped.push(id);
                continue;
            };
            if fingerprint.key() != key {
                tracing::warn!(%id, %key, "imported fingerprint does not match its key");
                report.skipped.push(id);
                continue;
            }
            // The id may currently belong to another key, and the key to
            // another id; unlink both so neither points at the wrong entry
            if let Some(existing) = self.entries.get(&id) {
                if existing.key != key && self.by_key.get(&existing.key) == Some(&id) {
                    self.by_key.remove(&existing.key);
                }
            }
            if let Some(previous) = self.by_key.insert(key.clone(), id.clone()) {
                if previous != id && self.entries.get(&previous).is_some_and(|e| e.key == key) {
                    self.entries.remove(&previous);
                }
            }
            self.entries.insert(
                id,
                Entry {
                    key,
                    fingerprint: fingerprint.clone(),
                    anchor: None,
                },
            );
            report.imported += 1;
        }

        for id in state.fingerprints.keys() {
            self.ids.advance_past(id);
        }

        self.derive_anchors();
        tracing::debug!(
            imported = report.imported,
            skipped = report.skipped.len(),
            "imported registry state"
        );
        report
    }

    /// Recompute positional anchors from the fingerprints' parent keys.
    fn derive_anchors(&mut self) {
        let by_key = &self.by_key;
        for entry in self.entries.values_mut() {
            if entry.anchor.is_some() {
                continue;
            }
            let parent = match entry.fingerprint.parent() {
                Some(parent) => match by_key.get(&parent.key()) {
                    Some(id) => Some(id.clone()),
                    None => continue,
                },
                None => None,
            };
            entry.anchor = Some(anchor_for(parent, &entry.fingerprint));
        }
    }

    pub(crate) fn anchors(&self) -> HashMap<Anchor, ElementId> {
        self.entries
            .iter()
            .filter_map(|(id, entry)| entry.anchor.clone().map(|anchor| (anchor, id.clone())))
            .collect()
    }
}

pub(crate) fn anchor_for(parent: Option<ElementId>, fingerprint: &Fingerprint) -> Anchor {
    let (type_tag, index) = fingerprint
        .leaf()
        .map(|leaf| (leaf.type_tag.clone(), leaf.index))
        .unwrap_or_default();
    Anchor {
        parent,
        type_tag,
        index,
    }
}
