use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a diagram element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sequence number of an id minted as `"<seed>-<n>"`.
    pub fn sequence(&self) -> Option<(&str, u64)> {
        let (seed, n) = self.0.rsplit_once('-')?;
        Some((seed, n.parse().ok()?))
    }

    /// Id of the label child of this element.
    pub fn label(&self) -> ElementId {
        ElementId(format!("{}_label", self.0))
    }

    /// Owner of a label id produced by [`ElementId::label`].
    pub fn label_owner(&self) -> Option<ElementId> {
        self.0
            .strip_suffix("_label")
            .map(|owner| ElementId(owner.to_string()))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Document seed from its URI using CRC32
pub fn document_seed(uri: &str) -> String {
    let mut buff = String::from(uri);
    if !uri.contains("://") {
        buff = format!("file://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential id generator for one document session
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(uri: &str) -> Self {
        Self::from_seed(document_seed(uri))
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    pub fn next_id(&mut self) -> ElementId {
        self.count += 1;
        ElementId(format!("{}-{}", self.seed, self.count))
    }

    /// Make sure ids minted from now on sort after `id` when it shares our seed.
    pub fn advance_past(&mut self, id: &ElementId) {
        if let Some((seed, n)) = id.sequence() {
            if seed == self.seed && n > self.count {
                self.count = n;
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_seed_is_stable() {
        assert_eq!(document_seed("/orders.flow"), document_seed("file:///orders.flow"));
        assert_ne!(document_seed("/orders.flow"), document_seed("/billing.flow"));
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::new("/test.flow");
        let id1 = gen.next_id();
        let id2 = gen.next_id();

        assert!(id1.as_str().ends_with("-1"));
        assert!(id2.as_str().ends_with("-2"));
        assert!(id1.as_str().starts_with(gen.seed()));
        assert_eq!(id2.sequence(), Some((gen.seed(), 2)));
    }

    #[test]
    fn test_advance_past_only_own_seed() {
        let mut gen = IdGenerator::from_seed("abc");
        gen.advance_past(&ElementId::from("abc-41"));
        gen.advance_past(&ElementId::from("zzz-99"));
        gen.advance_past(&ElementId::from("abc-7"));
        assert_eq!(gen.next_id(), ElementId::from("abc-42"));
    }

    #[test]
    fn test_label_ids() {
        let id = ElementId::from("abc-3");
        assert_eq!(id.label(), ElementId::from("abc-3_label"));
        assert_eq!(id.label().label_owner(), Some(id.clone()));
        assert_eq!(id.label_owner(), None);
    }
}
