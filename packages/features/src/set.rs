use crate::name::FeatureName;
use std::collections::BTreeMap;

/// State of one feature in a provider set. A feature missing from the set
/// means "no opinion, use the default"; `Disabled` means explicitly absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<P> {
    Provided(P),
    Disabled,
}

/// Mapping from feature name to provider
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureProviderSet<P> {
    slots: BTreeMap<FeatureName, Slot<P>>,
}

impl<P> Default for FeatureProviderSet<P> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<P> FeatureProviderSet<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<FeatureName>, provider: P) -> Self {
        self.insert(name, provider);
        self
    }

    pub fn insert(&mut self, name: impl Into<FeatureName>, provider: P) {
        self.slots.insert(name.into(), Slot::Provided(provider));
    }

    pub fn disable(&mut self, name: impl Into<FeatureName>) {
        self.slots.insert(name.into(), Slot::Disabled);
    }

    pub fn remove(&mut self, name: &FeatureName) -> Option<Slot<P>> {
        self.slots.remove(name)
    }

    pub fn slot(&self, name: &FeatureName) -> Option<&Slot<P>> {
        self.slots.get(name)
    }

    /// Provider for `name`; `None` when absent or disabled.
    pub fn get(&self, name: &FeatureName) -> Option<&P> {
        match self.slots.get(name) {
            Some(Slot::Provided(provider)) => Some(provider),
            _ => None,
        }
    }

    pub fn is_enabled(&self, name: &FeatureName) -> bool {
        self.get(name).is_some()
    }

    pub fn is_disabled(&self, name: &FeatureName) -> bool {
        matches!(self.slots.get(name), Some(Slot::Disabled))
    }

    pub fn names(&self) -> impl Iterator<Item = &FeatureName> {
        self.slots.keys()
    }

    pub fn providers(&self) -> impl Iterator<Item = (&FeatureName, &P)> {
        self.slots.iter().filter_map(|(name, slot)| match slot {
            Slot::Provided(provider) => Some((name, provider)),
            Slot::Disabled => None,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
