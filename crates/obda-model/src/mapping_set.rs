//! Mapping sets indexed by signature, and their published snapshots.

use crate::mapping::{Mapping, MappingKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::sync::Arc;

/// The working set built and rewritten during knowledge-base optimization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Mapping>", into = "Vec<Mapping>")]
pub struct MappingSet {
    by_signature: BTreeMap<String, BTreeSet<Mapping>>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a structurally equal mapping was already present.
    pub fn add(&mut self, mapping: Mapping) -> bool {
        self.by_signature
            .entry(mapping.signature().to_string())
            .or_default()
            .insert(mapping)
    }

    /// Number of mappings actually inserted.
    pub fn add_all(&mut self, mappings: impl IntoIterator<Item = Mapping>) -> usize {
        mappings.into_iter().map(|m| self.add(m)).filter(|added| *added).count()
    }

    pub fn remove(&mut self, mapping: &Mapping) -> bool {
        let signature = mapping.signature();
        let Some(group) = self.by_signature.get_mut(signature) else {
            return false;
        };
        let removed = group.remove(mapping);
        if group.is_empty() {
            self.by_signature.remove(signature);
        }
        removed
    }

    pub fn remove_all<'a>(&mut self, mappings: impl IntoIterator<Item = &'a Mapping>) -> usize {
        mappings.into_iter().filter(|m| self.remove(m)).count()
    }

    /// Mappings whose signature is `signature` (empty when none).
    pub fn get(&self, signature: &str) -> impl Iterator<Item = &Mapping> {
        self.by_signature.get(signature).into_iter().flatten()
    }

    pub fn group(&self, signature: &str) -> Option<&BTreeSet<Mapping>> {
        self.by_signature.get(signature)
    }

    /// Replace every mapping of `signature` with `mappings`.
    pub fn replace_group(&mut self, signature: &str, mappings: impl IntoIterator<Item = Mapping>) {
        self.by_signature.remove(signature);
        for mapping in mappings {
            self.add(mapping);
        }
    }

    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        self.by_signature.keys().map(String::as_str)
    }

    pub fn contains(&self, mapping: &Mapping) -> bool {
        self.by_signature
            .get(mapping.signature())
            .is_some_and(|group| group.contains(mapping))
    }

    pub fn class_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.iter().filter(|m| m.kind() == MappingKind::Class)
    }

    pub fn property_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.iter().filter(|m| m.kind().is_property())
    }

    pub fn len(&self) -> usize {
        self.by_signature.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signature.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.by_signature.values().flatten()
    }

    /// Deep copy published for concurrent readers.
    pub fn snapshot(&self) -> ReadOnlyMappingSet {
        ReadOnlyMappingSet(Arc::new(self.clone()))
    }
}

impl From<Vec<Mapping>> for MappingSet {
    fn from(mappings: Vec<Mapping>) -> Self {
        mappings.into_iter().collect()
    }
}

impl From<MappingSet> for Vec<Mapping> {
    fn from(set: MappingSet) -> Self {
        set.by_signature.into_values().flatten().collect()
    }
}

impl FromIterator<Mapping> for MappingSet {
    fn from_iter<I: IntoIterator<Item = Mapping>>(iter: I) -> Self {
        let mut set = MappingSet::new();
        for mapping in iter {
            set.add(mapping);
        }
        set
    }
}

impl IntoIterator for MappingSet {
    type Item = Mapping;
    type IntoIter = std::vec::IntoIter<Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        Vec::from(self).into_iter()
    }
}

/// Immutable, cheaply shareable view of a published mapping set.
#[derive(Debug, Clone)]
pub struct ReadOnlyMappingSet(Arc<MappingSet>);

impl Deref for ReadOnlyMappingSet {
    type Target = MappingSet;

    fn deref(&self) -> &MappingSet {
        &self.0
    }
}
