//! The knowledge base: mappings plus everything the passes consult.

use crate::error::OptimizeError;
use obda_model::{DatabaseMetadata, MappingSet, ReadOnlyMappingSet};
use obda_ontology::{Ontology, OntologyHierarchy, Taxonomy};
use std::sync::Arc;

/// Mappings are mutable while the knowledge base is being optimized and
/// frozen into a shared snapshot once published.
#[derive(Debug, Clone)]
pub enum MappingStore {
    Mutable(MappingSet),
    Published(ReadOnlyMappingSet),
}

pub struct KnowledgeBase {
    mappings: MappingStore,
    metadata: Arc<dyn DatabaseMetadata>,
    ontology: Arc<Ontology>,
    hierarchy: Arc<dyn OntologyHierarchy>,
}

impl KnowledgeBase {
    /// Build a knowledge base whose taxonomy is computed from `ontology`.
    pub fn new(
        mappings: MappingSet,
        metadata: Arc<dyn DatabaseMetadata>,
        ontology: Ontology,
    ) -> Self {
        let hierarchy: Arc<dyn OntologyHierarchy> = Arc::new(Taxonomy::from_ontology(&ontology));
        Self::from_parts(mappings, metadata, Arc::new(ontology), hierarchy)
    }

    pub fn from_parts(
        mappings: MappingSet,
        metadata: Arc<dyn DatabaseMetadata>,
        ontology: Arc<Ontology>,
        hierarchy: Arc<dyn OntologyHierarchy>,
    ) -> Self {
        Self {
            mappings: MappingStore::Mutable(mappings),
            metadata,
            ontology,
            hierarchy,
        }
    }

    /// Current mappings, whichever state they are in.
    pub fn mappings(&self) -> &MappingSet {
        match &self.mappings {
            MappingStore::Mutable(set) => set,
            MappingStore::Published(snapshot) => snapshot,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self.mappings, MappingStore::Published(_))
    }

    /// Freeze the mappings. Later calls return the same snapshot.
    pub fn publish(&mut self) -> ReadOnlyMappingSet {
        if let MappingStore::Mutable(set) = &mut self.mappings {
            let snapshot = std::mem::take(set).snapshot();
            tracing::debug!(mappings = snapshot.len(), "mapping set published");
            self.mappings = MappingStore::Published(snapshot);
        }
        match &self.mappings {
            MappingStore::Published(snapshot) => snapshot.clone(),
            MappingStore::Mutable(set) => set.snapshot(),
        }
    }

    /// Move the working set out for a pass; must be put back with
    /// [`KnowledgeBase::put_mappings`].
    pub fn take_mappings(&mut self) -> Result<MappingSet, OptimizeError> {
        match &mut self.mappings {
            MappingStore::Mutable(set) => Ok(std::mem::take(set)),
            MappingStore::Published(_) => Err(OptimizeError::ImmutableMappingSet),
        }
    }

    pub fn put_mappings(&mut self, mappings: MappingSet) -> Result<(), OptimizeError> {
        match &mut self.mappings {
            MappingStore::Mutable(set) => {
                *set = mappings;
                Ok(())
            }
            MappingStore::Published(_) => Err(OptimizeError::ImmutableMappingSet),
        }
    }

    pub fn metadata(&self) -> &dyn DatabaseMetadata {
        self.metadata.as_ref()
    }

    pub fn metadata_arc(&self) -> Arc<dyn DatabaseMetadata> {
        Arc::clone(&self.metadata)
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn hierarchy(&self) -> &dyn OntologyHierarchy {
        self.hierarchy.as_ref()
    }

    pub fn hierarchy_arc(&self) -> Arc<dyn OntologyHierarchy> {
        Arc::clone(&self.hierarchy)
    }
}
