use obda_model::{MappingError, MappingKind};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("the mapping set has been published and can no longer be optimized")]
    ImmutableMappingSet,
    #[error("{} mapping signature(s) are not declared in the ontology: {}", .0.len(), list(.0))]
    UndeclaredSignatures(Vec<UndeclaredSignature>),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// A mapping whose signature has no matching declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UndeclaredSignature {
    pub mapping: String,
    pub signature: String,
    pub kind: MappingKind,
}

impl fmt::Display for UndeclaredSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> (mapping `{}`)", self.kind, self.signature, self.mapping)
    }
}

fn list(items: &[UndeclaredSignature]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
