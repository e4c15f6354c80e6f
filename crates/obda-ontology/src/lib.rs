//! Ontologies for the OBDA engine.
//!
//! - `owl`: the OWL 2 QL axioms the engine consults
//! - `rdf` / `loader`: N-Triples, Turtle and RDF/XML documents read with
//!   Sophia and turned into axioms
//! - `hierarchy`: the class/property taxonomy queried by the mapping
//!   saturation pass, query reformulation and strict-mode validation

pub mod hierarchy;
pub mod loader;
pub mod owl;
pub mod rdf;

pub use hierarchy::{OntologyHierarchy, Reach, Taxonomy};
pub use owl::{
    AxiomKind, ClassExpression, EntityKind, Ontology, OwlAxiom, PropertyCharacteristic,
    PropertyExpression,
};
pub use rdf::RdfFormat;

use std::io::BufReader;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum OwlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
    #[error("invalid RDF term: {0}")]
    Term(String),
    #[error("unsupported ontology format: .{0}")]
    UnsupportedFormat(String),
}

/// Parse an ontology document held in memory.
pub fn parse_ontology(text: &str, format: RdfFormat) -> Result<Ontology, OwlError> {
    let statements = rdf::parse_statements(text.as_bytes(), format)?;
    Ok(loader::ontology_from_statements(&statements))
}

/// Load an ontology file; the format follows the extension
/// (`.nt`, `.ttl`, `.owl`/`.rdf`/`.xml`).
pub fn load_ontology(path: &Path) -> Result<Ontology, OwlError> {
    let format = RdfFormat::from_path(path)?;
    let file = std::fs::File::open(path)?;
    let statements = rdf::parse_statements(BufReader::new(file), format)?;
    let ontology = loader::ontology_from_statements(&statements);
    tracing::debug!(
        path = %path.display(),
        statements = statements.len(),
        axioms = ontology.axioms.len(),
        declarations = ontology.declarations.len(),
        "ontology loaded"
    );
    Ok(ontology)
}
