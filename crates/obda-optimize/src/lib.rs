//! Mapping-set optimization for the OBDA engine.
//!
//! - `freeze` / `containment`: mapping containment under foreign-key rules
//! - `tmapping`: saturation of the mappings along the ontology taxonomy
//! - `referential_integrity`: removal of mappings implied by foreign keys
//! - `disjunction`: merging of mappings that differ only in WHERE
//! - `knowledge_base` / `processor`: the knowledge base the passes run
//!   against, and the pipeline that runs them in order
//! - `validate`: strict-mode signature checks

pub mod containment;
pub mod disjunction;
pub mod error;
pub mod freeze;
pub mod knowledge_base;
pub mod processor;
pub mod referential_integrity;
pub mod tmapping;
pub mod validate;

pub use containment::{
    foreign_key_rules, MappingContainmentCheckError, MappingContainmentChecker, NotApplicable,
};
pub use disjunction::DisjunctionProcessor;
pub use error::{OptimizeError, UndeclaredSignature};
pub use freeze::{freeze_atom, freeze_term, freeze_triple};
pub use knowledge_base::{KnowledgeBase, MappingStore};
pub use processor::{
    KnowledgeBaseProcessor, MappingProcessor, OptimizerPipeline, ProcessorKind, ProcessorOutput,
    ProcessorReport,
};
pub use referential_integrity::ReferentialIntegrityProcessor;
pub use tmapping::TMappingProcessor;
pub use validate::{undeclared_signatures, validate_signatures};
