//! SPARQL-to-SQL translation for the OBDA engine.
//!
//! - `sparql` / `query`: SPARQL text → unions of conjunctive queries
//! - `reformulate`: optional rewriting along the ontology taxonomy
//! - `unfold`: conjunctive queries → SQL branches over the mapping sources
//! - `optimize`: SQL-level clean-up of the unfolded branches
//! - `metadata`: per-column RDF kind and datatype of the result
//! - `context` / `pipeline`: the engine configuration, the shared context and
//!   the `QueryTranslator` that chains the stages

pub mod context;
pub mod metadata;
pub mod optimize;
pub mod pipeline;
pub mod query;
pub mod reformulate;
pub mod sparql;
pub mod unfold;

pub use context::{ConfigError, EngineConfig, EngineContext, DEFAULT_MAX_UNFOLDING_BRANCHES};
pub use metadata::{derive_metadata, ColumnMetadata, MetadataError};
pub use optimize::{DefaultSqlOptimizer, NoopSqlOptimizer, OptimizationError, SqlOptimizer};
pub use pipeline::{QueryTranslator, Stage, StageError, TranslationError, TranslationResult};
pub use query::{ConjunctiveQuery, SparqlQuery};
pub use reformulate::{
    IdentityReformulator, QueryReformulator, ReformulationError, ReformulationKind,
    TaxonomyReformulator,
};
pub use sparql::{parse_sparql, QueryParser, SparqlError, SparqlParser};
pub use unfold::{
    MappingUnfolder, TermType, UnfoldedBranch, UnfoldedQuery, Unfolder, UnfoldingError,
};
