//! The query translator: SPARQL text in, SQL text and column metadata out.
//!
//! Stages run in a fixed order with no retries:
//!
//! ```text
//! Parse → Reformulate → Unfold → Optimize → Render → DeriveMetadata
//! ```
//!
//! A failure in any stage is reported once, tagged with the stage and the
//! original query text.

use crate::context::EngineContext;
use crate::metadata::{derive_metadata, ColumnMetadata, MetadataError};
use crate::optimize::OptimizationError;
use crate::reformulate::ReformulationError;
use crate::sparql::SparqlError;
use crate::unfold::UnfoldingError;
use obda_sql::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Parse,
    Reformulate,
    Unfold,
    Optimize,
    Render,
    DeriveMetadata,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Parse => "parse",
            Stage::Reformulate => "reformulate",
            Stage::Unfold => "unfold",
            Stage::Optimize => "optimize",
            Stage::Render => "render",
            Stage::DeriveMetadata => "derive-metadata",
        })
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Sparql(#[from] SparqlError),
    #[error(transparent)]
    Reformulation(#[from] ReformulationError),
    #[error(transparent)]
    Unfolding(#[from] UnfoldingError),
    #[error("no mapping answers the query, so no SQL was produced")]
    NoSqlProduced,
    #[error(transparent)]
    Optimization(#[from] OptimizationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct TranslationError {
    pub stage: Stage,
    pub query: String,
    #[source]
    pub source: StageError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub sql: String,
    pub columns: Vec<ColumnMetadata>,
}

#[derive(Clone)]
pub struct QueryTranslator {
    context: Arc<EngineContext>,
}

impl QueryTranslator {
    pub fn new(context: Arc<EngineContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn translate(&self, query: &str) -> Result<TranslationResult, TranslationError> {
        let fail = |stage: Stage| {
            move |source: StageError| TranslationError {
                stage,
                query: query.to_string(),
                source,
            }
        };
        let ctx = &self.context;

        let parsed = ctx
            .parser()
            .parse(query)
            .map_err(|e| fail(Stage::Parse)(e.into()))?;
        tracing::debug!(branches = parsed.branches.len(), atoms = parsed.atom_count(), "parsed");

        let reformulated = ctx
            .reformulator()
            .reformulate(parsed)
            .map_err(|e| fail(Stage::Reformulate)(e.into()))?;
        tracing::debug!(branches = reformulated.branches.len(), "reformulated");

        let unfolded = ctx
            .unfolder()
            .unfold(&reformulated, ctx.mappings())
            .map_err(|e| fail(Stage::Unfold)(e.into()))?;
        tracing::debug!(branches = unfolded.branches.len(), "unfolded");
        if unfolded.is_empty() {
            return Err(fail(Stage::Unfold)(StageError::NoSqlProduced));
        }

        let optimized = ctx
            .optimizer()
            .optimize(unfolded)
            .map_err(|e| fail(Stage::Optimize)(e.into()))?;

        let sql = ctx
            .renderer()
            .render_union(&optimized.to_union())
            .map_err(|e| fail(Stage::Render)(e.into()))?;
        tracing::debug!(bytes = sql.len(), "rendered");

        let columns =
            derive_metadata(&optimized).map_err(|e| fail(Stage::DeriveMetadata)(e.into()))?;
        Ok(TranslationResult { sql, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineConfig;
    use obda_model::{DbMetadata, Mapping, MappingSet, SqlQuery, Term};
    use obda_ontology::{Ontology, Taxonomy};

    fn translator() -> QueryTranslator {
        let mappings = MappingSet::from(vec![Mapping::class(
            "emp",
            "http://ex.org/Employee",
            Term::uri_template("http://ex.org/emp/{}", vec![Term::var("id")]),
            SqlQuery::from_table("Employee", &["id"]),
        )]);
        let context = EngineContext::new(
            EngineConfig::default(),
            mappings.snapshot(),
            Arc::new(DbMetadata::new()),
            Arc::new(Taxonomy::from_ontology(&Ontology::new())),
        );
        QueryTranslator::new(Arc::new(context))
    }

    #[test]
    fn employee_query_translates() {
        let result = translator()
            .translate("SELECT ?x WHERE { ?x a <http://ex.org/Employee> }")
            .unwrap();
        assert_eq!(
            result.sql,
            "SELECT 'http://ex.org/emp/' || CAST(v0.id AS VARCHAR) AS x\nFROM Employee AS v0"
        );
        assert_eq!(result.columns.len(), 1);
        assert!(!result.columns[0].is_literal);
    }

    #[test]
    fn failures_carry_stage_and_query() {
        let text = "SELECT ?x WHERE { ?x a }";
        let err = translator().translate(text).unwrap_err();
        assert_eq!(err.stage, Stage::Parse);
        assert_eq!(err.query, text);

        let err = translator()
            .translate("SELECT ?x WHERE { ?x a <http://ex.org/Unmapped> }")
            .unwrap_err();
        assert_eq!(err.stage, Stage::Unfold);
        assert!(matches!(err.source, StageError::NoSqlProduced));
    }
}
