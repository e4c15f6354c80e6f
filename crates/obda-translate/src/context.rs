//! Engine configuration and the shared, read-only translation context.

use crate::optimize::{DefaultSqlOptimizer, SqlOptimizer};
use crate::reformulate::{
    IdentityReformulator, QueryReformulator, ReformulationKind, TaxonomyReformulator,
};
use crate::sparql::{QueryParser, SparqlParser};
use crate::unfold::{MappingUnfolder, Unfolder};
use obda_model::{DatabaseMetadata, ReadOnlyMappingSet};
use obda_ontology::OntologyHierarchy;
use obda_optimize::{
    validate_signatures, KnowledgeBase, OptimizeError, OptimizerPipeline, ProcessorKind,
    ProcessorReport,
};
use obda_sql::{DialectRenderer, SqlDialect, SqlRenderer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_MAX_UNFOLDING_BRANCHES: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub dialect: SqlDialect,
    /// Reject mappings whose signature the ontology does not declare.
    pub strict_mode: bool,
    /// Mapping passes, run in this order.
    pub processors: Vec<ProcessorKind>,
    pub reformulation: ReformulationKind,
    pub max_unfolding_branches: usize,
    /// `UNION` instead of `UNION ALL` between branches.
    pub distinct_union: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            strict_mode: false,
            processors: ProcessorKind::ALL.to_vec(),
            reformulation: ReformulationKind::default(),
            max_unfolding_branches: DEFAULT_MAX_UNFOLDING_BRANCHES,
            distinct_union: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_unfolding_branches == 0 {
            return Err(ConfigError::Invalid(
                "max_unfolding_branches must be at least 1".into(),
            ));
        }
        for (i, kind) in self.processors.iter().enumerate() {
            if self.processors[..i].contains(kind) {
                return Err(ConfigError::Invalid(format!(
                    "processor `{kind}` is listed twice"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Context
// ============================================================================

/// Everything a translation reads. Immutable once built, so one context is
/// shared by every concurrent `translate` call.
pub struct EngineContext {
    config: EngineConfig,
    mappings: ReadOnlyMappingSet,
    metadata: Arc<dyn DatabaseMetadata>,
    hierarchy: Arc<dyn OntologyHierarchy>,
    parser: Box<dyn QueryParser>,
    reformulator: Box<dyn QueryReformulator>,
    unfolder: Box<dyn Unfolder>,
    optimizer: Box<dyn SqlOptimizer>,
    renderer: Box<dyn SqlRenderer>,
}

impl EngineContext {
    /// Context with the shipped collaborators, as selected by `config`.
    pub fn new(
        config: EngineConfig,
        mappings: ReadOnlyMappingSet,
        metadata: Arc<dyn DatabaseMetadata>,
        hierarchy: Arc<dyn OntologyHierarchy>,
    ) -> Self {
        let reformulator: Box<dyn QueryReformulator> = match config.reformulation {
            ReformulationKind::Identity => Box::new(IdentityReformulator),
            ReformulationKind::Taxonomy => Box::new(TaxonomyReformulator::new(
                hierarchy.clone(),
                config.max_unfolding_branches,
            )),
        };
        Self {
            parser: Box::new(SparqlParser),
            reformulator,
            unfolder: Box::new(MappingUnfolder::new(
                config.max_unfolding_branches,
                config.distinct_union,
            )),
            optimizer: Box::new(DefaultSqlOptimizer),
            renderer: Box::new(DialectRenderer::new(config.dialect)),
            config,
            mappings,
            metadata,
            hierarchy,
        }
    }

    /// Validate, optimize and publish the knowledge base, then build the
    /// context over the published mappings.
    pub fn prepare(
        config: EngineConfig,
        kb: &mut KnowledgeBase,
    ) -> Result<(Self, Vec<ProcessorReport>), OptimizeError> {
        validate_signatures(kb.mappings(), kb.hierarchy(), config.strict_mode)?;
        let reports = OptimizerPipeline::from_kinds(&config.processors).run(kb)?;
        let mappings = kb.publish();
        tracing::info!(
            mappings = mappings.len(),
            signatures = mappings.signatures().count(),
            "knowledge base published"
        );
        let context = Self::new(config, mappings, kb.metadata_arc(), kb.hierarchy_arc());
        Ok((context, reports))
    }

    pub fn with_parser(mut self, parser: Box<dyn QueryParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_reformulator(mut self, reformulator: Box<dyn QueryReformulator>) -> Self {
        self.reformulator = reformulator;
        self
    }

    pub fn with_unfolder(mut self, unfolder: Box<dyn Unfolder>) -> Self {
        self.unfolder = unfolder;
        self
    }

    pub fn with_optimizer(mut self, optimizer: Box<dyn SqlOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn SqlRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mappings(&self) -> &ReadOnlyMappingSet {
        &self.mappings
    }

    pub fn metadata(&self) -> &dyn DatabaseMetadata {
        self.metadata.as_ref()
    }

    pub fn hierarchy(&self) -> &dyn OntologyHierarchy {
        self.hierarchy.as_ref()
    }

    pub fn parser(&self) -> &dyn QueryParser {
        self.parser.as_ref()
    }

    pub fn reformulator(&self) -> &dyn QueryReformulator {
        self.reformulator.as_ref()
    }

    pub fn unfolder(&self) -> &dyn Unfolder {
        self.unfolder.as_ref()
    }

    pub fn optimizer(&self) -> &dyn SqlOptimizer {
        self.optimizer.as_ref()
    }

    pub fn renderer(&self) -> &dyn SqlRenderer {
        self.renderer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obda_model::{DbMetadata, Mapping, MappingSet, SqlQuery, Term};
    use obda_ontology::{EntityKind, Ontology};
    use std::io::Write;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = EngineConfig::from_json(r#"{"dialect": "postgres", "strict_mode": true}"#)
            .unwrap();
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert!(config.strict_mode);
        assert_eq!(config.processors, ProcessorKind::ALL.to_vec());
        assert_eq!(config.max_unfolding_branches, DEFAULT_MAX_UNFOLDING_BRANCHES);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"max_unfolding_branches": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"processors": ["disjunction", "disjunction"]}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"dialekt": "ansi"}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn config_files_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"reformulation": "taxonomy", "distinct_union": true}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.reformulation, ReformulationKind::Taxonomy);
        assert!(config.distinct_union);
        assert!(matches!(
            EngineConfig::load(Path::new("/nonexistent/obda.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn prepare_publishes_and_strict_mode_rejects_undeclared() {
        let mapping = Mapping::class(
            "emp",
            "http://ex.org/Employee",
            Term::uri_template("http://ex.org/emp/{}", vec![Term::var("id")]),
            SqlQuery::from_table("Employee", &["id"]),
        );
        let strict = EngineConfig {
            strict_mode: true,
            ..EngineConfig::default()
        };

        let mut kb = KnowledgeBase::new(
            MappingSet::from(vec![mapping.clone()]),
            Arc::new(DbMetadata::new()),
            Ontology::new(),
        );
        assert!(matches!(
            EngineContext::prepare(strict.clone(), &mut kb),
            Err(OptimizeError::UndeclaredSignatures(_))
        ));
        assert!(!kb.is_published());

        let mut ontology = Ontology::new();
        ontology.declare("http://ex.org/Employee", EntityKind::Class);
        let mut kb = KnowledgeBase::new(
            MappingSet::from(vec![mapping]),
            Arc::new(DbMetadata::new()),
            ontology,
        );
        let (context, reports) = EngineContext::prepare(strict, &mut kb).unwrap();
        assert!(kb.is_published());
        assert_eq!(reports.len(), 3);
        assert_eq!(context.mappings().len(), 1);
    }
}
