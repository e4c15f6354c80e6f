//! Loading the inputs every command shares: schema, ontology, mappings and
//! engine configuration.

use anyhow::{Context, Result};
use clap::Args;
use obda_dsl::load_mappings;
use obda_model::{DbMetadata, MappingSet};
use obda_ontology::{load_ontology, Ontology};
use obda_optimize::KnowledgeBase;
use obda_sql::{load_sql_ddl, SqlDialect, SqlFrontend};
use obda_translate::EngineConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct Inputs {
    /// Database schema: DDL script (`.sql`) or table definitions (`.json`)
    #[arg(short, long)]
    pub schema: PathBuf,
    /// Mapping document (`.obda` or `.json`)
    #[arg(short, long)]
    pub mappings: PathBuf,
    /// Ontology (`.nt`, `.ttl`, `.owl`/`.rdf`/`.xml`)
    #[arg(short, long)]
    pub ontology: Option<PathBuf>,
    /// Engine configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the configured SQL dialect (ansi, postgres, mysql)
    #[arg(long)]
    pub dialect: Option<SqlDialect>,
    /// Fail on mappings whose signature the ontology does not declare
    #[arg(long)]
    pub strict: bool,
}

pub struct Loaded {
    pub config: EngineConfig,
    pub kb: KnowledgeBase,
}

fn load_schema(path: &Path) -> Result<DbMetadata> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return load_sql_ddl(path);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid schema JSON {}", path.display()))
}

impl Inputs {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        config.strict_mode |= self.strict;
        Ok(config)
    }

    pub fn load(&self) -> Result<Loaded> {
        let config = self.engine_config()?;
        let metadata = load_schema(&self.schema)?;
        let ontology = match &self.ontology {
            Some(path) => load_ontology(path)
                .with_context(|| format!("failed to load ontology {}", path.display()))?,
            None => Ontology::new(),
        };
        let mappings: MappingSet = load_mappings(&self.mappings, &SqlFrontend::with_metadata(&metadata))
            .with_context(|| format!("failed to load mappings {}", self.mappings.display()))?;
        tracing::info!(
            tables = metadata.len(),
            axioms = ontology.axioms.len(),
            mappings = mappings.len(),
            "inputs loaded"
        );
        Ok(Loaded {
            config,
            kb: KnowledgeBase::new(mappings, Arc::new(metadata), ontology),
        })
    }
}
