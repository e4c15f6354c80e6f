//! Mapping-set passes and the pipeline that runs them.
//!
//! A pass receives the working set by value and hands back a new one; the
//! knowledge base swaps it in. Per-item failures never abort a pass: they are
//! counted per reason in the pass report.

use crate::disjunction::DisjunctionProcessor;
use crate::error::OptimizeError;
use crate::knowledge_base::KnowledgeBase;
use crate::referential_integrity::ReferentialIntegrityProcessor;
use crate::tmapping::TMappingProcessor;
use obda_model::MappingSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Kinds & reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessorKind {
    TMapping,
    ReferentialIntegrity,
    Disjunction,
}

impl ProcessorKind {
    pub const ALL: [ProcessorKind; 3] = [
        ProcessorKind::TMapping,
        ProcessorKind::ReferentialIntegrity,
        ProcessorKind::Disjunction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessorKind::TMapping => "t-mapping",
            ProcessorKind::ReferentialIntegrity => "referential-integrity",
            ProcessorKind::Disjunction => "disjunction",
        }
    }

    pub fn build(self) -> Box<dyn MappingProcessor + Send + Sync> {
        match self {
            ProcessorKind::TMapping => Box::new(TMappingProcessor),
            ProcessorKind::ReferentialIntegrity => Box::new(ReferentialIntegrityProcessor),
            ProcessorKind::Disjunction => Box::new(DisjunctionProcessor),
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                format!("unknown processor `{s}` (expected t-mapping, referential-integrity or disjunction)")
            })
    }
}

/// What one pass did to the mapping set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorReport {
    pub processor: ProcessorKind,
    pub before: usize,
    pub after: usize,
    pub added: usize,
    pub removed: usize,
    /// Skipped items, counted per reason.
    #[serde(default)]
    pub skipped: BTreeMap<String, usize>,
}

impl ProcessorReport {
    pub fn new(processor: ProcessorKind, before: usize) -> Self {
        Self {
            processor,
            before,
            after: before,
            added: 0,
            removed: 0,
            skipped: BTreeMap::new(),
        }
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        *self.skipped.entry(reason.into()).or_default() += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl fmt::Display for ProcessorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} mappings (+{} / -{})",
            self.processor, self.before, self.after, self.added, self.removed
        )?;
        if !self.skipped.is_empty() {
            write!(f, ", {} skipped", self.skipped_total())?;
        }
        Ok(())
    }
}

pub struct ProcessorOutput {
    pub mappings: MappingSet,
    pub report: ProcessorReport,
}

// ============================================================================
// Traits
// ============================================================================

/// A pass over the mapping set.
pub trait MappingProcessor {
    fn kind(&self) -> ProcessorKind;

    fn process(&self, mappings: MappingSet, kb: &KnowledgeBase) -> ProcessorOutput;
}

/// Runs a pass against a knowledge base, replacing its mappings.
pub trait KnowledgeBaseProcessor {
    fn optimize(&self, kb: &mut KnowledgeBase) -> Result<ProcessorReport, OptimizeError>;
}

impl<P: MappingProcessor + ?Sized> KnowledgeBaseProcessor for P {
    fn optimize(&self, kb: &mut KnowledgeBase) -> Result<ProcessorReport, OptimizeError> {
        let working = kb.take_mappings()?;
        let ProcessorOutput { mappings, report } = self.process(working, kb);
        kb.put_mappings(mappings)?;

        if !report.skipped.is_empty() {
            tracing::debug!(processor = %report.processor, skipped = ?report.skipped, "items skipped");
        }
        tracing::info!(
            processor = %report.processor,
            before = report.before,
            after = report.after,
            added = report.added,
            removed = report.removed,
            "mapping pass finished"
        );
        Ok(report)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The configured passes, run in order.
pub struct OptimizerPipeline {
    processors: Vec<Box<dyn MappingProcessor + Send + Sync>>,
}

impl Default for OptimizerPipeline {
    fn default() -> Self {
        Self::from_kinds(&ProcessorKind::ALL)
    }
}

impl OptimizerPipeline {
    pub fn new(processors: Vec<Box<dyn MappingProcessor + Send + Sync>>) -> Self {
        Self { processors }
    }

    pub fn from_kinds(kinds: &[ProcessorKind]) -> Self {
        Self::new(kinds.iter().map(|k| k.build()).collect())
    }

    pub fn kinds(&self) -> Vec<ProcessorKind> {
        self.processors.iter().map(|p| p.kind()).collect()
    }

    pub fn run(&self, kb: &mut KnowledgeBase) -> Result<Vec<ProcessorReport>, OptimizeError> {
        self.processors
            .iter()
            .map(|processor| processor.optimize(kb))
            .collect()
    }
}
