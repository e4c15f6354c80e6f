//! Merging mappings that differ only in their WHERE conditions.
//!
//! `SELECT .. FROM t WHERE a` and `SELECT .. FROM t WHERE b` under the same
//! target become `SELECT .. FROM t WHERE (a) OR (b)`.

use crate::knowledge_base::KnowledgeBase;
use crate::processor::{MappingProcessor, ProcessorKind, ProcessorOutput, ProcessorReport};
use obda_model::{Mapping, MappingSet, SqlExpr};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct DisjunctionProcessor;

impl MappingProcessor for DisjunctionProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Disjunction
    }

    fn process(&self, mut mappings: MappingSet, _kb: &KnowledgeBase) -> ProcessorOutput {
        let mut report = ProcessorReport::new(self.kind(), mappings.len());

        let signatures: Vec<String> = mappings.signatures().map(str::to_string).collect();
        for signature in signatures {
            let Some(group) = mappings.group(&signature) else {
                continue;
            };
            if group.len() < 2 {
                continue;
            }
            let mut working: Vec<Mapping> = group.iter().cloned().collect();
            let mut merged = 0usize;

            let mut i = 0;
            while i < working.len() {
                let mut j = i + 1;
                while j < working.len() {
                    match merge(&working[i], &working[j]) {
                        Some(combined) => {
                            tracing::trace!(kept = %working[i].id, merged = %working[j].id, "mappings merged");
                            working[i] = combined;
                            working.remove(j);
                            merged += 1;
                        }
                        None => j += 1,
                    }
                }
                i += 1;
            }

            if merged > 0 {
                tracing::debug!(signature = %signature, merged, "disjunctive mappings merged");
                mappings.replace_group(&signature, working);
            }
        }

        report.after = mappings.len();
        report.removed = report.before - report.after;
        ProcessorOutput { mappings, report }
    }
}

/// The disjunction of two mappings, when they share everything but WHERE.
fn merge(left: &Mapping, right: &Mapping) -> Option<Mapping> {
    let (a, b) = (&left.source, &right.source);
    if left.head() != right.head()
        || a.from != b.from
        || a.select != b.select
        || a.distinct != b.distinct
        || left.filters != right.filters
    {
        return None;
    }
    let mut merged = left.clone();
    merged.source.where_clause = merge_conditions(&a.where_clause, &b.where_clause);
    Some(merged)
}

/// AND within each side, OR across. An empty side yields the other side;
/// identical sides are kept as they are.
pub fn merge_conditions(left: &BTreeSet<SqlExpr>, right: &BTreeSet<SqlExpr>) -> BTreeSet<SqlExpr> {
    if left.is_empty() {
        return right.clone();
    }
    if right.is_empty() || left == right {
        return left.clone();
    }
    match (
        SqlExpr::and_all(left.iter().cloned()),
        SqlExpr::and_all(right.iter().cloned()),
    ) {
        (Some(a), Some(b)) => BTreeSet::from([SqlExpr::or(a, b)]),
        _ => left.clone(),
    }
}
