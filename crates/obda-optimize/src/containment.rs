//! Mapping containment under foreign-key rules.
//!
//! `is_contained(source, target, rules)` answers whether every triple
//! produced by `target` is already produced by `source` once the database
//! satisfies the rules:
//!
//! 1. both heads are rewritten onto canonical `table.column` variables
//! 2. the source head and the source table atom are frozen
//! 3. each rule whose head is the target's table is tried in turn: the frozen
//!    table atom is unified with the rule body, the substitution is applied
//!    to the target head, and the frozen result is compared with the frozen
//!    source head
//!
//! Only simple mappings qualify: one base table, plain column projections, no
//! WHERE and no mapping-level filters.

use crate::freeze::{freeze_atom, freeze_triple};
use obda_model::{
    unify, DatabaseMetadata, ForeignKey, Mapping, Rule, Substitution, TableDefinition, Term,
    TripleAtom, Variable,
};
use std::fmt;
use thiserror::Error;

/// Why a mapping is outside the fragment the checker handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotApplicable {
    FunctionSelectItem,
    Join,
    SubQuery,
    WhereFilter,
    MappingFilter,
    UnknownTable(String),
    UnknownColumn(String),
    UnmappedHeadVariable(String),
}

impl NotApplicable {
    /// Reason without the offending name, used to aggregate skip counts.
    pub fn category(&self) -> &'static str {
        match self {
            NotApplicable::FunctionSelectItem => "function-valued select item",
            NotApplicable::Join => "join in source",
            NotApplicable::SubQuery => "sub-query in source",
            NotApplicable::WhereFilter => "where filter in source",
            NotApplicable::MappingFilter => "mapping-level filter",
            NotApplicable::UnknownTable(_) => "unknown table",
            NotApplicable::UnknownColumn(_) => "unknown column",
            NotApplicable::UnmappedHeadVariable(_) => "head variable not projected",
        }
    }
}

impl fmt::Display for NotApplicable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotApplicable::UnknownTable(name)
            | NotApplicable::UnknownColumn(name)
            | NotApplicable::UnmappedHeadVariable(name) => {
                write!(f, "{} `{name}`", self.category())
            }
            _ => f.write_str(self.category()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mapping `{mapping}` cannot be checked for containment: {reason}")]
pub struct MappingContainmentCheckError {
    pub mapping: String,
    pub reason: NotApplicable,
}

/// A mapping rewritten onto its table's canonical column variables.
#[derive(Debug, Clone)]
struct CanonicalMapping<'a> {
    table: &'a TableDefinition,
    head: TripleAtom,
}

pub struct MappingContainmentChecker<'a> {
    metadata: &'a dyn DatabaseMetadata,
}

impl<'a> MappingContainmentChecker<'a> {
    pub fn new(metadata: &'a dyn DatabaseMetadata) -> Self {
        Self { metadata }
    }

    pub fn is_contained(
        &self,
        source: &Mapping,
        target: &Mapping,
        rules: &[Rule],
    ) -> Result<bool, MappingContainmentCheckError> {
        let source = self.canonicalize(source)?;
        let target = self.canonicalize(target)?;

        let frozen_head = freeze_triple(&source.head);
        let frozen_table = freeze_atom(&source.table.atom());
        let target_table = target.table.atom();

        for rule in rules {
            if rule.head.predicate != target_table.predicate {
                continue;
            }
            for body in &rule.body {
                let Ok(theta) = unify(&frozen_table, body) else {
                    continue;
                };
                if freeze_triple(&target.head.apply(&theta)) == frozen_head {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn canonicalize(
        &self,
        mapping: &Mapping,
    ) -> Result<CanonicalMapping<'a>, MappingContainmentCheckError> {
        let fail = |reason| MappingContainmentCheckError {
            mapping: mapping.id.clone(),
            reason,
        };
        let query = &mapping.source;

        if query.has_function_select() {
            return Err(fail(NotApplicable::FunctionSelectItem));
        }
        if query.has_subquery() {
            return Err(fail(NotApplicable::SubQuery));
        }
        let Some(table_ref) = query.single_table() else {
            return Err(fail(NotApplicable::Join));
        };
        if !query.where_clause.is_empty() {
            return Err(fail(NotApplicable::WhereFilter));
        }
        if !mapping.filters.is_empty() {
            return Err(fail(NotApplicable::MappingFilter));
        }
        let table = self
            .metadata
            .table(&table_ref.relation)
            .ok_or_else(|| fail(NotApplicable::UnknownTable(table_ref.relation.to_string())))?;

        let mut renaming = Substitution::new();
        for variable in mapping.head_variables() {
            let item = query
                .select_item(&variable.name)
                .ok_or_else(|| fail(NotApplicable::UnmappedHeadVariable(variable.name.clone())))?;
            let Some(column) = item.expr.as_column() else {
                return Err(fail(NotApplicable::FunctionSelectItem));
            };
            let definition = table
                .column(&column.column)
                .ok_or_else(|| fail(NotApplicable::UnknownColumn(column.qualified_name())))?;
            renaming.bind(
                variable,
                Term::Variable(Variable::new(table.column_variable(&definition.name))),
            );
        }

        Ok(CanonicalMapping {
            table,
            head: mapping.head().apply(&renaming),
        })
    }
}

/// One rule per foreign key: `from(..fk..) -> to(..pk := fk..)`.
///
/// Body variables are renamed apart from the head before the key columns are
/// bound, so a table referencing itself keeps its other columns independent.
pub fn foreign_key_rules(metadata: &dyn DatabaseMetadata) -> Vec<Rule> {
    metadata
        .foreign_keys()
        .into_iter()
        .enumerate()
        .filter_map(|(n, fk)| {
            let from = metadata.table(&fk.from_table)?;
            let to = metadata.table(&fk.to_table)?;
            foreign_key_rule(n, fk, from, to)
        })
        .collect()
}

fn foreign_key_rule(
    n: usize,
    fk: &ForeignKey,
    from: &TableDefinition,
    to: &TableDefinition,
) -> Option<Rule> {
    let fresh = |column: &str| Variable::new(format!("fk{n}:{}", to.column_variable(column)));
    let mut binding: Substitution = to
        .columns
        .iter()
        .map(|c| {
            (
                Variable::new(to.column_variable(&c.name)),
                Term::Variable(fresh(&c.name)),
            )
        })
        .collect();
    for column in &fk.columns {
        let pk = to.column(&column.pk_column)?;
        let fk_column = from.column(&column.fk_column)?;
        binding = binding.compose(&Substitution::singleton(
            fresh(&pk.name),
            Term::var(from.column_variable(&fk_column.name)),
        ));
    }
    Some(Rule::new(from.atom(), vec![to.atom().apply(&binding)]))
}
