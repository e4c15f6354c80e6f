//! SQL-level clean-up of unfolded queries.

use crate::unfold::{UnfoldedBranch, UnfoldedQuery};
use obda_model::{BinaryOp, ColumnRef, FromExpr, SqlExpr, SqlQuery, SqlValue, TableRef};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizationError {
    #[error("all {0} unfolded branches are unsatisfiable")]
    Unsatisfiable(usize),
}

pub trait SqlOptimizer: Send + Sync {
    fn optimize(&self, query: UnfoldedQuery) -> Result<UnfoldedQuery, OptimizationError>;
}

/// Leaves the unfolded query as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSqlOptimizer;

impl SqlOptimizer for NoopSqlOptimizer {
    fn optimize(&self, query: UnfoldedQuery) -> Result<UnfoldedQuery, OptimizationError> {
        Ok(query)
    }
}

/// Inlines single-table derived tables, folds constant comparisons and
/// removes duplicate branches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSqlOptimizer;

impl SqlOptimizer for DefaultSqlOptimizer {
    fn optimize(&self, query: UnfoldedQuery) -> Result<UnfoldedQuery, OptimizationError> {
        let before = query.branches.len();
        let mut seen = HashSet::new();
        let mut branches = Vec::with_capacity(before);
        for branch in query.branches {
            let Some(query) = simplify_where(flatten(branch.query)) else {
                continue;
            };
            let branch = UnfoldedBranch {
                query,
                types: branch.types,
            };
            if seen.insert(branch.clone()) {
                branches.push(branch);
            }
        }
        if before > 0 && branches.is_empty() {
            return Err(OptimizationError::Unsatisfiable(before));
        }
        tracing::debug!(before, after = branches.len(), "SQL optimized");
        Ok(UnfoldedQuery { branches, ..query })
    }
}

// ============================================================================
// Derived-table inlining
// ============================================================================

/// Output columns and WHERE conjuncts of an inlined derived table.
struct Inlined {
    outputs: BTreeMap<String, SqlExpr>,
    filters: Vec<SqlExpr>,
}

/// `(SELECT t.a AS x FROM t WHERE c) AS v` becomes `t AS v`, with `v.x`
/// rewritten to `v.a` and `c` moved to the outer WHERE.
fn inline_subquery(sub: &SqlQuery, alias: &str) -> Option<(TableRef, Inlined)> {
    if sub.distinct {
        return None;
    }
    let table = sub.single_table()?;
    let inner_name = table.visible_name();
    let requalify = |c: &ColumnRef| match c.relation.as_deref() {
        None => SqlExpr::column(alias, &c.column),
        Some(relation) if relation == inner_name && c.schema.is_none() => {
            SqlExpr::column(alias, &c.column)
        }
        Some(_) => SqlExpr::Column(c.clone()),
    };
    let mut outputs = BTreeMap::new();
    for item in &sub.select {
        let name = item.output_name()?;
        outputs.insert(name.to_string(), item.expr.map_columns(&requalify));
    }
    let filters = sub.where_clause.iter().map(|e| e.map_columns(&requalify)).collect();
    let inlined = TableRef {
        relation: table.relation.clone(),
        alias: Some(alias.to_string()),
    };
    Some((inlined, Inlined { outputs, filters }))
}

fn flatten_from(from: FromExpr, inlined: &mut BTreeMap<String, Inlined>) -> FromExpr {
    match from {
        FromExpr::SubQuery(sub) => match inline_subquery(&sub.query, &sub.alias) {
            Some((table, columns)) => {
                inlined.insert(sub.alias.clone(), columns);
                FromExpr::Table(table)
            }
            None => FromExpr::SubQuery(sub),
        },
        FromExpr::Join(mut join) => {
            join.left = flatten_from(join.left, inlined);
            join.right = flatten_from(join.right, inlined);
            FromExpr::Join(join)
        }
        table @ FromExpr::Table(_) => table,
    }
}

fn flatten(query: SqlQuery) -> SqlQuery {
    let SqlQuery {
        select,
        from,
        where_clause,
        distinct,
    } = query;
    // Join conditions name derived-table columns directly; leave those trees alone.
    if has_join_conditions(&from) {
        return SqlQuery {
            select,
            from,
            where_clause,
            distinct,
        };
    }
    let original = SqlQuery {
        select: select.clone(),
        from: from.clone(),
        where_clause: where_clause.clone(),
        distinct,
    };
    let mut inlined = BTreeMap::new();
    let from = flatten_from(from, &mut inlined);
    if inlined.is_empty() {
        return original;
    }

    let resolvable = |c: &ColumnRef| match c.relation.as_deref().and_then(|r| inlined.get(r)) {
        Some(columns) => columns.outputs.contains_key(&c.column),
        None => true,
    };
    let all_resolvable = select
        .iter()
        .map(|item| &item.expr)
        .chain(&where_clause)
        .all(|e| e.columns().into_iter().all(resolvable));
    if !all_resolvable {
        return original;
    }

    let rewrite = |c: &ColumnRef| {
        c.relation
            .as_deref()
            .and_then(|r| inlined.get(r))
            .and_then(|columns| columns.outputs.get(&c.column).cloned())
            .unwrap_or_else(|| SqlExpr::Column(c.clone()))
    };
    let select = select
        .into_iter()
        .map(|mut item| {
            // Keep the visible name when the rewritten column would change it.
            if item.alias.is_none() {
                item.alias = item.output_name().map(str::to_string);
            }
            item.expr = item.expr.map_columns(&rewrite);
            item
        })
        .collect();
    let mut where_clause: BTreeSet<SqlExpr> =
        where_clause.iter().map(|e| e.map_columns(&rewrite)).collect();
    for columns in inlined.into_values() {
        where_clause.extend(columns.filters);
    }
    SqlQuery {
        select,
        from,
        where_clause,
        distinct,
    }
}

fn has_join_conditions(from: &FromExpr) -> bool {
    match from {
        FromExpr::Join(join) => {
            !join.conditions.is_empty()
                || !join.filters.is_empty()
                || has_join_conditions(&join.left)
                || has_join_conditions(&join.right)
        }
        _ => false,
    }
}

// ============================================================================
// Constant folding
// ============================================================================

enum Truth {
    True,
    False,
    Unknown,
}

fn truth(expr: &SqlExpr) -> Truth {
    match expr {
        SqlExpr::Value(SqlValue::Boolean(true)) => Truth::True,
        SqlExpr::Value(SqlValue::Boolean(false)) => Truth::False,
        SqlExpr::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (SqlExpr::Value(SqlValue::Null), _) | (_, SqlExpr::Value(SqlValue::Null)) => {
                Truth::Unknown
            }
            (SqlExpr::Value(a), SqlExpr::Value(b)) if a == b => Truth::True,
            (SqlExpr::Value(_), SqlExpr::Value(_)) => Truth::False,
            _ => Truth::Unknown,
        },
        _ => Truth::Unknown,
    }
}

/// Drops always-true conjuncts; `None` when a conjunct is always false.
fn simplify_where(mut query: SqlQuery) -> Option<SqlQuery> {
    let mut kept = BTreeSet::new();
    for conjunct in std::mem::take(&mut query.where_clause) {
        match truth(&conjunct) {
            Truth::True => {}
            Truth::False => return None,
            Truth::Unknown => {
                kept.insert(conjunct);
            }
        }
    }
    query.where_clause = kept;
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unfold::TermType;
    use obda_model::{JoinKind, SelectItem};

    fn employees() -> SqlQuery {
        SqlQuery::from_table("Employee", &["id", "name"])
            .with_filter(SqlExpr::binary(
                BinaryOp::Gt,
                SqlExpr::column("Employee", "id"),
                SqlExpr::Value(SqlValue::Number("0".into())),
            ))
    }

    fn unfolded(branches: Vec<SqlQuery>) -> UnfoldedQuery {
        UnfoldedQuery {
            columns: vec!["x".into()],
            branches: branches
                .into_iter()
                .map(|query| UnfoldedBranch {
                    query,
                    types: vec![TermType::Iri],
                })
                .collect(),
            distinct: false,
            distinct_union: false,
        }
    }

    fn over_v0(where_clause: Vec<SqlExpr>) -> SqlQuery {
        let mut query = SqlQuery::new(
            vec![SelectItem::aliased(SqlExpr::column("v0", "name"), "x")],
            FromExpr::subquery(employees(), "v0"),
        );
        query.where_clause.extend(where_clause);
        query
    }

    #[test]
    fn single_table_subqueries_are_inlined() {
        let optimized = DefaultSqlOptimizer.optimize(unfolded(vec![over_v0(vec![])])).unwrap();
        let query = &optimized.branches[0].query;
        assert_eq!(query.from.tables()[0].visible_name(), "v0");
        assert_eq!(query.select[0].expr, SqlExpr::column("v0", "name"));
        assert!(query.where_clause.contains(&SqlExpr::binary(
            BinaryOp::Gt,
            SqlExpr::column("v0", "id"),
            SqlExpr::Value(SqlValue::Number("0".into()))
        )));
    }

    #[test]
    fn joins_of_subqueries_are_inlined_on_both_sides() {
        let query = SqlQuery::new(
            vec![SelectItem::aliased(SqlExpr::column("v1", "id"), "x")],
            FromExpr::join(
                JoinKind::Inner,
                FromExpr::subquery(employees(), "v0"),
                FromExpr::subquery(employees(), "v1"),
            ),
        )
        .with_filter(SqlExpr::equals(
            SqlExpr::column("v0", "id"),
            SqlExpr::column("v1", "id"),
        ));
        let optimized = DefaultSqlOptimizer.optimize(unfolded(vec![query])).unwrap();
        let flattened = &optimized.branches[0].query;
        assert_eq!(flattened.from.tables().len(), 2);
        assert!(!flattened.has_subquery());
        assert_eq!(flattened.where_clause.len(), 3);
    }

    #[test]
    fn contradictions_drop_branches_and_duplicates_collapse() {
        let tautology = SqlExpr::equals(SqlExpr::string("a"), SqlExpr::string("a"));
        let contradiction = SqlExpr::equals(SqlExpr::string("a"), SqlExpr::string("b"));
        let optimized = DefaultSqlOptimizer
            .optimize(unfolded(vec![
                over_v0(vec![tautology]),
                over_v0(vec![]),
                over_v0(vec![contradiction.clone()]),
            ]))
            .unwrap();
        assert_eq!(optimized.branches.len(), 1);

        let err = DefaultSqlOptimizer
            .optimize(unfolded(vec![over_v0(vec![contradiction])]))
            .unwrap_err();
        assert_eq!(err, OptimizationError::Unsatisfiable(1));
    }
}
