//! SELECT front-end: `sqlparser` AST → [`SqlQuery`].
//!
//! Only the fragment mapping sources are written in is accepted: a single
//! SELECT over base tables, derived tables and inner/left joins, with a
//! conjunctive WHERE clause. Grouping, ordering, limits and set operations
//! are rejected.
//!
//! Unqualified columns are attached to their relation when that is
//! unambiguous (a single relation in scope, or exactly one relation whose
//! known columns contain the name).

use obda_model::{
    BinaryOp, ColumnRef, DatabaseMetadata, FromExpr, Join, JoinCondition, JoinKind, RelationId,
    SelectItem, SqlExpr, SqlQuery, SqlValue, SubQuery, TableRef, UnaryOp,
};
use sqlparser::ast::{
    self, BinaryOperator, Distinct, Expr, FunctionArg, FunctionArgExpr, GroupByExpr, Ident,
    JoinConstraint, JoinOperator, ObjectName, Query, SetExpr, Statement, TableFactor,
    TableWithJoins, UnaryOperator,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum SqlFrontendError {
    #[error("SQL syntax error: {0}")]
    Syntax(String),
    #[error("expected exactly one SELECT statement")]
    NotASelect,
    #[error("unsupported SQL construct: {0}")]
    Unsupported(String),
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error("ambiguous column `{0}`")]
    AmbiguousColumn(String),
    #[error("derived table requires an alias")]
    MissingAlias,
}

type Result<T> = std::result::Result<T, SqlFrontendError>;

fn unsupported(what: impl std::fmt::Display) -> SqlFrontendError {
    SqlFrontendError::Unsupported(what.to_string())
}

/// Lowers SQL text into the engine's query tree.
///
/// With metadata attached, `SELECT *` is expanded and unknown tables are
/// reported; without it, tables are taken on trust.
#[derive(Clone, Copy, Default)]
pub struct SqlFrontend<'a> {
    metadata: Option<&'a dyn DatabaseMetadata>,
}

impl<'a> SqlFrontend<'a> {
    pub fn new() -> Self {
        Self { metadata: None }
    }

    pub fn with_metadata(metadata: &'a dyn DatabaseMetadata) -> Self {
        Self {
            metadata: Some(metadata),
        }
    }

    pub fn parse_query(&self, sql: &str) -> Result<SqlQuery> {
        let dialect = GenericDialect {};
        let mut statements = Parser::parse_sql(&dialect, sql)
            .map_err(|e| SqlFrontendError::Syntax(e.to_string()))?;
        if statements.len() != 1 {
            return Err(SqlFrontendError::NotASelect);
        }
        let Some(Statement::Query(query)) = statements.pop() else {
            return Err(SqlFrontendError::NotASelect);
        };
        self.lower_query(&query)
    }

    // ========================================================================
    // Query
    // ========================================================================

    fn lower_query(&self, query: &Query) -> Result<SqlQuery> {
        if query.with.is_some() {
            return Err(unsupported("WITH"));
        }
        if !query.order_by.is_empty() {
            return Err(unsupported("ORDER BY"));
        }
        if query.limit.is_some() || query.offset.is_some() || query.fetch.is_some() {
            return Err(unsupported("LIMIT/OFFSET"));
        }
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(unsupported("set operations in a mapping source"));
        };

        match &select.group_by {
            GroupByExpr::Expressions(exprs) if exprs.is_empty() => {}
            _ => return Err(unsupported("GROUP BY")),
        }
        if select.having.is_some() {
            return Err(unsupported("HAVING"));
        }
        let distinct = match &select.distinct {
            None => false,
            Some(Distinct::Distinct) => true,
            Some(Distinct::On(_)) => return Err(unsupported("DISTINCT ON")),
        };

        let mut scope = Scope::default();
        let from = self.lower_from_list(&select.from, &mut scope)?;

        let mut items = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            self.lower_select_item(item, &scope, &mut items)?;
        }

        let mut where_clause = BTreeSet::new();
        if let Some(selection) = &select.selection {
            for conjunct in conjuncts(selection) {
                where_clause.insert(lower_expr(conjunct, &scope)?);
            }
        }

        Ok(SqlQuery {
            select: items,
            from,
            where_clause,
            distinct,
        })
    }

    fn lower_select_item(
        &self,
        item: &ast::SelectItem,
        scope: &Scope,
        out: &mut Vec<SelectItem>,
    ) -> Result<()> {
        match item {
            ast::SelectItem::UnnamedExpr(expr) => out.push(SelectItem::new(lower_expr(expr, scope)?)),
            ast::SelectItem::ExprWithAlias { expr, alias } => out.push(SelectItem::aliased(
                lower_expr(expr, scope)?,
                alias.value.clone(),
            )),
            ast::SelectItem::Wildcard(_) => {
                for entry in &scope.entries {
                    out.extend(entry.expand()?);
                }
            }
            ast::SelectItem::QualifiedWildcard(name, _) => {
                let visible = last_ident(name);
                let entry = scope
                    .entry(&visible)
                    .ok_or_else(|| SqlFrontendError::UnknownTable(visible.clone()))?;
                out.extend(entry.expand()?);
            }
        }
        Ok(())
    }

    // ========================================================================
    // FROM
    // ========================================================================

    fn lower_from_list(&self, from: &[TableWithJoins], scope: &mut Scope) -> Result<FromExpr> {
        let mut lowered: Option<FromExpr> = None;
        for item in from {
            let next = self.lower_table_with_joins(item, scope)?;
            lowered = Some(match lowered {
                None => next,
                // Comma join: inner join whose conditions live in WHERE.
                Some(left) => FromExpr::join(JoinKind::Inner, left, next),
            });
        }
        lowered.ok_or_else(|| unsupported("SELECT without FROM"))
    }

    fn lower_table_with_joins(&self, twj: &TableWithJoins, scope: &mut Scope) -> Result<FromExpr> {
        let mut from = self.lower_factor(&twj.relation, scope)?;
        for join in &twj.joins {
            let right = self.lower_factor(&join.relation, scope)?;
            let (kind, constraint) = match &join.join_operator {
                JoinOperator::Inner(c) => (JoinKind::Inner, Some(c)),
                JoinOperator::LeftOuter(c) => (JoinKind::Left, Some(c)),
                JoinOperator::CrossJoin => (JoinKind::Inner, None),
                other => return Err(unsupported(format!("join operator {other:?}"))),
            };
            let mut conditions = BTreeSet::new();
            let mut filters = BTreeSet::new();
            match constraint {
                None | Some(JoinConstraint::None) => {}
                Some(JoinConstraint::On(expr)) => {
                    for conjunct in conjuncts(expr) {
                        let lowered = lower_expr(conjunct, scope)?;
                        match join_condition(&lowered) {
                            Some(condition) => {
                                conditions.insert(condition);
                            }
                            None => {
                                filters.insert(lowered);
                            }
                        }
                    }
                }
                Some(other) => return Err(unsupported(format!("join constraint {other:?}"))),
            }
            from = FromExpr::Join(Box::new(Join {
                kind,
                left: from,
                right,
                conditions,
                filters,
            }));
        }
        Ok(from)
    }

    fn lower_factor(&self, factor: &TableFactor, scope: &mut Scope) -> Result<FromExpr> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let relation = relation_id(name);
                let columns = match self.metadata {
                    Some(metadata) => {
                        let table = metadata
                            .table(&relation)
                            .ok_or_else(|| SqlFrontendError::UnknownTable(relation.to_string()))?;
                        Some(table.columns.iter().map(|c| c.name.clone()).collect())
                    }
                    None => None,
                };
                let table = TableRef {
                    relation,
                    alias: alias.as_ref().map(|a| a.name.value.clone()),
                };
                scope.entries.push(ScopeEntry {
                    name: table.visible_name().to_string(),
                    columns,
                });
                Ok(FromExpr::Table(table))
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let alias = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .ok_or(SqlFrontendError::MissingAlias)?;
                let query = self.lower_query(subquery)?;
                let columns = query
                    .select
                    .iter()
                    .filter_map(|item| item.output_name().map(str::to_string))
                    .collect();
                scope.entries.push(ScopeEntry {
                    name: alias.clone(),
                    columns: Some(columns),
                });
                Ok(FromExpr::SubQuery(Box::new(SubQuery { query, alias })))
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.lower_table_with_joins(table_with_joins, scope),
            other => Err(unsupported(format!("table factor `{other}`"))),
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

#[derive(Debug)]
struct ScopeEntry {
    /// Alias, or the table name.
    name: String,
    /// Known when metadata was supplied or for derived tables.
    columns: Option<Vec<String>>,
}

impl ScopeEntry {
    fn expand(&self) -> Result<Vec<SelectItem>> {
        let columns = self
            .columns
            .as_ref()
            .ok_or_else(|| unsupported(format!("`*` over `{}` without table metadata", self.name)))?;
        Ok(columns
            .iter()
            .map(|c| SelectItem::new(SqlExpr::column(self.name.clone(), c.clone())))
            .collect())
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns
            .as_ref()
            .is_some_and(|cols| cols.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }
}

#[derive(Debug, Default)]
struct Scope {
    entries: Vec<ScopeEntry>,
}

impl Scope {
    fn entry(&self, name: &str) -> Option<&ScopeEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    fn resolve(&self, column: ColumnRef) -> Result<ColumnRef> {
        if column.relation.is_some() {
            return Ok(column);
        }
        if let [only] = self.entries.as_slice() {
            return Ok(ColumnRef::of(only.name.clone(), column.column));
        }
        let mut owners = self.entries.iter().filter(|e| e.has_column(&column.column));
        match (owners.next(), owners.next()) {
            (Some(owner), None) => Ok(ColumnRef::of(owner.name.clone(), column.column)),
            (Some(_), Some(_)) => Err(SqlFrontendError::AmbiguousColumn(column.column)),
            _ => Ok(column),
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn relation_id(name: &ObjectName) -> RelationId {
    match name.0.as_slice() {
        [.., schema, table] => RelationId::qualified(schema.value.clone(), table.value.clone()),
        [table] => RelationId::new(table.value.clone()),
        [] => RelationId::new(""),
    }
}

fn last_ident(name: &ObjectName) -> String {
    name.0.last().map(|i| i.value.clone()).unwrap_or_default()
}

/// Top-level `AND` operands.
fn conjuncts(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            let mut out = conjuncts(left);
            out.extend(conjuncts(right));
            out
        }
        Expr::Nested(inner) => match inner.as_ref() {
            Expr::BinaryOp {
                op: BinaryOperator::And,
                ..
            } => conjuncts(inner),
            _ => vec![expr],
        },
        _ => vec![expr],
    }
}

fn join_condition(expr: &SqlExpr) -> Option<JoinCondition> {
    let SqlExpr::Binary {
        op: BinaryOp::Eq,
        left,
        right,
    } = expr
    else {
        return None;
    };
    Some(JoinCondition {
        left: left.as_column()?.clone(),
        right: right.as_column()?.clone(),
    })
}

fn column_ref(parts: &[Ident]) -> Result<ColumnRef> {
    match parts {
        [column] => Ok(ColumnRef::new(column.value.clone())),
        [relation, column] => Ok(ColumnRef::of(relation.value.clone(), column.value.clone())),
        [schema, relation, column] => Ok(ColumnRef {
            schema: Some(schema.value.clone()),
            relation: Some(relation.value.clone()),
            column: column.value.clone(),
        }),
        _ => Err(unsupported(format!(
            "column reference `{}`",
            parts
                .iter()
                .map(|p| p.value.as_str())
                .collect::<Vec<_>>()
                .join(".")
        ))),
    }
}

fn binary_op(op: &BinaryOperator) -> Result<BinaryOp> {
    Ok(match op {
        BinaryOperator::Eq => BinaryOp::Eq,
        BinaryOperator::NotEq => BinaryOp::Neq,
        BinaryOperator::Lt => BinaryOp::Lt,
        BinaryOperator::LtEq => BinaryOp::Lte,
        BinaryOperator::Gt => BinaryOp::Gt,
        BinaryOperator::GtEq => BinaryOp::Gte,
        BinaryOperator::And => BinaryOp::And,
        BinaryOperator::Or => BinaryOp::Or,
        BinaryOperator::Plus => BinaryOp::Plus,
        BinaryOperator::Minus => BinaryOp::Minus,
        BinaryOperator::Multiply => BinaryOp::Multiply,
        BinaryOperator::Divide => BinaryOp::Divide,
        BinaryOperator::StringConcat => BinaryOp::Concat,
        other => return Err(unsupported(format!("operator `{other}`"))),
    })
}

fn lower_value(value: &ast::Value) -> Result<SqlValue> {
    Ok(match value {
        ast::Value::Number(n, _) => SqlValue::Number(n.clone()),
        ast::Value::SingleQuotedString(s) => SqlValue::String(s.clone()),
        ast::Value::Boolean(b) => SqlValue::Boolean(*b),
        ast::Value::Null => SqlValue::Null,
        other => return Err(unsupported(format!("literal `{other}`"))),
    })
}

fn unary(op: UnaryOp, expr: SqlExpr) -> SqlExpr {
    SqlExpr::Unary {
        op,
        expr: Box::new(expr),
    }
}

fn lower_expr(expr: &Expr, scope: &Scope) -> Result<SqlExpr> {
    match expr {
        Expr::Identifier(id) => Ok(SqlExpr::Column(
            scope.resolve(column_ref(std::slice::from_ref(id))?)?,
        )),
        Expr::CompoundIdentifier(parts) => Ok(SqlExpr::Column(scope.resolve(column_ref(parts)?)?)),
        Expr::Value(value) => Ok(SqlExpr::Value(lower_value(value)?)),
        Expr::Nested(inner) => lower_expr(inner, scope),
        Expr::BinaryOp { left, op, right } => Ok(SqlExpr::binary(
            binary_op(op)?,
            lower_expr(left, scope)?,
            lower_expr(right, scope)?,
        )),
        Expr::UnaryOp { op, expr } => {
            let inner = lower_expr(expr, scope)?;
            match op {
                UnaryOperator::Not => Ok(unary(UnaryOp::Not, inner)),
                UnaryOperator::Minus => Ok(unary(UnaryOp::Minus, inner)),
                UnaryOperator::Plus => Ok(inner),
                other => Err(unsupported(format!("unary operator `{other}`"))),
            }
        }
        Expr::IsNull(inner) => Ok(unary(UnaryOp::IsNull, lower_expr(inner, scope)?)),
        Expr::IsNotNull(inner) => Ok(unary(UnaryOp::IsNotNull, lower_expr(inner, scope)?)),
        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        } => {
            let like = SqlExpr::binary(
                BinaryOp::Like,
                lower_expr(expr, scope)?,
                lower_expr(pattern, scope)?,
            );
            Ok(if *negated { SqlExpr::negate(like) } else { like })
        }
        Expr::Cast {
            expr, data_type, ..
        } => Ok(SqlExpr::Cast {
            expr: Box::new(lower_expr(expr, scope)?),
            data_type: data_type.to_string(),
        }),
        Expr::Function(f) => {
            let mut args = Vec::with_capacity(f.args.len());
            for arg in &f.args {
                let FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) = arg else {
                    return Err(unsupported(format!("argument `{arg}` of {}", f.name)));
                };
                args.push(lower_expr(e, scope)?);
            }
            Ok(SqlExpr::Function {
                name: f.name.to_string().to_uppercase(),
                args,
            })
        }
        other => Err(unsupported(format!("expression `{other}`"))),
    }
}
