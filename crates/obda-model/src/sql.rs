//! Relational query trees: the source side of a mapping and the unfolded
//! output of query translation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Names
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
}

impl RelationId {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    pub fn qualified(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: table.into(),
        }
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// A column reference. `relation` is the table name or the alias of the
/// table/view it comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            schema: None,
            relation: None,
            column: column.into(),
        }
    }

    pub fn of(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: None,
            relation: Some(relation.into()),
            column: column.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(schema) = &self.schema {
            parts.push(schema);
        }
        if let Some(relation) = &self.relation {
            parts.push(relation);
        }
        parts.push(&self.column);
        parts.join(".")
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    String(String),
    /// Kept as its lexical form so values stay `Eq`/`Ord`.
    Number(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    IsNull,
    IsNotNull,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Like,
    Plus,
    Minus,
    Multiply,
    Divide,
    Concat,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Lt
                | BinaryOp::Lte
                | BinaryOp::Gt
                | BinaryOp::Gte
                | BinaryOp::Like
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SqlExpr {
    Column(ColumnRef),
    Value(SqlValue),
    Unary {
        op: UnaryOp,
        expr: Box<SqlExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Function {
        name: String,
        args: Vec<SqlExpr>,
    },
    Cast {
        expr: Box<SqlExpr>,
        data_type: String,
    },
}

impl SqlExpr {
    pub fn column(relation: impl Into<String>, column: impl Into<String>) -> Self {
        SqlExpr::Column(ColumnRef::of(relation, column))
    }

    pub fn string(value: impl Into<String>) -> Self {
        SqlExpr::Value(SqlValue::String(value.into()))
    }

    pub fn binary(op: BinaryOp, left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equals(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn or(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    pub fn negate(expr: SqlExpr) -> Self {
        SqlExpr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        }
    }

    /// Left-nested conjunction; `None` for an empty input.
    pub fn and_all(exprs: impl IntoIterator<Item = SqlExpr>) -> Option<SqlExpr> {
        exprs
            .into_iter()
            .reduce(|acc, e| SqlExpr::binary(BinaryOp::And, acc, e))
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            SqlExpr::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        match self {
            SqlExpr::Value(_) => true,
            SqlExpr::Column(_) | SqlExpr::Function { .. } => false,
            SqlExpr::Unary { expr, .. } | SqlExpr::Cast { expr, .. } => expr.is_constant(),
            SqlExpr::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
        }
    }

    pub fn columns(&self) -> BTreeSet<&ColumnRef> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut BTreeSet<&'a ColumnRef>) {
        match self {
            SqlExpr::Column(c) => {
                out.insert(c);
            }
            SqlExpr::Value(_) => {}
            SqlExpr::Unary { expr, .. } | SqlExpr::Cast { expr, .. } => expr.collect_columns(out),
            SqlExpr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            SqlExpr::Function { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
        }
    }

    /// Rewrite every column reference.
    pub fn map_columns(&self, f: &impl Fn(&ColumnRef) -> SqlExpr) -> SqlExpr {
        match self {
            SqlExpr::Column(c) => f(c),
            SqlExpr::Value(_) => self.clone(),
            SqlExpr::Unary { op, expr } => SqlExpr::Unary {
                op: *op,
                expr: Box::new(expr.map_columns(f)),
            },
            SqlExpr::Binary { op, left, right } => SqlExpr::Binary {
                op: *op,
                left: Box::new(left.map_columns(f)),
                right: Box::new(right.map_columns(f)),
            },
            SqlExpr::Function { name, args } => SqlExpr::Function {
                name: name.clone(),
                args: args.iter().map(|a| a.map_columns(f)).collect(),
            },
            SqlExpr::Cast { expr, data_type } => SqlExpr::Cast {
                expr: Box::new(expr.map_columns(f)),
                data_type: data_type.clone(),
            },
        }
    }
}

// ============================================================================
// FROM tree
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: SqlExpr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: SqlExpr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: SqlExpr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }

    /// The name the item is visible under: its alias, or the bare column name.
    pub fn output_name(&self) -> Option<&str> {
        self.alias
            .as_deref()
            .or_else(|| self.expr.as_column().map(|c| c.column.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub relation: RelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(relation: RelationId) -> Self {
        Self {
            relation,
            alias: None,
        }
    }

    /// Alias if present, otherwise the table name.
    pub fn visible_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.relation.table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JoinCondition {
    pub left: ColumnRef,
    pub right: ColumnRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Join {
    pub kind: JoinKind,
    pub left: FromExpr,
    pub right: FromExpr,
    #[serde(default)]
    pub conditions: BTreeSet<JoinCondition>,
    #[serde(default)]
    pub filters: BTreeSet<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubQuery {
    pub query: SqlQuery,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FromExpr {
    Table(TableRef),
    Join(Box<Join>),
    SubQuery(Box<SubQuery>),
}

impl FromExpr {
    pub fn table(name: impl Into<String>) -> Self {
        FromExpr::Table(TableRef::new(RelationId::new(name)))
    }

    pub fn join(kind: JoinKind, left: FromExpr, right: FromExpr) -> Self {
        FromExpr::Join(Box::new(Join {
            kind,
            left,
            right,
            conditions: BTreeSet::new(),
            filters: BTreeSet::new(),
        }))
    }

    pub fn subquery(query: SqlQuery, alias: impl Into<String>) -> Self {
        FromExpr::SubQuery(Box::new(SubQuery {
            query,
            alias: alias.into(),
        }))
    }

    /// Base tables in left-to-right order; sub-queries are not entered.
    pub fn tables(&self) -> Vec<&TableRef> {
        let mut out = Vec::new();
        self.collect_tables(&mut out);
        out
    }

    fn collect_tables<'a>(&'a self, out: &mut Vec<&'a TableRef>) {
        match self {
            FromExpr::Table(t) => out.push(t),
            FromExpr::Join(join) => {
                join.left.collect_tables(out);
                join.right.collect_tables(out);
            }
            FromExpr::SubQuery(_) => {}
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SqlQuery {
    pub select: Vec<SelectItem>,
    pub from: FromExpr,
    #[serde(default, rename = "where")]
    pub where_clause: BTreeSet<SqlExpr>,
    #[serde(default)]
    pub distinct: bool,
}

impl SqlQuery {
    pub fn new(select: Vec<SelectItem>, from: FromExpr) -> Self {
        Self {
            select,
            from,
            where_clause: BTreeSet::new(),
            distinct: false,
        }
    }

    /// `SELECT t.c1, t.c2, ... FROM t`.
    pub fn from_table(table: impl Into<String>, columns: &[&str]) -> Self {
        let table = table.into();
        let select = columns
            .iter()
            .map(|c| SelectItem::new(SqlExpr::column(table.clone(), *c)))
            .collect();
        Self::new(select, FromExpr::table(table))
    }

    pub fn with_filter(mut self, filter: SqlExpr) -> Self {
        self.where_clause.insert(filter);
        self
    }

    pub fn single_table(&self) -> Option<&TableRef> {
        match &self.from {
            FromExpr::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn has_join(&self) -> bool {
        matches!(self.from, FromExpr::Join(_))
    }

    pub fn has_subquery(&self) -> bool {
        fn walk(from: &FromExpr) -> bool {
            match from {
                FromExpr::Table(_) => false,
                FromExpr::SubQuery(_) => true,
                FromExpr::Join(join) => walk(&join.left) || walk(&join.right),
            }
        }
        walk(&self.from)
    }

    /// A select item computes something other than a plain column.
    pub fn has_function_select(&self) -> bool {
        self.select.iter().any(|item| item.expr.as_column().is_none())
    }

    pub fn select_item(&self, name: &str) -> Option<&SelectItem> {
        self.select
            .iter()
            .find(|item| item.output_name() == Some(name))
    }
}

/// Branches of an unfolded query, combined with UNION (or UNION ALL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlUnion {
    pub branches: Vec<SqlQuery>,
    pub distinct: bool,
}

impl SqlUnion {
    pub fn new(branches: Vec<SqlQuery>, distinct: bool) -> Self {
        Self { branches, distinct }
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}
