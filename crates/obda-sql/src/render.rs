//! Dialect-aware SQL text generation.

use obda_model::{
    BinaryOp, ColumnRef, FromExpr, JoinKind, SelectItem, SqlExpr, SqlQuery, SqlUnion, SqlValue,
    TableRef, UnaryOp,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Ansi,
    Postgres,
    MySql,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlDialect::Ansi => "ansi",
            SqlDialect::Postgres => "postgres",
            SqlDialect::MySql => "mysql",
        })
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ansi" | "sql" => Ok(SqlDialect::Ansi),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            other => Err(format!("unknown SQL dialect `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("query has an empty select list")]
    EmptySelect,
    #[error("union has no branches")]
    EmptyUnion,
}

/// Turns query trees into SQL text for one target database.
pub trait SqlRenderer: Send + Sync {
    fn render_query(&self, query: &SqlQuery) -> Result<String, RenderError>;

    fn render_union(&self, union: &SqlUnion) -> Result<String, RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DialectRenderer {
    dialect: SqlDialect,
}

impl DialectRenderer {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

impl SqlRenderer for DialectRenderer {
    fn render_query(&self, query: &SqlQuery) -> Result<String, RenderError> {
        let mut out = String::new();
        self.write_query(query, &mut out)?;
        Ok(out)
    }

    fn render_union(&self, union: &SqlUnion) -> Result<String, RenderError> {
        let separator = if union.distinct {
            "\nUNION\n"
        } else {
            "\nUNION ALL\n"
        };
        let branches = union
            .branches
            .iter()
            .map(|b| self.render_query(b))
            .collect::<Result<Vec<_>, _>>()?;
        if branches.is_empty() {
            return Err(RenderError::EmptyUnion);
        }
        Ok(branches.join(separator))
    }
}

// ============================================================================
// Identifiers and literals
// ============================================================================

const RESERVED: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "cast", "check", "column", "constraint",
    "create", "cross", "current", "default", "delete", "desc", "distinct", "drop", "else", "end",
    "exists", "false", "fetch", "for", "foreign", "from", "full", "group", "having", "in",
    "inner", "insert", "intersect", "into", "is", "join", "key", "left", "like", "limit", "not",
    "null", "offset", "on", "or", "order", "outer", "primary", "references", "right", "select",
    "set", "table", "then", "to", "true", "union", "unique", "update", "user", "using", "values",
    "when", "where", "with",
];

fn plain_identifier() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
}

impl DialectRenderer {
    fn needs_quotes(&self, ident: &str) -> bool {
        if !plain_identifier().is_match(ident) {
            return true;
        }
        if RESERVED.contains(&ident.to_ascii_lowercase().as_str()) {
            return true;
        }
        // Postgres folds unquoted names to lower case.
        self.dialect == SqlDialect::Postgres && ident.chars().any(|c| c.is_ascii_uppercase())
    }

    pub fn quote_identifier(&self, ident: &str) -> String {
        if !self.needs_quotes(ident) {
            return ident.to_string();
        }
        match self.dialect {
            SqlDialect::MySql => format!("`{}`", ident.replace('`', "``")),
            SqlDialect::Ansi | SqlDialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    pub fn quote_string(&self, value: &str) -> String {
        let mut escaped = value.replace('\'', "''");
        if self.dialect == SqlDialect::MySql {
            escaped = escaped.replace('\\', "\\\\");
        }
        format!("'{escaped}'")
    }

    fn column(&self, column: &ColumnRef) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(schema) = &column.schema {
            parts.push(self.quote_identifier(schema));
        }
        if let Some(relation) = &column.relation {
            parts.push(self.quote_identifier(relation));
        }
        parts.push(self.quote_identifier(&column.column));
        parts.join(".")
    }

    fn cast_type(&self, data_type: &str) -> String {
        if self.dialect != SqlDialect::MySql {
            return data_type.to_string();
        }
        let upper = data_type.to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        match base {
            "VARCHAR" | "TEXT" | "CHARACTER VARYING" => "CHAR".to_string(),
            _ => data_type.to_string(),
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq
        | BinaryOp::Neq
        | BinaryOp::Lt
        | BinaryOp::Lte
        | BinaryOp::Gt
        | BinaryOp::Gte
        | BinaryOp::Like => 4,
        BinaryOp::Concat => 5,
        BinaryOp::Plus | BinaryOp::Minus => 6,
        BinaryOp::Multiply | BinaryOp::Divide => 7,
    }
}

fn precedence(expr: &SqlExpr) -> u8 {
    match expr {
        SqlExpr::Binary { op, .. } => binary_precedence(*op),
        SqlExpr::Unary {
            op: UnaryOp::Not, ..
        } => 3,
        SqlExpr::Unary {
            op: UnaryOp::IsNull | UnaryOp::IsNotNull,
            ..
        } => 4,
        SqlExpr::Unary {
            op: UnaryOp::Minus, ..
        } => 8,
        SqlExpr::Column(_) | SqlExpr::Value(_) | SqlExpr::Function { .. } | SqlExpr::Cast { .. } => 9,
    }
}

fn associative(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::And | BinaryOp::Or | BinaryOp::Plus | BinaryOp::Multiply | BinaryOp::Concat
    )
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => "=",
        BinaryOp::Neq => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::Lte => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Gte => ">=",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
        BinaryOp::Like => "LIKE",
        BinaryOp::Plus => "+",
        BinaryOp::Minus => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        BinaryOp::Concat => "||",
    }
}

impl DialectRenderer {
    pub fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column(c) => self.column(c),
            SqlExpr::Value(v) => match v {
                SqlValue::Null => "NULL".to_string(),
                SqlValue::String(s) => self.quote_string(s),
                SqlValue::Number(n) => n.clone(),
                SqlValue::Boolean(true) => "TRUE".to_string(),
                SqlValue::Boolean(false) => "FALSE".to_string(),
            },
            SqlExpr::Unary { op, expr: inner } => {
                let operand = self.operand(inner, precedence(expr), false);
                match op {
                    UnaryOp::Not => format!("NOT {operand}"),
                    UnaryOp::IsNull => format!("{operand} IS NULL"),
                    UnaryOp::IsNotNull => format!("{operand} IS NOT NULL"),
                    UnaryOp::Minus => format!("-{operand}"),
                }
            }
            SqlExpr::Binary {
                op: BinaryOp::Concat,
                ..
            } if self.dialect == SqlDialect::MySql => {
                let mut parts = Vec::new();
                flatten_concat(expr, &mut parts);
                let args: Vec<String> = parts.into_iter().map(|p| self.render_expr(p)).collect();
                format!("CONCAT({})", args.join(", "))
            }
            SqlExpr::Binary { op, left, right } => {
                let p = binary_precedence(*op);
                format!(
                    "{} {} {}",
                    self.operand(left, p, false),
                    binary_symbol(*op),
                    self.operand(right, p, !associative(*op))
                )
            }
            SqlExpr::Function { name, args } => {
                let args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                format!("{name}({})", args.join(", "))
            }
            SqlExpr::Cast { expr, data_type } => format!(
                "CAST({} AS {})",
                self.render_expr(expr),
                self.cast_type(data_type)
            ),
        }
    }

    /// Renders `expr` as the operand of an operator with precedence `parent`.
    fn operand(&self, expr: &SqlExpr, parent: u8, strict: bool) -> String {
        let own = precedence(expr);
        let rendered = self.render_expr(expr);
        if own < parent || (strict && own == parent) {
            format!("({rendered})")
        } else {
            rendered
        }
    }
}

fn flatten_concat<'a>(expr: &'a SqlExpr, out: &mut Vec<&'a SqlExpr>) {
    match expr {
        SqlExpr::Binary {
            op: BinaryOp::Concat,
            left,
            right,
        } => {
            flatten_concat(left, out);
            flatten_concat(right, out);
        }
        other => out.push(other),
    }
}

// ============================================================================
// Queries
// ============================================================================

impl DialectRenderer {
    fn write_query(&self, query: &SqlQuery, out: &mut String) -> Result<(), RenderError> {
        if query.select.is_empty() {
            return Err(RenderError::EmptySelect);
        }
        out.push_str("SELECT ");
        if query.distinct {
            out.push_str("DISTINCT ");
        }
        let items: Vec<String> = query.select.iter().map(|i| self.select_item(i)).collect();
        out.push_str(&items.join(", "));
        out.push_str("\nFROM ");
        self.write_from(&query.from, out, false)?;
        if !query.where_clause.is_empty() {
            let conjuncts: Vec<String> = query
                .where_clause
                .iter()
                .map(|e| self.operand(e, binary_precedence(BinaryOp::And), false))
                .collect();
            out.push_str("\nWHERE ");
            out.push_str(&conjuncts.join(" AND "));
        }
        Ok(())
    }

    fn select_item(&self, item: &SelectItem) -> String {
        let expr = self.render_expr(&item.expr);
        match &item.alias {
            Some(alias) if item.expr.as_column().map(|c| &c.column) != Some(alias) => {
                format!("{expr} AS {}", self.quote_identifier(alias))
            }
            _ => expr,
        }
    }

    fn table(&self, table: &TableRef) -> String {
        let mut name = match &table.relation.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.relation.table)
            ),
            None => self.quote_identifier(&table.relation.table),
        };
        if let Some(alias) = &table.alias {
            name.push_str(" AS ");
            name.push_str(&self.quote_identifier(alias));
        }
        name
    }

    fn write_from(&self, from: &FromExpr, out: &mut String, nested: bool) -> Result<(), RenderError> {
        match from {
            FromExpr::Table(t) => out.push_str(&self.table(t)),
            FromExpr::SubQuery(sub) => {
                out.push('(');
                self.write_query(&sub.query, out)?;
                out.push_str(") AS ");
                out.push_str(&self.quote_identifier(&sub.alias));
            }
            FromExpr::Join(join) => {
                if nested {
                    out.push('(');
                }
                self.write_from(&join.left, out, false)?;
                let mut on: Vec<String> = join
                    .conditions
                    .iter()
                    .map(|c| format!("{} = {}", self.column(&c.left), self.column(&c.right)))
                    .collect();
                on.extend(
                    join.filters
                        .iter()
                        .map(|f| self.operand(f, binary_precedence(BinaryOp::And), false)),
                );
                let keyword = match (join.kind, on.is_empty()) {
                    (JoinKind::Inner, true) => "CROSS JOIN",
                    (JoinKind::Inner, false) => "INNER JOIN",
                    (JoinKind::Left, _) => "LEFT JOIN",
                };
                out.push_str(&format!("\n{keyword} "));
                self.write_from(&join.right, out, true)?;
                match (join.kind, on.is_empty()) {
                    (JoinKind::Inner, true) => {}
                    (JoinKind::Left, true) => out.push_str(" ON 1 = 1"),
                    (_, false) => {
                        out.push_str(" ON ");
                        out.push_str(&on.join(" AND "));
                    }
                }
                if nested {
                    out.push(')');
                }
            }
        }
        Ok(())
    }
}
