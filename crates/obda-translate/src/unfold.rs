//! Unfolding: conjunctive queries over triples → unions of SQL queries over
//! the mapping sources.
//!
//! Every triple pattern is answered by one mapping. A combination of
//! candidate mappings, one per pattern, becomes one SQL branch: each mapping
//! source is a derived table `v<k>`, and the query's variables and constants
//! turn into WHERE equalities over their columns. Combinations whose heads
//! cannot agree (an IRI against a literal, two different constants, a
//! template that cannot produce a constant IRI) are dropped.

use crate::query::{ConjunctiveQuery, SparqlQuery};
use obda_model::template::{self, TemplatePart};
use obda_model::vocab::{self, RDF_TYPE};
use obda_model::{
    BinaryOp, FromExpr, Function, FunctionSymbol, JoinKind, Literal, Mapping, MappingKind,
    MappingSet, Operator, SelectItem, SqlExpr, SqlQuery, SqlUnion, SqlValue, Term, TripleAtom,
    UnaryOp, Variable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Cast target for template arguments spliced into IRIs.
const STRING_CAST: &str = "VARCHAR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnfoldingError {
    #[error("unfolding exceeds the limit of {limit} SQL branches")]
    TooManyBranches { limit: usize },
    #[error("a query branch has no triple patterns")]
    EmptyPattern,
    #[error("mapping `{mapping}` uses `{variable}`, which its source does not select")]
    UnknownSelectItem { mapping: String, variable: String },
    #[error("mapping `{mapping}` has an unsupported head term {term}")]
    UnsupportedHeadTerm { mapping: String, term: String },
    #[error("FILTER uses ?{0}, which no triple pattern binds")]
    UnboundFilterVariable(String),
    #[error("unsupported FILTER expression {0}")]
    UnsupportedFilter(String),
}

// ============================================================================
// Output
// ============================================================================

/// RDF kind of the values a projected column carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TermType {
    Iri,
    Literal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
    },
    Unbound,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnfoldedBranch {
    pub query: SqlQuery,
    /// One entry per projected column.
    pub types: Vec<TermType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnfoldedQuery {
    pub columns: Vec<String>,
    pub branches: Vec<UnfoldedBranch>,
    /// SPARQL `DISTINCT`.
    pub distinct: bool,
    /// Combine branches with `UNION` rather than `UNION ALL`.
    pub distinct_union: bool,
}

impl UnfoldedQuery {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn to_union(&self) -> SqlUnion {
        let mut branches: Vec<SqlQuery> = self.branches.iter().map(|b| b.query.clone()).collect();
        if let [only] = branches.as_mut_slice() {
            only.distinct |= self.distinct;
        }
        SqlUnion::new(branches, self.distinct || self.distinct_union)
    }
}

pub trait Unfolder: Send + Sync {
    fn unfold(
        &self,
        query: &SparqlQuery,
        mappings: &MappingSet,
    ) -> Result<UnfoldedQuery, UnfoldingError>;
}

// ============================================================================
// Bindings
// ============================================================================

/// What a query or head position evaluates to inside one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Column {
        expr: SqlExpr,
        datatype: Option<String>,
        iri: bool,
    },
    Iri(String),
    Literal(Literal),
    Template { template: String, args: Vec<Bound> },
}

impl Bound {
    fn from_constant(term: &Term) -> Option<Bound> {
        match term {
            Term::Iri(iri) => Some(Bound::Iri(iri.value.clone())),
            Term::Literal(lit) => Some(Bound::Literal(lit.clone())),
            _ => None,
        }
    }

    fn is_iri(&self) -> bool {
        match self {
            Bound::Column { iri, .. } => *iri,
            Bound::Iri(_) | Bound::Template { .. } => true,
            Bound::Literal(_) => false,
        }
    }

    fn term_type(&self) -> TermType {
        match self {
            Bound::Column {
                iri: false,
                datatype,
                ..
            } => TermType::Literal {
                datatype: datatype.clone(),
            },
            Bound::Literal(lit) => TermType::Literal {
                datatype: Some(lit.datatype.clone()),
            },
            _ => TermType::Iri,
        }
    }

    /// SQL expression producing the lexical value.
    fn to_sql(&self) -> SqlExpr {
        match self {
            Bound::Column { expr, .. } => expr.clone(),
            Bound::Iri(iri) => SqlExpr::string(iri),
            Bound::Literal(lit) => literal_value(lit),
            Bound::Template { template, args } => template_expr(template, args),
        }
    }
}

fn literal_value(lit: &Literal) -> SqlExpr {
    let value = if vocab::is_numeric_datatype(&lit.datatype) {
        SqlValue::Number(lit.lexical.clone())
    } else if lit.datatype == vocab::XSD_BOOLEAN {
        SqlValue::Boolean(matches!(lit.lexical.as_str(), "true" | "1"))
    } else {
        SqlValue::String(lit.lexical.clone())
    };
    SqlExpr::Value(value)
}

/// `'prefix' || CAST(col AS VARCHAR) || 'suffix'`.
fn template_expr(template: &str, args: &[Bound]) -> SqlExpr {
    let mut args = args.iter();
    let parts = template::parts(template).into_iter().filter_map(|part| match part {
        TemplatePart::Text(text) => Some(SqlExpr::string(text)),
        TemplatePart::Placeholder => args.next().map(|arg| match arg {
            Bound::Column { expr, .. } => SqlExpr::Cast {
                expr: Box::new(expr.clone()),
                data_type: STRING_CAST.to_string(),
            },
            other => other.to_sql(),
        }),
    });
    parts
        .reduce(|acc, part| SqlExpr::binary(BinaryOp::Concat, acc, part))
        .unwrap_or_else(|| SqlExpr::string(""))
}

/// Text before the first placeholder.
fn template_prefix(template: &str) -> &str {
    template.split("{}").next().unwrap_or_default()
}

/// Conditions under which `left` and `right` denote the same RDF term;
/// `None` when they never can.
fn equate(left: &Bound, right: &Bound) -> Option<Vec<SqlExpr>> {
    if left.is_iri() != right.is_iri() {
        return None;
    }
    match (left, right) {
        (Bound::Iri(a), Bound::Iri(b)) => (a == b).then(Vec::new),
        (Bound::Literal(a), Bound::Literal(b)) => {
            (a.lexical == b.lexical && a.language == b.language).then(Vec::new)
        }
        (
            Bound::Template {
                template: t1,
                args: a1,
            },
            Bound::Template {
                template: t2,
                args: a2,
            },
        ) => {
            if t1 == t2 && a1.len() == a2.len() {
                let mut conditions = Vec::new();
                for (x, y) in a1.iter().zip(a2) {
                    conditions.extend(equate_lexical(x, y)?);
                }
                Some(conditions)
            } else {
                let (p1, p2) = (template_prefix(t1), template_prefix(t2));
                if !p1.starts_with(p2) && !p2.starts_with(p1) {
                    return None;
                }
                Some(vec![SqlExpr::equals(left.to_sql(), right.to_sql())])
            }
        }
        (Bound::Template { template, args }, Bound::Iri(iri))
        | (Bound::Iri(iri), Bound::Template { template, args }) => {
            let values = template::decompose(template, iri)?;
            if values.len() != args.len() {
                return None;
            }
            let mut conditions = Vec::new();
            for (arg, value) in args.iter().zip(values) {
                conditions.extend(equate_lexical(arg, &Bound::Literal(Literal::plain(value)))?);
            }
            Some(conditions)
        }
        (Bound::Column { datatype, .. }, Bound::Literal(lit))
        | (Bound::Literal(lit), Bound::Column { datatype, .. }) => {
            literal_fits_column(lit, datatype.as_deref())
                .then(|| vec![SqlExpr::equals(left.to_sql(), right.to_sql())])
        }
        (Bound::Column { .. }, _) | (_, Bound::Column { .. }) => {
            Some(vec![SqlExpr::equals(left.to_sql(), right.to_sql())])
        }
        _ => None,
    }
}

/// Column literals carry no language tag; a declared column datatype must
/// match the constant's, numeric types matching each other.
fn literal_fits_column(lit: &Literal, datatype: Option<&str>) -> bool {
    if lit.language.is_some() {
        return false;
    }
    match datatype {
        None => true,
        Some(d) if d == lit.datatype => true,
        Some(d) => vocab::is_numeric_datatype(d) && vocab::is_numeric_datatype(&lit.datatype),
    }
}

/// Template arguments compare by lexical form, whatever their RDF kind.
fn equate_lexical(left: &Bound, right: &Bound) -> Option<Vec<SqlExpr>> {
    match (left, right) {
        (Bound::Column { .. }, Bound::Literal(lit)) => Some(vec![SqlExpr::equals(
            left.to_sql(),
            lexical_for_column(left, &lit.lexical),
        )]),
        (Bound::Literal(lit), Bound::Column { .. }) => Some(vec![SqlExpr::equals(
            right.to_sql(),
            lexical_for_column(right, &lit.lexical),
        )]),
        (Bound::Column { .. }, Bound::Column { .. }) => {
            Some(vec![SqlExpr::equals(left.to_sql(), right.to_sql())])
        }
        (Bound::Template { .. } | Bound::Iri(_), Bound::Template { .. } | Bound::Iri(_)) => {
            equate(left, right)
        }
        _ => {
            let (l, r) = (lexical_of(left)?, lexical_of(right)?);
            (l == r).then(Vec::new)
        }
    }
}

fn lexical_of(bound: &Bound) -> Option<String> {
    match bound {
        Bound::Iri(iri) => Some(iri.clone()),
        Bound::Literal(lit) => Some(lit.lexical.clone()),
        _ => None,
    }
}

/// A decomposed IRI fragment compared against a column, typed like the column.
fn lexical_for_column(column: &Bound, lexical: &str) -> SqlExpr {
    match column {
        Bound::Column {
            datatype: Some(datatype),
            ..
        } if vocab::is_numeric_datatype(datatype) => {
            SqlExpr::Value(SqlValue::Number(lexical.to_string()))
        }
        _ => SqlExpr::string(lexical),
    }
}

// ============================================================================
// Branch construction
// ============================================================================

/// Head term of `mapping` with its variables resolved to columns of `alias`.
fn head_bound(
    mapping: &Mapping,
    term: &Term,
    alias: &str,
    iri: bool,
) -> Result<Bound, UnfoldingError> {
    match term {
        Term::Variable(v) => column_bound(mapping, v, alias, iri),
        Term::Iri(value) => Ok(Bound::Iri(value.value.clone())),
        Term::Literal(lit) => Ok(Bound::Literal(lit.clone())),
        Term::Function(f) => match f.template() {
            Some(template) => Ok(Bound::Template {
                template: template.to_string(),
                args: f
                    .args
                    .iter()
                    .map(|arg| head_bound(mapping, arg, alias, false))
                    .collect::<Result<_, _>>()?,
            }),
            None => Err(UnfoldingError::UnsupportedHeadTerm {
                mapping: mapping.id.clone(),
                term: term.to_string(),
            }),
        },
    }
}

fn column_bound(
    mapping: &Mapping,
    variable: &Variable,
    alias: &str,
    iri: bool,
) -> Result<Bound, UnfoldingError> {
    if mapping.source.select_item(&variable.name).is_none() {
        return Err(UnfoldingError::UnknownSelectItem {
            mapping: mapping.id.clone(),
            variable: variable.name.clone(),
        });
    }
    Ok(Bound::Column {
        expr: SqlExpr::column(alias, &variable.name),
        datatype: variable.datatype.clone(),
        iri,
    })
}

struct BranchBuilder<'a> {
    bindings: BTreeMap<Variable, Bound>,
    sources: Vec<(&'a Mapping, String)>,
    conditions: Vec<SqlExpr>,
    satisfiable: bool,
}

impl<'a> BranchBuilder<'a> {
    fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
            sources: Vec::new(),
            conditions: Vec::new(),
            satisfiable: true,
        }
    }

    fn require(&mut self, conditions: Option<Vec<SqlExpr>>) {
        match conditions {
            Some(conditions) => self.conditions.extend(conditions),
            None => self.satisfiable = false,
        }
    }

    /// Match one query position against the head value bound there.
    fn bind(&mut self, query_term: &Term, value: Bound) {
        match query_term {
            Term::Variable(v) => match self.bindings.get(v) {
                Some(existing) => {
                    let conditions = equate(existing, &value);
                    self.require(conditions);
                }
                None => {
                    self.bindings.insert(v.clone(), value);
                }
            },
            other => {
                let conditions = Bound::from_constant(other).and_then(|c| equate(&c, &value));
                self.require(conditions);
            }
        }
    }

    fn add(
        &mut self,
        atom_index: usize,
        pattern: &TripleAtom,
        mapping: &'a Mapping,
    ) -> Result<(), UnfoldingError> {
        let alias = format!("v{atom_index}");
        let head = mapping.head();
        let object_is_iri = mapping.kind() != MappingKind::DataProperty;
        self.bind(&pattern.subject, head_bound(mapping, &head.subject, &alias, true)?);
        self.bind(&pattern.predicate, Bound::Iri(mapping.predicate_iri().to_string()));
        self.bind(
            &pattern.object,
            head_bound(mapping, &head.object, &alias, object_is_iri)?,
        );

        for filter in &mapping.filters {
            let resolve = |v: &Variable| column_bound(mapping, v, &alias, false).ok();
            let condition = filter_expr(filter, &resolve)?;
            self.conditions.push(condition);
        }
        self.sources.push((mapping, alias));
        Ok(())
    }

    fn finish(
        self,
        query: &SparqlQuery,
        filters: &[Function],
    ) -> Result<Option<UnfoldedBranch>, UnfoldingError> {
        if !self.satisfiable {
            return Ok(None);
        }
        let mut where_clause = self.conditions;
        for filter in filters {
            let resolve = |v: &Variable| self.bindings.get(v).cloned();
            where_clause.push(filter_expr(filter, &resolve)?);
        }

        let mut select = Vec::with_capacity(query.projection.len());
        let mut types = Vec::with_capacity(query.projection.len());
        for variable in &query.projection {
            match self.bindings.get(variable) {
                Some(bound) => {
                    select.push(SelectItem::aliased(bound.to_sql(), &variable.name));
                    types.push(bound.term_type());
                }
                None => {
                    select.push(SelectItem::aliased(
                        SqlExpr::Value(SqlValue::Null),
                        &variable.name,
                    ));
                    types.push(TermType::Unbound);
                }
            }
        }

        let mut sources = self
            .sources
            .into_iter()
            .map(|(mapping, alias)| FromExpr::subquery(mapping.source.clone(), alias));
        let Some(first) = sources.next() else {
            return Err(UnfoldingError::EmptyPattern);
        };
        let from = sources.fold(first, |acc, next| FromExpr::join(JoinKind::Inner, acc, next));

        let mut sql = SqlQuery::new(select, from);
        sql.where_clause.extend(where_clause);
        Ok(Some(UnfoldedBranch { query: sql, types }))
    }
}

// ============================================================================
// Filters
// ============================================================================

fn filter_operand(
    term: &Term,
    resolve: &dyn Fn(&Variable) -> Option<Bound>,
) -> Result<Bound, UnfoldingError> {
    match term {
        Term::Variable(v) => {
            resolve(v).ok_or_else(|| UnfoldingError::UnboundFilterVariable(v.name.clone()))
        }
        Term::Iri(iri) => Ok(Bound::Iri(iri.value.clone())),
        Term::Literal(lit) => Ok(Bound::Literal(lit.clone())),
        Term::Function(f) => match f.template() {
            Some(template) => Ok(Bound::Template {
                template: template.to_string(),
                args: f
                    .args
                    .iter()
                    .map(|arg| filter_operand(arg, resolve))
                    .collect::<Result<_, _>>()?,
            }),
            None => Ok(Bound::Column {
                expr: filter_expr(f, resolve)?,
                datatype: Some(vocab::XSD_BOOLEAN.to_string()),
                iri: false,
            }),
        },
    }
}

fn conjunction(conditions: Option<Vec<SqlExpr>>) -> SqlExpr {
    match conditions {
        Some(conditions) => SqlExpr::and_all(conditions)
            .unwrap_or(SqlExpr::Value(SqlValue::Boolean(true))),
        None => SqlExpr::Value(SqlValue::Boolean(false)),
    }
}

/// Translate a boolean operator function to SQL.
fn filter_expr(
    function: &Function,
    resolve: &dyn Fn(&Variable) -> Option<Bound>,
) -> Result<SqlExpr, UnfoldingError> {
    let FunctionSymbol::Operator { op } = &function.symbol else {
        return Err(UnfoldingError::UnsupportedFilter(function.to_string()));
    };
    if function.args.len() != op.arity() {
        return Err(UnfoldingError::UnsupportedFilter(function.to_string()));
    }
    let operand = |i: usize| filter_operand(&function.args[i], resolve);
    let expr = match op {
        Operator::And | Operator::Or => {
            let binary = if *op == Operator::And {
                BinaryOp::And
            } else {
                BinaryOp::Or
            };
            SqlExpr::binary(binary, operand(0)?.to_sql(), operand(1)?.to_sql())
        }
        Operator::Not => SqlExpr::negate(operand(0)?.to_sql()),
        Operator::IsNull | Operator::IsNotNull => SqlExpr::Unary {
            op: if *op == Operator::IsNull {
                UnaryOp::IsNull
            } else {
                UnaryOp::IsNotNull
            },
            expr: Box::new(operand(0)?.to_sql()),
        },
        // RDF term equality: IRIs and templates compare structurally.
        Operator::Eq => conjunction(equate(&operand(0)?, &operand(1)?)),
        Operator::Neq => SqlExpr::negate(conjunction(equate(&operand(0)?, &operand(1)?))),
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte | Operator::Like => {
            let binary = match op {
                Operator::Lt => BinaryOp::Lt,
                Operator::Lte => BinaryOp::Lte,
                Operator::Gt => BinaryOp::Gt,
                Operator::Gte => BinaryOp::Gte,
                _ => BinaryOp::Like,
            };
            SqlExpr::binary(binary, operand(0)?.to_sql(), operand(1)?.to_sql())
        }
    };
    Ok(expr)
}

// ============================================================================
// Unfolder
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct MappingUnfolder {
    max_branches: usize,
    distinct_union: bool,
}

impl MappingUnfolder {
    pub fn new(max_branches: usize, distinct_union: bool) -> Self {
        Self {
            max_branches,
            distinct_union,
        }
    }

    fn candidates<'m>(&self, pattern: &TripleAtom, mappings: &'m MappingSet) -> Vec<&'m Mapping> {
        match pattern.predicate.as_iri() {
            Some(RDF_TYPE) => match pattern.object.as_iri() {
                Some(class) => mappings
                    .get(class)
                    .filter(|m| m.kind() == MappingKind::Class)
                    .collect(),
                None => mappings.class_mappings().collect(),
            },
            Some(property) => mappings
                .get(property)
                .filter(|m| m.kind().is_property())
                .collect(),
            None if pattern.predicate.is_variable() => mappings.iter().collect(),
            None => Vec::new(),
        }
    }

    fn unfold_branch(
        &self,
        query: &SparqlQuery,
        branch: &ConjunctiveQuery,
        mappings: &MappingSet,
        budget: usize,
        out: &mut Vec<UnfoldedBranch>,
    ) -> Result<(), UnfoldingError> {
        if branch.atoms.is_empty() {
            return Err(UnfoldingError::EmptyPattern);
        }
        let candidates: Vec<Vec<&Mapping>> = branch
            .atoms
            .iter()
            .map(|atom| self.candidates(atom, mappings))
            .collect();
        let combinations = candidates
            .iter()
            .try_fold(1usize, |acc, c| acc.checked_mul(c.len()));
        match combinations {
            Some(0) => {
                tracing::debug!(branch = %branch, "no mapping answers some pattern");
                return Ok(());
            }
            Some(n) if n <= budget => {}
            _ => {
                return Err(UnfoldingError::TooManyBranches {
                    limit: self.max_branches,
                })
            }
        }

        let mut cursor = vec![0usize; candidates.len()];
        loop {
            let mut builder = BranchBuilder::new();
            for (k, (pattern, index)) in branch.atoms.iter().zip(&cursor).enumerate() {
                builder.add(k, pattern, candidates[k][*index])?;
            }
            if let Some(unfolded) = builder.finish(query, &branch.filters)? {
                out.push(unfolded);
            }
            // Odometer over the candidate lists.
            let mut position = cursor.len();
            loop {
                if position == 0 {
                    return Ok(());
                }
                position -= 1;
                cursor[position] += 1;
                if cursor[position] < candidates[position].len() {
                    break;
                }
                cursor[position] = 0;
            }
        }
    }
}

impl Unfolder for MappingUnfolder {
    fn unfold(
        &self,
        query: &SparqlQuery,
        mappings: &MappingSet,
    ) -> Result<UnfoldedQuery, UnfoldingError> {
        let mut branches = Vec::new();
        for branch in &query.branches {
            let budget = self.max_branches.saturating_sub(branches.len());
            self.unfold_branch(query, branch, mappings, budget, &mut branches)?;
        }
        Ok(UnfoldedQuery {
            columns: query.projection.iter().map(|v| v.name.clone()).collect(),
            branches,
            distinct: query.distinct,
            distinct_union: self.distinct_union,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMP: &str = "http://ex.org/emp/{}";

    fn employee_mappings() -> MappingSet {
        let subject = Term::uri_template(EMP, vec![Term::var("id")]);
        let source = SqlQuery::from_table("Employee", &["id", "name", "salary"]);
        MappingSet::from(vec![
            Mapping::class("emp", "http://ex.org/Employee", subject.clone(), source.clone()),
            Mapping::property(
                "name",
                "http://ex.org/name",
                subject.clone(),
                Term::var("name"),
                source.clone(),
            ),
            Mapping::property(
                "salary",
                "http://ex.org/salary",
                subject,
                Term::Variable(Variable::typed("salary", vocab::XSD_DECIMAL)),
                source,
            ),
        ])
    }

    fn select(projection: &[&str], atoms: Vec<TripleAtom>) -> SparqlQuery {
        SparqlQuery {
            projection: projection.iter().map(|v| Variable::new(*v)).collect(),
            distinct: false,
            branches: vec![ConjunctiveQuery::new(atoms)],
        }
    }

    fn unfold(query: &SparqlQuery) -> UnfoldedQuery {
        MappingUnfolder::new(64, false)
            .unfold(query, &employee_mappings())
            .unwrap()
    }

    #[test]
    fn class_pattern_projects_the_template() {
        let query = select(
            &["x"],
            vec![TripleAtom::new(
                Term::var("x"),
                Term::iri(RDF_TYPE),
                Term::iri("http://ex.org/Employee"),
            )],
        );
        let unfolded = unfold(&query);
        assert_eq!(unfolded.branches.len(), 1);
        let branch = &unfolded.branches[0];
        assert_eq!(branch.types, vec![TermType::Iri]);
        assert_eq!(
            branch.query.select[0].expr,
            SqlExpr::binary(
                BinaryOp::Concat,
                SqlExpr::string("http://ex.org/emp/"),
                SqlExpr::Cast {
                    expr: Box::new(SqlExpr::column("v0", "id")),
                    data_type: STRING_CAST.into(),
                }
            )
        );
    }

    #[test]
    fn shared_subjects_join_argument_wise() {
        let query = select(
            &["n", "s"],
            vec![
                TripleAtom::new(Term::var("x"), Term::iri("http://ex.org/name"), Term::var("n")),
                TripleAtom::new(Term::var("x"), Term::iri("http://ex.org/salary"), Term::var("s")),
            ],
        );
        let unfolded = unfold(&query);
        let branch = &unfolded.branches[0];
        assert!(branch
            .query
            .where_clause
            .contains(&SqlExpr::equals(SqlExpr::column("v0", "id"), SqlExpr::column("v1", "id"))));
        assert_eq!(
            branch.types[1],
            TermType::Literal {
                datatype: Some(vocab::XSD_DECIMAL.into())
            }
        );
    }

    #[test]
    fn constant_subjects_decompose_the_template() {
        let query = select(
            &["n"],
            vec![TripleAtom::new(
                Term::iri("http://ex.org/emp/7"),
                Term::iri("http://ex.org/name"),
                Term::var("n"),
            )],
        );
        let unfolded = unfold(&query);
        assert!(unfolded.branches[0]
            .query
            .where_clause
            .contains(&SqlExpr::equals(SqlExpr::column("v0", "id"), SqlExpr::string("7"))));

        let foreign = select(
            &["n"],
            vec![TripleAtom::new(
                Term::iri("http://other.org/7"),
                Term::iri("http://ex.org/name"),
                Term::var("n"),
            )],
        );
        assert!(unfold(&foreign).is_empty());
    }

    #[test]
    fn variable_predicates_bind_to_the_mapping_predicate() {
        let query = select(
            &["p"],
            vec![TripleAtom::new(Term::var("x"), Term::var("p"), Term::var("o"))],
        );
        let unfolded = unfold(&query);
        assert_eq!(unfolded.branches.len(), 3);
        assert!(unfolded
            .branches
            .iter()
            .all(|b| b.types == vec![TermType::Iri]));
    }

    #[test]
    fn too_many_combinations_fail() {
        let query = select(
            &["x"],
            vec![
                TripleAtom::new(Term::var("x"), Term::var("p"), Term::var("o")),
                TripleAtom::new(Term::var("x"), Term::var("q"), Term::var("r")),
            ],
        );
        let err = MappingUnfolder::new(4, false)
            .unfold(&query, &employee_mappings())
            .unwrap_err();
        assert_eq!(err, UnfoldingError::TooManyBranches { limit: 4 });
    }

    #[test]
    fn filters_become_where_conditions() {
        let mut query = select(
            &["s"],
            vec![TripleAtom::new(
                Term::var("x"),
                Term::iri("http://ex.org/salary"),
                Term::var("s"),
            )],
        );
        query.branches[0].filters.push(Function::operator(
            Operator::Gt,
            vec![Term::var("s"), Term::typed_literal("1000", vocab::XSD_INTEGER)],
        ));
        let unfolded = unfold(&query);
        assert!(unfolded.branches[0].query.where_clause.contains(&SqlExpr::binary(
            BinaryOp::Gt,
            SqlExpr::column("v0", "salary"),
            SqlExpr::Value(SqlValue::Number("1000".into()))
        )));

        query.branches[0].filters.push(Function::operator(
            Operator::IsNull,
            vec![Term::var("missing")],
        ));
        let err = MappingUnfolder::new(64, false)
            .unfold(&query, &employee_mappings())
            .unwrap_err();
        assert_eq!(err, UnfoldingError::UnboundFilterVariable("missing".into()));
    }

    #[test]
    fn literal_constants_respect_language_and_datatype() {
        let pattern = |object: Term| {
            select(
                &["x"],
                vec![TripleAtom::new(Term::var("x"), Term::iri("http://ex.org/name"), object)],
            )
        };
        let plain = unfold(&pattern(Term::literal("Ada")));
        assert!(plain.branches[0]
            .query
            .where_clause
            .contains(&SqlExpr::equals(SqlExpr::string("Ada"), SqlExpr::column("v0", "name"))));

        let tagged = pattern(Term::Literal(Literal::lang("Ada", "en")));
        assert!(unfold(&tagged).is_empty());

        let salary = |object: Term| {
            select(
                &["x"],
                vec![TripleAtom::new(Term::var("x"), Term::iri("http://ex.org/salary"), object)],
            )
        };
        assert!(unfold(&salary(Term::literal("1000"))).is_empty());
        assert!(!unfold(&salary(Term::typed_literal("1000", vocab::XSD_INTEGER))).is_empty());
    }
}
