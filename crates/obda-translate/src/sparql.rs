//! SPARQL front-end: `spargebra` algebra lowered to conjunctive queries.
//!
//! Supported: SELECT (with DISTINCT/REDUCED), basic graph patterns, group
//! joins, UNION and FILTER over comparisons, boolean connectives and
//! `BOUND`. Everything else is rejected with the feature's name.

use crate::query::{ConjunctiveQuery, SparqlQuery};
use obda_model::{Function, Literal, Operator, Term, TripleAtom, Variable};
use spargebra::algebra::{Expression, GraphPattern};
use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
use spargebra::Query;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SparqlError {
    #[error("SPARQL syntax error: {0}")]
    Syntax(String),
    #[error("only SELECT queries can be translated, got {0}")]
    NotASelect(&'static str),
    #[error("unsupported SPARQL feature: {0}")]
    Unsupported(String),
}

fn unsupported(feature: impl Into<String>) -> SparqlError {
    SparqlError::Unsupported(feature.into())
}

/// Parses query text into the conjunctive query model.
pub trait QueryParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<SparqlQuery, SparqlError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SparqlParser;

impl QueryParser for SparqlParser {
    fn parse(&self, text: &str) -> Result<SparqlQuery, SparqlError> {
        parse_sparql(text)
    }
}

pub fn parse_sparql(text: &str) -> Result<SparqlQuery, SparqlError> {
    let query = Query::parse(text, None).map_err(|e| SparqlError::Syntax(e.to_string()))?;
    match query {
        Query::Select { pattern, .. } => lower_select(&pattern),
        Query::Construct { .. } => Err(SparqlError::NotASelect("CONSTRUCT")),
        Query::Describe { .. } => Err(SparqlError::NotASelect("DESCRIBE")),
        Query::Ask { .. } => Err(SparqlError::NotASelect("ASK")),
    }
}

fn lower_select(pattern: &GraphPattern) -> Result<SparqlQuery, SparqlError> {
    let mut distinct = false;
    let mut current = pattern;
    loop {
        match current {
            GraphPattern::Distinct { inner } => {
                distinct = true;
                current = inner;
            }
            GraphPattern::Reduced { inner } => current = inner,
            GraphPattern::Project { inner, variables } => {
                let branches = lower_pattern(inner)?;
                let projection = variables.iter().map(|v| Variable::new(v.as_str())).collect();
                return Ok(SparqlQuery {
                    projection,
                    distinct,
                    branches,
                });
            }
            GraphPattern::Slice { .. } => return Err(unsupported("LIMIT/OFFSET")),
            GraphPattern::OrderBy { .. } => return Err(unsupported("ORDER BY")),
            GraphPattern::Group { .. } => return Err(unsupported("GROUP BY and aggregates")),
            _ => return Err(unsupported("SELECT without a projection")),
        }
    }
}

// ============================================================================
// Graph patterns
// ============================================================================

fn lower_pattern(pattern: &GraphPattern) -> Result<Vec<ConjunctiveQuery>, SparqlError> {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            let atoms = patterns
                .iter()
                .map(lower_triple)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vec![ConjunctiveQuery::new(atoms)])
        }
        GraphPattern::Join { left, right } => {
            let left = lower_pattern(left)?;
            let right = lower_pattern(right)?;
            Ok(left
                .iter()
                .flat_map(|l| right.iter().map(move |r| l.join(r)))
                .collect())
        }
        GraphPattern::Union { left, right } => {
            let mut branches = lower_pattern(left)?;
            branches.extend(lower_pattern(right)?);
            Ok(branches)
        }
        GraphPattern::Filter { expr, inner } => {
            let filter = match lower_expression(expr)? {
                Term::Function(f) => f,
                other => return Err(unsupported(format!("non-boolean FILTER {other}"))),
            };
            let mut branches = lower_pattern(inner)?;
            for branch in &mut branches {
                branch.filters.push(filter.clone());
            }
            Ok(branches)
        }
        GraphPattern::Path { .. } => Err(unsupported("property paths")),
        GraphPattern::LeftJoin { .. } => Err(unsupported("OPTIONAL")),
        GraphPattern::Minus { .. } => Err(unsupported("MINUS")),
        GraphPattern::Extend { .. } => Err(unsupported("BIND")),
        GraphPattern::Values { .. } => Err(unsupported("VALUES")),
        GraphPattern::Graph { .. } => Err(unsupported("GRAPH")),
        GraphPattern::Service { .. } => Err(unsupported("SERVICE")),
        GraphPattern::OrderBy { .. } => Err(unsupported("ORDER BY")),
        GraphPattern::Slice { .. } => Err(unsupported("LIMIT/OFFSET")),
        GraphPattern::Group { .. } => Err(unsupported("GROUP BY and aggregates")),
        _ => Err(unsupported("sub-queries")),
    }
}

fn lower_triple(pattern: &TriplePattern) -> Result<TripleAtom, SparqlError> {
    let predicate = match &pattern.predicate {
        NamedNodePattern::NamedNode(node) => Term::iri(node.as_str()),
        NamedNodePattern::Variable(v) => Term::var(v.as_str()),
    };
    Ok(TripleAtom::new(
        lower_term(&pattern.subject)?,
        predicate,
        lower_term(&pattern.object)?,
    ))
}

fn lower_term(term: &TermPattern) -> Result<Term, SparqlError> {
    match term {
        TermPattern::NamedNode(node) => Ok(Term::iri(node.as_str())),
        TermPattern::Variable(v) => Ok(Term::var(v.as_str())),
        // Blank nodes in patterns behave as undistinguished variables.
        TermPattern::BlankNode(b) => Ok(Term::var(format!("_bnode_{}", b.as_str()))),
        TermPattern::Literal(literal) => Ok(lower_literal(literal)),
        #[allow(unreachable_patterns)]
        _ => Err(unsupported("quoted triples")),
    }
}

fn lower_literal(literal: &spargebra::term::Literal) -> Term {
    match literal.language() {
        Some(language) => Term::Literal(Literal::lang(literal.value(), language)),
        None => Term::typed_literal(literal.value(), literal.datatype().as_str()),
    }
}

// ============================================================================
// Filters
// ============================================================================

fn operator(op: Operator, args: Vec<Term>) -> Term {
    Term::Function(Function::operator(op, args))
}

fn lower_binary(op: Operator, left: &Expression, right: &Expression) -> Result<Term, SparqlError> {
    Ok(operator(op, vec![lower_expression(left)?, lower_expression(right)?]))
}

fn lower_expression(expr: &Expression) -> Result<Term, SparqlError> {
    match expr {
        Expression::NamedNode(node) => Ok(Term::iri(node.as_str())),
        Expression::Literal(literal) => Ok(lower_literal(literal)),
        Expression::Variable(v) => Ok(Term::var(v.as_str())),
        Expression::And(l, r) => lower_binary(Operator::And, l, r),
        Expression::Or(l, r) => lower_binary(Operator::Or, l, r),
        Expression::Equal(l, r) | Expression::SameTerm(l, r) => lower_binary(Operator::Eq, l, r),
        Expression::Greater(l, r) => lower_binary(Operator::Gt, l, r),
        Expression::GreaterOrEqual(l, r) => lower_binary(Operator::Gte, l, r),
        Expression::Less(l, r) => lower_binary(Operator::Lt, l, r),
        Expression::LessOrEqual(l, r) => lower_binary(Operator::Lte, l, r),
        Expression::Bound(v) => Ok(operator(Operator::IsNotNull, vec![Term::var(v.as_str())])),
        Expression::Not(inner) => match inner.as_ref() {
            Expression::Equal(l, r) | Expression::SameTerm(l, r) => lower_binary(Operator::Neq, l, r),
            Expression::Bound(v) => Ok(operator(Operator::IsNull, vec![Term::var(v.as_str())])),
            other => Ok(operator(Operator::Not, vec![lower_expression(other)?])),
        },
        Expression::FunctionCall(function, _) => Err(unsupported(format!("function {function}"))),
        Expression::Exists(_) => Err(unsupported("EXISTS")),
        Expression::In(..) => Err(unsupported("IN")),
        Expression::If(..) => Err(unsupported("IF")),
        Expression::Coalesce(_) => Err(unsupported("COALESCE")),
        _ => Err(unsupported("arithmetic in FILTER")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obda_model::vocab::{RDF_TYPE, XSD_INTEGER};

    #[test]
    fn basic_graph_pattern_with_filter() {
        let query = parse_sparql(
            "PREFIX : <http://ex.org/>
             SELECT DISTINCT ?x ?s WHERE { ?x a :Employee ; :salary ?s . FILTER(?s > 1000) }",
        )
        .unwrap();
        assert!(query.distinct);
        assert_eq!(
            query.projection,
            vec![Variable::new("x"), Variable::new("s")]
        );
        assert_eq!(query.branches.len(), 1);
        let branch = &query.branches[0];
        assert_eq!(branch.atoms.len(), 2);
        assert_eq!(branch.atoms[0].predicate, Term::iri(RDF_TYPE));
        assert_eq!(
            branch.filters,
            vec![Function::operator(
                Operator::Gt,
                vec![Term::var("s"), Term::typed_literal("1000", XSD_INTEGER)]
            )]
        );
    }

    #[test]
    fn unions_become_branches() {
        let query = parse_sparql(
            "SELECT ?x WHERE { { ?x a <http://ex.org/A> } UNION { ?x a <http://ex.org/B> } }",
        )
        .unwrap();
        assert_eq!(query.branches.len(), 2);
        assert_eq!(query.atom_count(), 2);
    }

    #[test]
    fn unsupported_features_are_named() {
        let err = parse_sparql("SELECT ?x WHERE { ?x ?p ?o OPTIONAL { ?x ?q ?y } }").unwrap_err();
        assert_eq!(err, SparqlError::Unsupported("OPTIONAL".into()));
        let err = parse_sparql("ASK { ?x ?p ?o }").unwrap_err();
        assert_eq!(err, SparqlError::NotASelect("ASK"));
        assert!(matches!(parse_sparql("SELEC ?x"), Err(SparqlError::Syntax(_))));
    }
}
