//! Query reformulation against the ontology taxonomy.
//!
//! With a T-mapping saturated mapping set the identity reformulation is
//! complete; `TaxonomyReformulator` is the alternative for unsaturated sets
//! and expands every class and property atom into its named descendants.

use crate::query::{ConjunctiveQuery, SparqlQuery};
use obda_model::vocab::RDF_TYPE;
use obda_model::{Term, TripleAtom};
use obda_ontology::{ClassExpression, OntologyHierarchy, PropertyExpression, Reach};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReformulationError {
    #[error("reformulation exceeds the limit of {limit} conjunctive queries")]
    TooManyBranches { limit: usize },
}

pub trait QueryReformulator: Send + Sync {
    fn reformulate(&self, query: SparqlQuery) -> Result<SparqlQuery, ReformulationError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReformulationKind {
    #[default]
    Identity,
    Taxonomy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityReformulator;

impl QueryReformulator for IdentityReformulator {
    fn reformulate(&self, query: SparqlQuery) -> Result<SparqlQuery, ReformulationError> {
        Ok(query)
    }
}

pub struct TaxonomyReformulator {
    hierarchy: Arc<dyn OntologyHierarchy>,
    max_branches: usize,
}

impl TaxonomyReformulator {
    pub fn new(hierarchy: Arc<dyn OntologyHierarchy>, max_branches: usize) -> Self {
        Self {
            hierarchy,
            max_branches,
        }
    }

    /// The atom itself followed by one atom per descendant entity.
    fn alternatives(&self, atom: &TripleAtom, fresh: &mut usize) -> Vec<TripleAtom> {
        let mut out = vec![atom.clone()];
        let Some(predicate) = atom.predicate.as_iri() else {
            return out;
        };
        if predicate == RDF_TYPE {
            let Some(class) = atom.object.as_iri() else {
                return out;
            };
            let descendants = self
                .hierarchy
                .class_descendants(&ClassExpression::named(class), Reach::Transitive);
            for descendant in descendants {
                out.push(class_atom(&atom.subject, &descendant, fresh));
            }
        } else {
            let objects = self
                .hierarchy
                .object_property_descendants(&PropertyExpression::named(predicate), Reach::Transitive);
            for sub in objects {
                out.push(property_atom(&atom.subject, &sub, &atom.object));
            }
            let data = self
                .hierarchy
                .data_property_descendants(predicate, Reach::Transitive);
            for sub in data {
                out.push(TripleAtom::new(
                    atom.subject.clone(),
                    Term::iri(sub),
                    atom.object.clone(),
                ));
            }
        }
        out
    }

    fn expand(
        &self,
        branch: &ConjunctiveQuery,
        fresh: &mut usize,
        budget: usize,
    ) -> Result<Vec<ConjunctiveQuery>, ReformulationError> {
        let mut partial: Vec<Vec<TripleAtom>> = vec![Vec::new()];
        for atom in &branch.atoms {
            let alternatives = self.alternatives(atom, fresh);
            if partial.len().saturating_mul(alternatives.len()) > budget {
                return Err(ReformulationError::TooManyBranches {
                    limit: self.max_branches,
                });
            }
            partial = partial
                .iter()
                .flat_map(|prefix| {
                    alternatives.iter().map(move |alt| {
                        let mut atoms = prefix.clone();
                        atoms.push(alt.clone());
                        atoms
                    })
                })
                .collect();
        }
        Ok(partial
            .into_iter()
            .map(|atoms| ConjunctiveQuery {
                atoms,
                filters: branch.filters.clone(),
            })
            .collect())
    }
}

fn fresh_variable(fresh: &mut usize) -> Term {
    let term = Term::var(format!("_r{fresh}"));
    *fresh += 1;
    term
}

fn property_atom(subject: &Term, property: &PropertyExpression, object: &Term) -> TripleAtom {
    if property.inverse {
        TripleAtom::new(object.clone(), Term::iri(&property.iri), subject.clone())
    } else {
        TripleAtom::new(subject.clone(), Term::iri(&property.iri), object.clone())
    }
}

fn class_atom(subject: &Term, class: &ClassExpression, fresh: &mut usize) -> TripleAtom {
    match class {
        ClassExpression::Named { iri } => {
            TripleAtom::new(subject.clone(), Term::iri(RDF_TYPE), Term::iri(iri))
        }
        ClassExpression::ObjectSome { property } => {
            property_atom(subject, property, &fresh_variable(fresh))
        }
        ClassExpression::DataSome { property } => {
            TripleAtom::new(subject.clone(), Term::iri(property), fresh_variable(fresh))
        }
    }
}

impl QueryReformulator for TaxonomyReformulator {
    fn reformulate(&self, query: SparqlQuery) -> Result<SparqlQuery, ReformulationError> {
        let mut fresh = 0;
        let mut seen = BTreeSet::new();
        let mut branches = Vec::new();
        for branch in &query.branches {
            let budget = self.max_branches.saturating_sub(branches.len());
            for expanded in self.expand(branch, &mut fresh, budget)? {
                if seen.insert(expanded.clone()) {
                    branches.push(expanded);
                }
            }
        }
        tracing::debug!(
            before = query.branches.len(),
            after = branches.len(),
            "taxonomy reformulation"
        );
        Ok(SparqlQuery { branches, ..query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obda_model::Variable;
    use obda_ontology::{Ontology, OwlAxiom, Taxonomy};

    fn taxonomy() -> Arc<dyn OntologyHierarchy> {
        let mut ontology = Ontology::new();
        ontology.add_axiom(OwlAxiom::SubClassOf {
            sub: ClassExpression::named("http://ex.org/Manager"),
            sup: ClassExpression::named("http://ex.org/Employee"),
        });
        ontology.add_axiom(OwlAxiom::SubClassOf {
            sub: ClassExpression::some(PropertyExpression::named("http://ex.org/worksFor")),
            sup: ClassExpression::named("http://ex.org/Employee"),
        });
        Arc::new(Taxonomy::from_ontology(&ontology))
    }

    fn employees() -> SparqlQuery {
        SparqlQuery {
            projection: vec![Variable::new("x")],
            distinct: false,
            branches: vec![ConjunctiveQuery::new(vec![TripleAtom::new(
                Term::var("x"),
                Term::iri(RDF_TYPE),
                Term::iri("http://ex.org/Employee"),
            )])],
        }
    }

    #[test]
    fn identity_keeps_the_query() {
        let query = employees();
        assert_eq!(IdentityReformulator.reformulate(query.clone()).unwrap(), query);
    }

    #[test]
    fn class_atoms_expand_to_descendants() {
        let reformulated = TaxonomyReformulator::new(taxonomy(), 16)
            .reformulate(employees())
            .unwrap();
        assert_eq!(reformulated.branches.len(), 3);
        let predicates: BTreeSet<String> = reformulated
            .branches
            .iter()
            .map(|b| b.atoms[0].predicate.to_string())
            .collect();
        assert!(predicates.contains("<http://ex.org/worksFor>"));
    }

    #[test]
    fn expansion_is_bounded() {
        let err = TaxonomyReformulator::new(taxonomy(), 2)
            .reformulate(employees())
            .unwrap_err();
        assert_eq!(err, ReformulationError::TooManyBranches { limit: 2 });
    }

    #[test]
    fn branches_shared_across_the_union_are_kept_once() {
        let mut query = employees();
        query.branches.push(ConjunctiveQuery::new(vec![TripleAtom::new(
            Term::var("x"),
            Term::iri(RDF_TYPE),
            Term::iri("http://ex.org/Manager"),
        )]));
        let reformulated = TaxonomyReformulator::new(taxonomy(), 16)
            .reformulate(query)
            .unwrap();
        assert_eq!(reformulated.branches.len(), 3);
        let unique: BTreeSet<&ConjunctiveQuery> = reformulated.branches.iter().collect();
        assert_eq!(unique.len(), 3);
    }
}
