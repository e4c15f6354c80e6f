//! The query model handed from the SPARQL front-end to the unfolder.
//!
//! A query is a union of conjunctive queries over triple atoms, with a shared
//! projection. Terms reuse the mapping term algebra: query variables are
//! `Term::Variable`, constants are IRIs or literals, and FILTER expressions
//! are operator functions.

use obda_model::{Function, TripleAtom, Variable};
use std::collections::BTreeSet;
use std::fmt;

/// One conjunctive query: triple patterns plus filters over their variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConjunctiveQuery {
    pub atoms: Vec<TripleAtom>,
    pub filters: Vec<Function>,
}

impl ConjunctiveQuery {
    pub fn new(atoms: Vec<TripleAtom>) -> Self {
        Self {
            atoms,
            filters: Vec::new(),
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        self.atoms.iter().flat_map(TripleAtom::variables).collect()
    }

    /// Both conjunctions at once.
    pub fn join(&self, other: &ConjunctiveQuery) -> ConjunctiveQuery {
        ConjunctiveQuery {
            atoms: self.atoms.iter().chain(&other.atoms).cloned().collect(),
            filters: self.filters.iter().chain(&other.filters).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlQuery {
    pub projection: Vec<Variable>,
    pub distinct: bool,
    pub branches: Vec<ConjunctiveQuery>,
}

impl SparqlQuery {
    pub fn atom_count(&self) -> usize {
        self.branches.iter().map(|b| b.atoms.len()).sum()
    }
}

impl fmt::Display for ConjunctiveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.atoms.iter().map(ToString::to_string).collect();
        parts.extend(self.filters.iter().map(|filter| format!("FILTER {filter}")));
        write!(f, "{{ {} }}", parts.join(" . "))
    }
}

impl fmt::Display for SparqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        let projection: Vec<String> = self
            .projection
            .iter()
            .map(|v| format!("?{}", v.name))
            .collect();
        write!(f, "{} WHERE ", projection.join(" "))?;
        let branches: Vec<String> = self.branches.iter().map(ToString::to_string).collect();
        f.write_str(&branches.join(" UNION "))
    }
}
