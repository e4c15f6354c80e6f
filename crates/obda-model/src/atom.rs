//! Atoms: a predicate applied to an ordered list of terms.

use crate::substitution::Substitution;
use crate::term::{Term, Variable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Predicate {
    /// Reserved symbol of triple atoms (arity 3).
    Triple,
    /// A database relation; every term is a column variable.
    Table(String),
    Named(String),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Triple => write!(f, "triple"),
            Predicate::Table(name) | Predicate::Named(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Atom {
    pub predicate: Predicate,
    pub terms: Vec<Term>,
}

impl Atom {
    pub fn new(predicate: Predicate, terms: Vec<Term>) -> Self {
        if predicate == Predicate::Triple {
            assert_eq!(terms.len(), 3, "triple atoms have exactly three terms");
        }
        Self { predicate, terms }
    }

    pub fn table(name: impl Into<String>, terms: Vec<Term>) -> Self {
        Self::new(Predicate::Table(name.into()), terms)
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    /// Triple and table atoms always denote binding sites and are never
    /// reported as ground; use [`Atom::terms_ground`] for the structural test.
    pub fn is_ground(&self) -> bool {
        match self.predicate {
            Predicate::Triple | Predicate::Table(_) => false,
            Predicate::Named(_) => self.terms_ground(),
        }
    }

    pub fn terms_ground(&self) -> bool {
        self.terms.iter().all(Term::is_ground)
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        for term in &self.terms {
            term.collect_variables(&mut out);
        }
        out
    }

    pub fn apply(&self, substitution: &Substitution) -> Atom {
        Atom {
            predicate: self.predicate.clone(),
            terms: self.terms.iter().map(|t| substitution.apply(t)).collect(),
        }
    }

    pub fn map_terms(&self, f: impl FnMut(&Term) -> Term) -> Atom {
        Atom {
            predicate: self.predicate.clone(),
            terms: self.terms.iter().map(f).collect(),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{term}")?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// Triple atoms
// ============================================================================

/// Mapping heads and query patterns. Always exactly three assigned terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripleAtom {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TripleAtom {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    pub fn terms(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    pub fn to_atom(&self) -> Atom {
        Atom::new(
            Predicate::Triple,
            vec![
                self.subject.clone(),
                self.predicate.clone(),
                self.object.clone(),
            ],
        )
    }

    /// Inverse of [`TripleAtom::to_atom`]; `None` for non-triple atoms.
    pub fn from_atom(atom: &Atom) -> Option<Self> {
        match (&atom.predicate, atom.terms.as_slice()) {
            (Predicate::Triple, [s, p, o]) => Some(Self::new(s.clone(), p.clone(), o.clone())),
            _ => None,
        }
    }

    pub fn apply(&self, substitution: &Substitution) -> TripleAtom {
        TripleAtom {
            subject: substitution.apply(&self.subject),
            predicate: substitution.apply(&self.predicate),
            object: substitution.apply(&self.object),
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        for term in self.terms() {
            term.collect_variables(&mut out);
        }
        out
    }
}

impl fmt::Display for TripleAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "triple({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::RDF_TYPE;

    #[test]
    fn triple_and_table_atoms_are_never_ground() {
        let triple = TripleAtom::new(
            Term::iri("http://ex.org/a"),
            Term::iri(RDF_TYPE),
            Term::iri("http://ex.org/A"),
        )
        .to_atom();
        assert!(!triple.is_ground());
        assert!(triple.terms_ground());

        let table = Atom::table("Employee", vec![Term::literal("x")]);
        assert!(!table.is_ground());

        let named = Atom::new(Predicate::Named("p".into()), vec![Term::literal("x")]);
        assert!(named.is_ground());
    }

    #[test]
    #[should_panic(expected = "exactly three terms")]
    fn malformed_triple_atom_fails_fast() {
        let _ = Atom::new(Predicate::Triple, vec![Term::var("x")]);
    }

    #[test]
    fn triple_atom_round_trips_through_atom() {
        let t = TripleAtom::new(Term::var("x"), Term::iri(RDF_TYPE), Term::iri("http://ex.org/A"));
        assert_eq!(TripleAtom::from_atom(&t.to_atom()), Some(t));
    }
}
