//! Most-general unifiers between atoms.

use crate::atom::{Atom, Predicate};
use crate::substitution::Substitution;
use crate::term::{Term, Variable};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnificationFailure {
    #[error("predicates differ: {left} vs {right}")]
    PredicateMismatch { left: Predicate, right: Predicate },
    #[error("arities differ: {left} vs {right}")]
    ArityMismatch { left: usize, right: usize },
    #[error("cannot unify {left} with {right}")]
    Clash { left: Term, right: Term },
    #[error("{variable} occurs in {term}")]
    OccursCheck { variable: Variable, term: Term },
}

/// Unify two atoms, returning the most general unifier.
pub fn unify(left: &Atom, right: &Atom) -> Result<Substitution, UnificationFailure> {
    if left.predicate != right.predicate {
        return Err(UnificationFailure::PredicateMismatch {
            left: left.predicate.clone(),
            right: right.predicate.clone(),
        });
    }
    if left.arity() != right.arity() {
        return Err(UnificationFailure::ArityMismatch {
            left: left.arity(),
            right: right.arity(),
        });
    }
    let mut substitution = Substitution::new();
    for (a, b) in left.terms.iter().zip(&right.terms) {
        unify_terms(a, b, &mut substitution)?;
    }
    Ok(substitution)
}

/// Extend `substitution` so that it unifies `left` and `right`.
///
/// On failure `substitution` may hold a partial result and should be discarded.
pub fn unify_terms(
    left: &Term,
    right: &Term,
    substitution: &mut Substitution,
) -> Result<(), UnificationFailure> {
    let left = substitution.apply(left);
    let right = substitution.apply(right);
    if left == right {
        return Ok(());
    }
    match (&left, &right) {
        (Term::Variable(v), other) | (other, Term::Variable(v)) => {
            if other.occurs(v) {
                return Err(UnificationFailure::OccursCheck {
                    variable: v.clone(),
                    term: other.clone(),
                });
            }
            let step = Substitution::singleton(v.clone(), other.clone());
            *substitution = substitution.compose(&step);
            Ok(())
        }
        (Term::Function(f), Term::Function(g))
            if f.symbol == g.symbol && f.args.len() == g.args.len() =>
        {
            for (a, b) in f.args.iter().zip(&g.args) {
                unify_terms(a, b, substitution)?;
            }
            Ok(())
        }
        _ => Err(UnificationFailure::Clash { left, right }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unifies_table_atom_with_constants() {
        let frozen = Atom::table("Customer", vec![Term::literal("c1"), Term::literal("c2")]);
        let body = Atom::table("Customer", vec![Term::var("fk"), Term::var("name")]);
        let mgu = unify(&frozen, &body).unwrap();
        assert_eq!(mgu.replace(&Variable::new("fk")), Some(&Term::literal("c1")));
        assert_eq!(frozen.apply(&mgu), body.apply(&mgu));
    }

    #[test]
    fn predicate_and_arity_mismatch_fail() {
        let a = Atom::table("A", vec![Term::var("x")]);
        let b = Atom::table("B", vec![Term::var("x")]);
        assert!(matches!(
            unify(&a, &b),
            Err(UnificationFailure::PredicateMismatch { .. })
        ));
        let c = Atom::table("A", vec![Term::var("x"), Term::var("y")]);
        assert!(matches!(
            unify(&a, &c),
            Err(UnificationFailure::ArityMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn incompatible_bindings_fail() {
        let a = Atom::table("T", vec![Term::var("x"), Term::var("x")]);
        let b = Atom::table("T", vec![Term::literal("1"), Term::literal("2")]);
        assert!(matches!(unify(&a, &b), Err(UnificationFailure::Clash { .. })));
    }

    #[test]
    fn shared_variables_propagate_through_composition() {
        let a = Atom::table("T", vec![Term::var("x"), Term::var("y")]);
        let b = Atom::table("T", vec![Term::var("y"), Term::literal("k")]);
        let mgu = unify(&a, &b).unwrap();
        assert_eq!(a.apply(&mgu), b.apply(&mgu));
        assert_eq!(mgu.replace(&Variable::new("x")), Some(&Term::literal("k")));
    }

    #[test]
    fn unifies_inside_templates() {
        let a = Atom::table(
            "T",
            vec![Term::uri_template("http://ex.org/{}", vec![Term::var("x")])],
        );
        let b = Atom::table(
            "T",
            vec![Term::uri_template("http://ex.org/{}", vec![Term::literal("7")])],
        );
        let mgu = unify(&a, &b).unwrap();
        assert_eq!(mgu.replace(&Variable::new("x")), Some(&Term::literal("7")));
    }

    #[test]
    fn occurs_check() {
        let a = Atom::table("T", vec![Term::var("x")]);
        let b = Atom::table(
            "T",
            vec![Term::uri_template("http://ex.org/{}", vec![Term::var("x")])],
        );
        assert!(matches!(
            unify(&a, &b),
            Err(UnificationFailure::OccursCheck { .. })
        ));
    }
}
