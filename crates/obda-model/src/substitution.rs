//! Substitutions (variable → term bindings) and their composition.

use crate::term::{Function, Term, Variable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    bindings: BTreeMap<Variable, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(variable: Variable, term: Term) -> Self {
        let mut s = Self::new();
        s.bind(variable, term);
        s
    }

    /// Bind `variable`, returning the previous binding. Self-bindings are dropped.
    pub fn bind(&mut self, variable: Variable, term: Term) -> Option<Term> {
        if matches!(&term, Term::Variable(v) if *v == variable) {
            return self.bindings.remove(&variable);
        }
        self.bindings.insert(variable, term)
    }

    pub fn unbind(&mut self, variable: &Variable) -> Option<Term> {
        self.bindings.remove(variable)
    }

    pub fn is_bound(&self, variable: &Variable) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn replace(&self, variable: &Variable) -> Option<&Term> {
        self.bindings.get(variable)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter()
    }

    /// Apply the bindings once (no chasing of variable chains).
    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Variable(v) => self.bindings.get(v).cloned().unwrap_or_else(|| term.clone()),
            Term::Literal(_) | Term::Iri(_) => term.clone(),
            Term::Function(f) => Term::Function(self.apply_function(f)),
        }
    }

    pub fn apply_function(&self, function: &Function) -> Function {
        Function {
            symbol: function.symbol.clone(),
            args: function.args.iter().map(|a| self.apply(a)).collect(),
        }
    }

    /// `self ∘ sigma`: applying the result equals applying `self`, then `sigma`.
    ///
    /// Every binding of `self` gets `sigma` applied to its term, `sigma`'s
    /// bindings for variables not bound by `self` are added, and bindings
    /// that end up mapping a variable to itself are removed.
    pub fn compose(&self, sigma: &Substitution) -> Substitution {
        let mut bindings = BTreeMap::new();
        for (variable, term) in &self.bindings {
            bindings.insert(variable.clone(), sigma.apply(term));
        }
        for (variable, term) in &sigma.bindings {
            if !self.bindings.contains_key(variable) {
                bindings.insert(variable.clone(), term.clone());
            }
        }
        bindings.retain(|variable, term| !matches!(term, Term::Variable(v) if v == variable));
        Substitution { bindings }
    }
}

impl FromIterator<(Variable, Term)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        let mut s = Substitution::new();
        for (variable, term) in iter {
            s.bind(variable, term);
        }
        s
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (variable, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{variable}/{term}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> Variable {
        Variable::new(name)
    }

    #[test]
    fn bind_replace_unbind() {
        let mut s = Substitution::new();
        assert!(!s.is_bound(&v("x")));
        s.bind(v("x"), Term::literal("a"));
        assert_eq!(s.replace(&v("x")), Some(&Term::literal("a")));
        assert_eq!(s.unbind(&v("x")), Some(Term::literal("a")));
        assert!(s.replace(&v("x")).is_none());
    }

    #[test]
    fn apply_recurses_into_functions() {
        let s = Substitution::singleton(v("id"), Term::literal("7"));
        let t = Term::uri_template("http://ex.org/{}", vec![Term::var("id")]);
        assert_eq!(
            s.apply(&t),
            Term::uri_template("http://ex.org/{}", vec![Term::literal("7")])
        );
    }

    #[test]
    fn compose_applies_sigma_to_theta_and_adds_missing() {
        // theta = {x/f(y)}, sigma = {y/a, z/b}
        let theta = Substitution::singleton(
            v("x"),
            Term::uri_template("http://ex.org/{}", vec![Term::var("y")]),
        );
        let sigma: Substitution = [(v("y"), Term::literal("a")), (v("z"), Term::literal("b"))]
            .into_iter()
            .collect();
        let composed = theta.compose(&sigma);
        assert_eq!(
            composed.replace(&v("x")),
            Some(&Term::uri_template("http://ex.org/{}", vec![Term::literal("a")]))
        );
        assert_eq!(composed.replace(&v("y")), Some(&Term::literal("a")));
        assert_eq!(composed.replace(&v("z")), Some(&Term::literal("b")));
    }

    #[test]
    fn compose_drops_self_bindings() {
        let theta = Substitution::singleton(v("x"), Term::var("y"));
        let sigma = Substitution::singleton(v("y"), Term::var("x"));
        let composed = theta.compose(&sigma);
        assert!(!composed.is_bound(&v("x")));
        assert_eq!(composed.replace(&v("y")), Some(&Term::var("x")));
    }

    #[test]
    fn theta_keys_win_over_sigma() {
        let theta = Substitution::singleton(v("x"), Term::literal("a"));
        let sigma = Substitution::singleton(v("x"), Term::literal("b"));
        assert_eq!(theta.compose(&sigma).replace(&v("x")), Some(&Term::literal("a")));
    }
}
