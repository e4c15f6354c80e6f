//! Freezing: grounding atoms so they can be compared structurally.
//!
//! - variables become plain literals spelling the variable name
//! - URI templates are evaluated over their frozen arguments into IRIs
//! - literals and IRIs are left alone
//!
//! Freezing is idempotent, and an atom built only from IRIs and literals is
//! its own frozen form.

use obda_model::template;
use obda_model::{Atom, Function, Term, TripleAtom};

pub fn freeze_term(term: &Term) -> Term {
    match term {
        Term::Variable(v) => Term::literal(v.name.clone()),
        Term::Literal(_) | Term::Iri(_) => term.clone(),
        Term::Function(f) => {
            let frozen = Function {
                symbol: f.symbol.clone(),
                args: f.args.iter().map(freeze_term).collect(),
            };
            if let Some(iri) = evaluate_template(&frozen) {
                return Term::iri(iri);
            }
            Term::Function(frozen)
        }
    }
}

fn evaluate_template(function: &Function) -> Option<String> {
    let template = function.template()?;
    let values = function
        .args
        .iter()
        .map(Term::lexical_value)
        .collect::<Option<Vec<_>>>()?;
    template::instantiate(template, &values)
}

pub fn freeze_atom(atom: &Atom) -> Atom {
    atom.map_terms(freeze_term)
}

pub fn freeze_triple(atom: &TripleAtom) -> TripleAtom {
    TripleAtom::new(
        freeze_term(&atom.subject),
        freeze_term(&atom.predicate),
        freeze_term(&atom.object),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use obda_model::vocab::RDF_TYPE;

    #[test]
    fn templates_evaluate_over_variable_names() {
        let head = TripleAtom::new(
            Term::uri_template("http://ex.org/emp/{}", vec![Term::var("Employee.id")]),
            Term::iri(RDF_TYPE),
            Term::iri("http://ex.org/Employee"),
        );
        let frozen = freeze_triple(&head);
        assert_eq!(frozen.subject, Term::iri("http://ex.org/emp/Employee.id"));
        assert_eq!(freeze_triple(&frozen), frozen);
    }

    #[test]
    fn variables_become_literals() {
        let atom = Atom::table("T", vec![Term::var("T.a"), Term::var("T.b")]);
        let frozen = freeze_atom(&atom);
        assert_eq!(
            frozen.terms,
            vec![Term::literal("T.a"), Term::literal("T.b")]
        );
        assert!(frozen.terms_ground());
    }
}
