use obda_model::{unify, Atom, Function, Substitution, Term, Variable};
use proptest::prelude::*;

fn variable() -> impl Strategy<Value = Variable> {
    // A small pool so that bindings, terms and atoms actually overlap.
    prop_oneof![Just("a"), Just("b"), Just("c"), Just("d"), Just("e")].prop_map(Variable::new)
}

fn constant() -> impl Strategy<Value = Term> {
    prop_oneof![
        proptest::string::string_regex("[a-z0-9]{1,4}")
            .unwrap()
            .prop_map(Term::literal),
        prop_oneof![Just("http://ex.org/A"), Just("http://ex.org/B")].prop_map(Term::iri),
    ]
}

fn term() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![variable().prop_map(Term::Variable), constant()];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 1..=2).prop_map(|args| {
                let template = vec!["{}"; args.len()].join("/");
                Term::Function(Function::uri_template(format!("http://ex.org/{template}"), args))
            }),
            proptest::collection::vec(inner, 1..=2).prop_map(|args| {
                Term::Function(Function::uri_template("urn:pair:{}", args))
            }),
        ]
    })
}

fn substitution() -> impl Strategy<Value = Substitution> {
    proptest::collection::vec((variable(), term()), 0..4)
        .prop_map(|bindings| bindings.into_iter().collect())
}

fn table_atom() -> impl Strategy<Value = Atom> {
    proptest::collection::vec(term(), 3).prop_map(|terms| Atom::table("T", terms))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn composition_matches_sequential_application(
        theta in substitution(),
        sigma in substitution(),
        t in term(),
    ) {
        let composed = theta.compose(&sigma);
        prop_assert_eq!(composed.apply(&t), sigma.apply(&theta.apply(&t)));
    }

    #[test]
    fn composition_never_keeps_self_bindings(theta in substitution(), sigma in substitution()) {
        let composed = theta.compose(&sigma);
        for (variable, term) in composed.iter() {
            prop_assert_ne!(term, &Term::Variable(variable.clone()));
        }
    }

    #[test]
    fn unifiers_make_atoms_identical(a in table_atom(), b in table_atom()) {
        if let Ok(mgu) = unify(&a, &b) {
            prop_assert_eq!(a.apply(&mgu), b.apply(&mgu));
        }
    }

    #[test]
    fn atoms_unify_with_themselves_trivially(a in table_atom()) {
        let mgu = unify(&a, &a).expect("an atom unifies with itself");
        prop_assert!(mgu.is_empty());
    }

    #[test]
    fn constants_are_unaffected_by_substitution(s in substitution(), c in constant()) {
        prop_assert_eq!(s.apply(&c), c);
    }
}
