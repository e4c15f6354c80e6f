//! Checking mapping signatures against ontology declarations.

use crate::error::{OptimizeError, UndeclaredSignature};
use obda_model::{MappingKind, MappingSet};
use obda_ontology::{EntityKind, OntologyHierarchy};

fn declared(hierarchy: &dyn OntologyHierarchy, iri: &str, kind: MappingKind) -> bool {
    match kind {
        MappingKind::Class => hierarchy.is_declared(iri, EntityKind::Class),
        MappingKind::ObjectProperty => {
            hierarchy.is_declared(iri, EntityKind::ObjectProperty)
                || hierarchy.is_declared(iri, EntityKind::AnnotationProperty)
        }
        MappingKind::DataProperty => {
            hierarchy.is_declared(iri, EntityKind::DataProperty)
                || hierarchy.is_declared(iri, EntityKind::AnnotationProperty)
        }
    }
}

/// Every mapping whose signature is not declared with the matching kind.
pub fn undeclared_signatures(
    mappings: &MappingSet,
    hierarchy: &dyn OntologyHierarchy,
) -> Vec<UndeclaredSignature> {
    mappings
        .iter()
        .filter(|m| !declared(hierarchy, m.signature(), m.kind()))
        .map(|m| UndeclaredSignature {
            mapping: m.id.clone(),
            signature: m.signature().to_string(),
            kind: m.kind(),
        })
        .collect()
}

/// Strict mode rejects undeclared signatures; lax mode only warns.
pub fn validate_signatures(
    mappings: &MappingSet,
    hierarchy: &dyn OntologyHierarchy,
    strict: bool,
) -> Result<(), OptimizeError> {
    let undeclared = undeclared_signatures(mappings, hierarchy);
    if undeclared.is_empty() {
        return Ok(());
    }
    if strict {
        return Err(OptimizeError::UndeclaredSignatures(undeclared));
    }
    for entry in &undeclared {
        tracing::warn!(
            mapping = %entry.mapping,
            signature = %entry.signature,
            kind = %entry.kind,
            "mapping signature not declared in the ontology"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use obda_model::{Mapping, SqlQuery, Term};
    use obda_ontology::{Ontology, Taxonomy};

    fn mappings() -> MappingSet {
        let source = SqlQuery::from_table("Employee", &["id", "name"]);
        let subject = Term::uri_template("http://ex.org/emp/{}", vec![Term::var("id")]);
        MappingSet::from(vec![
            Mapping::class("e", "http://ex.org/Employee", subject.clone(), source.clone()),
            Mapping::property("n", "http://ex.org/name", subject, Term::var("name"), source),
        ])
    }

    #[test]
    fn strict_mode_lists_every_undeclared_signature() {
        let mut ontology = Ontology::new();
        ontology.declare("http://ex.org/Employee", EntityKind::Class);
        let taxonomy = Taxonomy::from_ontology(&ontology);

        let err = validate_signatures(&mappings(), &taxonomy, true).unwrap_err();
        let OptimizeError::UndeclaredSignatures(list) = err else {
            panic!("expected undeclared signatures");
        };
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].signature, "http://ex.org/name");
        assert_eq!(list[0].kind, MappingKind::DataProperty);

        assert!(validate_signatures(&mappings(), &taxonomy, false).is_ok());
    }

    #[test]
    fn annotation_properties_count_as_declared() {
        let mut ontology = Ontology::new();
        ontology.declare("http://ex.org/Employee", EntityKind::Class);
        ontology.declare("http://ex.org/name", EntityKind::AnnotationProperty);
        let taxonomy = Taxonomy::from_ontology(&ontology);
        assert!(undeclared_signatures(&mappings(), &taxonomy).is_empty());
    }
}
