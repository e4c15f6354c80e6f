//! T-mapping saturation: copying mappings up the ontology taxonomy.
//!
//! For every taxonomy axiom, the mappings of the sub-expression are copied to
//! each transitive ancestor, so that a saturated mapping set answers queries
//! without reformulating them. Axiom kinds are handled in the order of
//! [`AxiomKind::ALL`]; kinds that do not shape the taxonomy are ignored.
//!
//! | sub-expression | mappings read           | copied into            |
//! |----------------|-------------------------|------------------------|
//! | class `A`      | class mappings of `A`   | named ancestor classes |
//! | `∃P`           | `P` mappings, subject   | named ancestor classes |
//! | `∃P⁻`          | `P` mappings, object    | named ancestor classes |
//! | `∃D`           | `D` mappings, subject   | named ancestor classes |
//! | property `P`   | `P` mappings            | ancestor properties    |

use crate::knowledge_base::KnowledgeBase;
use crate::processor::{MappingProcessor, ProcessorKind, ProcessorOutput, ProcessorReport};
use obda_model::vocab::local_name;
use obda_model::{Mapping, MappingKind, MappingSet, Term};
use obda_ontology::{
    AxiomKind, ClassExpression, OntologyHierarchy, OwlAxiom, PropertyExpression, Reach,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TMappingProcessor;

impl MappingProcessor for TMappingProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::TMapping
    }

    fn process(&self, mut mappings: MappingSet, kb: &KnowledgeBase) -> ProcessorOutput {
        let mut report = ProcessorReport::new(self.kind(), mappings.len());
        let hierarchy = kb.hierarchy();

        for kind in AxiomKind::ALL {
            let axioms: Vec<&OwlAxiom> = kb.ontology().axioms_of(kind).collect();
            if axioms.is_empty() {
                continue;
            }
            if !kind.affects_taxonomy() {
                tracing::debug!(kind = %kind, count = axioms.len(), "axioms ignored by t-mapping");
                report.skipped.insert(format!("ignored {kind}"), axioms.len());
                continue;
            }
            for axiom in axioms {
                let derived = derived_mappings(axiom, &mappings, hierarchy);
                report.added += mappings.add_all(derived);
            }
        }

        report.after = mappings.len();
        ProcessorOutput { mappings, report }
    }
}

fn derived_mappings(
    axiom: &OwlAxiom,
    mappings: &MappingSet,
    hierarchy: &dyn OntologyHierarchy,
) -> Vec<Mapping> {
    let mut out = Vec::new();
    if let Some((sub, _)) = axiom.as_subclass_of() {
        propagate_class(&sub, mappings, hierarchy, &mut out);
        return out;
    }
    match axiom {
        OwlAxiom::SubObjectPropertyOf { sub, .. } => {
            propagate_object_property(sub, mappings, hierarchy, &mut out);
        }
        OwlAxiom::SubDataPropertyOf { sub, .. } => {
            propagate_data_property(sub, mappings, hierarchy, &mut out);
        }
        OwlAxiom::InverseObjectProperties { first, second } => {
            for iri in [first, second] {
                let named = PropertyExpression::named(iri.clone());
                propagate_object_property(&named, mappings, hierarchy, &mut out);
            }
        }
        OwlAxiom::SymmetricObjectProperty { property } => {
            for mapping in property_mappings(mappings, property) {
                out.push(Mapping::property(
                    derived_id(mapping, property),
                    property.clone(),
                    mapping.object().clone(),
                    mapping.subject().clone(),
                    mapping.source.clone(),
                )
                .with_filters(mapping.filters.iter().cloned()));
            }
        }
        OwlAxiom::EquivalentObjectProperties { properties } => {
            for property in properties {
                propagate_object_property(property, mappings, hierarchy, &mut out);
            }
        }
        OwlAxiom::EquivalentDataProperties { properties } => {
            for property in properties {
                propagate_data_property(property, mappings, hierarchy, &mut out);
            }
        }
        OwlAxiom::EquivalentClasses { classes } => {
            for class in classes {
                propagate_class(class, mappings, hierarchy, &mut out);
            }
        }
        // Data ranges constrain values, not classes.
        _ => {}
    }
    out
}

fn derived_id(mapping: &Mapping, target: &str) -> String {
    format!("{}:tmapping:{}", mapping.id, local_name(target))
}

fn property_mappings<'m>(mappings: &'m MappingSet, iri: &str) -> impl Iterator<Item = &'m Mapping> {
    mappings.get(iri).filter(|m| m.kind().is_property())
}

// ============================================================================
// Classes
// ============================================================================

/// Subjects (or objects) populating `class`, with the mapping they come from.
fn class_members<'m>(class: &ClassExpression, mappings: &'m MappingSet) -> Vec<(&'m Mapping, &'m Term)> {
    match class {
        ClassExpression::Named { iri } => mappings
            .get(iri)
            .filter(|m| m.kind() == MappingKind::Class)
            .map(|m| (m, m.subject()))
            .collect(),
        ClassExpression::ObjectSome { property } => property_mappings(mappings, &property.iri)
            .filter_map(|m| {
                if property.inverse {
                    m.object().is_iri_valued().then(|| (m, m.object()))
                } else {
                    Some((m, m.subject()))
                }
            })
            .collect(),
        ClassExpression::DataSome { property } => property_mappings(mappings, property)
            .map(|m| (m, m.subject()))
            .collect(),
    }
}

fn propagate_class(
    sub: &ClassExpression,
    mappings: &MappingSet,
    hierarchy: &dyn OntologyHierarchy,
    out: &mut Vec<Mapping>,
) {
    let members = class_members(sub, mappings);
    if members.is_empty() {
        return;
    }
    for ancestor in hierarchy.class_ancestors(sub, Reach::Transitive) {
        let Some(target) = ancestor.as_named() else {
            continue;
        };
        for (mapping, member) in &members {
            out.push(
                Mapping::class(
                    derived_id(mapping, target),
                    target,
                    (*member).clone(),
                    mapping.source.clone(),
                )
                .with_filters(mapping.filters.iter().cloned()),
            );
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

fn propagate_object_property(
    sub: &PropertyExpression,
    mappings: &MappingSet,
    hierarchy: &dyn OntologyHierarchy,
    out: &mut Vec<Mapping>,
) {
    let sources: Vec<&Mapping> = property_mappings(mappings, &sub.iri).collect();
    if sources.is_empty() {
        return;
    }
    for ancestor in hierarchy.object_property_ancestors(sub, Reach::Transitive) {
        let swap = sub.inverse != ancestor.inverse;
        for mapping in &sources {
            let (subject, object) = if swap {
                (mapping.object(), mapping.subject())
            } else {
                (mapping.subject(), mapping.object())
            };
            out.push(
                Mapping::property(
                    derived_id(mapping, &ancestor.iri),
                    ancestor.iri.clone(),
                    subject.clone(),
                    object.clone(),
                    mapping.source.clone(),
                )
                .with_filters(mapping.filters.iter().cloned()),
            );
        }
    }
}

fn propagate_data_property(
    sub: &str,
    mappings: &MappingSet,
    hierarchy: &dyn OntologyHierarchy,
    out: &mut Vec<Mapping>,
) {
    let sources: Vec<&Mapping> = property_mappings(mappings, sub).collect();
    if sources.is_empty() {
        return;
    }
    for ancestor in hierarchy.data_property_ancestors(sub, Reach::Transitive) {
        for mapping in &sources {
            out.push(
                Mapping::property(
                    derived_id(mapping, &ancestor),
                    ancestor.clone(),
                    mapping.subject().clone(),
                    mapping.object().clone(),
                    mapping.source.clone(),
                )
                .with_filters(mapping.filters.iter().cloned()),
            );
        }
    }
}
