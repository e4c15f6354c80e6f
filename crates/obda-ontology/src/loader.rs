//! RDF statements → OWL axioms.
//!
//! Two passes: the first collects declarations, restriction blank nodes and
//! inverse-property blank nodes; the second turns the remaining statements
//! into axioms, resolving blank nodes against what the first pass found.
//! Constructs outside the supported fragment are skipped and logged.

use crate::owl::{
    ClassExpression, EntityKind, Ontology, OwlAxiom, PropertyCharacteristic, PropertyExpression,
};
use crate::rdf::{RdfNode, RdfObject, RdfStatement};
use obda_model::vocab::{OWL_NS, RDFS_LITERAL, RDFS_NS, RDF_TYPE, XSD_NS};
use std::collections::BTreeMap;
use tracing::debug;

fn owl(local: &str) -> String {
    format!("{OWL_NS}{local}")
}

fn rdfs(local: &str) -> String {
    format!("{RDFS_NS}{local}")
}

#[derive(Debug, Default)]
struct Restriction {
    on_property: Option<RdfNode>,
    some_values_from: Option<RdfObject>,
}

enum TypeStatement {
    Axiom(OwlAxiom),
    Declaration,
}

#[derive(Debug, Default)]
struct Loader {
    ontology: Ontology,
    restrictions: BTreeMap<String, Restriction>,
    inverses: BTreeMap<String, String>,
    skipped: usize,
}

pub fn ontology_from_statements(statements: &[RdfStatement]) -> Ontology {
    let mut loader = Loader::default();
    for statement in statements {
        loader.collect(statement);
    }
    for statement in statements {
        loader.translate(statement);
    }
    if loader.skipped > 0 {
        debug!(
            skipped = loader.skipped,
            "statements outside the supported OWL fragment were ignored"
        );
    }
    loader.ontology
}

impl Loader {
    // ========================================================================
    // Pass 1
    // ========================================================================

    fn collect(&mut self, st: &RdfStatement) {
        match (&st.subject, st.predicate.as_str()) {
            (RdfNode::Iri(subject), RDF_TYPE) => {
                let Some(object) = st.object.as_iri() else {
                    return;
                };
                if let Some(kind) = declaration_kind(object) {
                    self.ontology.declare(subject.clone(), kind);
                } else if object == owl("Ontology") {
                    self.ontology.iri = Some(subject.clone());
                } else if object == owl("SymmetricProperty") {
                    self.ontology
                        .declare(subject.clone(), EntityKind::ObjectProperty);
                }
            }
            (RdfNode::BlankNode(bn), p) if p == owl("onProperty") => {
                if let Some(node) = st.object.as_node() {
                    self.restrictions.entry(bn.clone()).or_default().on_property =
                        Some(node.clone());
                }
            }
            (RdfNode::BlankNode(bn), p) if p == owl("someValuesFrom") => {
                self.restrictions
                    .entry(bn.clone())
                    .or_default()
                    .some_values_from = Some(st.object.clone());
            }
            (RdfNode::BlankNode(bn), p) if p == owl("inverseOf") => {
                if let Some(iri) = st.object.as_iri() {
                    self.inverses.insert(bn.clone(), iri.to_string());
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // Pass 2
    // ========================================================================

    fn translate(&mut self, st: &RdfStatement) {
        let p = st.predicate.as_str();
        let axiom = if p == RDF_TYPE {
            match self.type_statement(st) {
                TypeStatement::Axiom(axiom) => Some(axiom),
                TypeStatement::Declaration => return,
            }
        } else if p == rdfs("subClassOf") {
            self.class_pair(st)
                .map(|(sub, sup)| OwlAxiom::SubClassOf { sub, sup })
        } else if p == owl("equivalentClass") {
            self.class_pair(st).map(|(a, b)| OwlAxiom::EquivalentClasses {
                classes: vec![a, b],
            })
        } else if p == owl("disjointWith") {
            self.class_pair(st).map(|(a, b)| OwlAxiom::DisjointClasses {
                classes: vec![a, b],
            })
        } else if p == rdfs("subPropertyOf") {
            self.sub_property(st)
        } else if p == owl("equivalentProperty") {
            self.equivalent_property(st)
        } else if p == rdfs("domain") {
            self.domain(st)
        } else if p == rdfs("range") {
            self.range(st)
        } else if p == owl("inverseOf") {
            match (&st.subject, st.object.as_iri()) {
                (RdfNode::Iri(first), Some(second)) => Some(OwlAxiom::InverseObjectProperties {
                    first: first.clone(),
                    second: second.to_string(),
                }),
                // Anonymous inverses were resolved in the first pass.
                _ => return,
            }
        } else {
            return;
        };

        match axiom {
            Some(axiom) => self.ontology.add_axiom(axiom),
            None => {
                debug!(
                    predicate = %st.predicate,
                    "statement outside the supported OWL fragment"
                );
                self.skipped += 1;
            }
        }
    }

    fn type_statement(&self, st: &RdfStatement) -> TypeStatement {
        // Blank-node types (restrictions, anonymous inverses) were read in pass 1.
        let (RdfNode::Iri(subject), Some(object)) = (&st.subject, st.object.as_iri()) else {
            return TypeStatement::Declaration;
        };
        if object == owl("SymmetricProperty") {
            return TypeStatement::Axiom(OwlAxiom::SymmetricObjectProperty {
                property: subject.clone(),
            });
        }
        if let Some(characteristic) = characteristic(object) {
            return TypeStatement::Axiom(OwlAxiom::PropertyCharacteristic {
                property: subject.clone(),
                characteristic,
            });
        }
        if declaration_kind(object).is_some()
            || object.starts_with(OWL_NS)
            || object.starts_with(RDFS_NS)
        {
            return TypeStatement::Declaration;
        }
        TypeStatement::Axiom(OwlAxiom::ClassAssertion {
            individual: subject.clone(),
            class: object.to_string(),
        })
    }

    fn is_data_property(&self, iri: &str) -> bool {
        self.ontology.is_declared(iri, EntityKind::DataProperty)
    }

    fn property(&self, node: &RdfNode) -> Option<PropertyExpression> {
        match node {
            RdfNode::Iri(iri) => Some(PropertyExpression::named(iri.clone())),
            RdfNode::BlankNode(bn) => self
                .inverses
                .get(bn)
                .map(|iri| PropertyExpression::inverse_of(iri.clone())),
        }
    }

    fn class(&self, node: &RdfNode) -> Option<ClassExpression> {
        match node {
            RdfNode::Iri(iri) => Some(ClassExpression::named(iri.clone())),
            RdfNode::BlankNode(bn) => {
                let restriction = self.restrictions.get(bn)?;
                let property = self.property(restriction.on_property.as_ref()?)?;
                let filler = restriction.some_values_from.as_ref()?.as_iri()?;
                let data_filler = filler == RDFS_LITERAL || filler.starts_with(XSD_NS);
                if data_filler || self.is_data_property(&property.iri) {
                    return (!property.inverse).then(|| ClassExpression::data_some(property.iri));
                }
                if filler != owl("Thing") {
                    // Qualified existentials are outside the fragment.
                    return None;
                }
                Some(ClassExpression::some(property))
            }
        }
    }

    fn class_pair(&self, st: &RdfStatement) -> Option<(ClassExpression, ClassExpression)> {
        let sub = self.class(&st.subject)?;
        let sup = self.class(st.object.as_node()?)?;
        Some((sub, sup))
    }

    fn property_pair(&self, st: &RdfStatement) -> Option<(PropertyExpression, PropertyExpression)> {
        let sub = self.property(&st.subject)?;
        let sup = self.property(st.object.as_node()?)?;
        Some((sub, sup))
    }

    fn sub_property(&self, st: &RdfStatement) -> Option<OwlAxiom> {
        let (sub, sup) = self.property_pair(st)?;
        if self.is_data_property(&sub.iri) || self.is_data_property(&sup.iri) {
            if sub.inverse || sup.inverse {
                return None;
            }
            return Some(OwlAxiom::SubDataPropertyOf {
                sub: sub.iri,
                sup: sup.iri,
            });
        }
        Some(OwlAxiom::SubObjectPropertyOf { sub, sup })
    }

    fn equivalent_property(&self, st: &RdfStatement) -> Option<OwlAxiom> {
        let (a, b) = self.property_pair(st)?;
        if self.is_data_property(&a.iri) || self.is_data_property(&b.iri) {
            if a.inverse || b.inverse {
                return None;
            }
            return Some(OwlAxiom::EquivalentDataProperties {
                properties: vec![a.iri, b.iri],
            });
        }
        Some(OwlAxiom::EquivalentObjectProperties {
            properties: vec![a, b],
        })
    }

    fn domain(&self, st: &RdfStatement) -> Option<OwlAxiom> {
        let property = self.property(&st.subject)?;
        let domain = self.class(st.object.as_node()?)?;
        if self.is_data_property(&property.iri) {
            return Some(OwlAxiom::DataPropertyDomain {
                property: property.iri,
                domain,
            });
        }
        Some(OwlAxiom::ObjectPropertyDomain { property, domain })
    }

    fn range(&self, st: &RdfStatement) -> Option<OwlAxiom> {
        let property = self.property(&st.subject)?;
        let target = st.object.as_iri();
        let datatype_range =
            target.is_some_and(|iri| iri == RDFS_LITERAL || iri.starts_with(XSD_NS));
        if self.is_data_property(&property.iri) || datatype_range {
            return Some(OwlAxiom::DataPropertyRange {
                property: property.iri,
                datatype: target?.to_string(),
            });
        }
        let range = self.class(st.object.as_node()?)?;
        Some(OwlAxiom::ObjectPropertyRange { property, range })
    }
}

fn declaration_kind(type_iri: &str) -> Option<EntityKind> {
    let local = type_iri.strip_prefix(OWL_NS);
    match local {
        Some("Class") => Some(EntityKind::Class),
        Some("ObjectProperty") => Some(EntityKind::ObjectProperty),
        Some("DatatypeProperty") => Some(EntityKind::DataProperty),
        Some("AnnotationProperty") => Some(EntityKind::AnnotationProperty),
        Some("NamedIndividual") => Some(EntityKind::NamedIndividual),
        _ if type_iri == format!("{RDFS_NS}Class") => Some(EntityKind::Class),
        _ => None,
    }
}

fn characteristic(type_iri: &str) -> Option<PropertyCharacteristic> {
    match type_iri.strip_prefix(OWL_NS)? {
        "FunctionalProperty" => Some(PropertyCharacteristic::Functional),
        "InverseFunctionalProperty" => Some(PropertyCharacteristic::InverseFunctional),
        "TransitiveProperty" => Some(PropertyCharacteristic::Transitive),
        "AsymmetricProperty" => Some(PropertyCharacteristic::Asymmetric),
        "ReflexiveProperty" => Some(PropertyCharacteristic::Reflexive),
        "IrreflexiveProperty" => Some(PropertyCharacteristic::Irreflexive),
        _ => None,
    }
}
