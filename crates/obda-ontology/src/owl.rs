//! OWL 2 QL axioms
//!
//! The fragment of OWL the engine consults: named classes, unqualified
//! existential restrictions (`∃P`, `∃P⁻`, `∃D`), object/data properties and
//! the axioms that shape the class and property taxonomies.

use obda_model::vocab::local_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// Expressions
// ============================================================================

/// An object property, possibly inverted (`P⁻`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyExpression {
    pub iri: String,
    #[serde(default)]
    pub inverse: bool,
}

impl PropertyExpression {
    pub fn named(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            inverse: false,
        }
    }

    pub fn inverse_of(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            inverse: true,
        }
    }

    pub fn inverted(&self) -> Self {
        Self {
            iri: self.iri.clone(),
            inverse: !self.inverse,
        }
    }
}

impl fmt::Display for PropertyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverse {
            write!(f, "{}⁻", local_name(&self.iri))
        } else {
            write!(f, "{}", local_name(&self.iri))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassExpression {
    Named { iri: String },
    /// `∃P` (or `∃P⁻`): things with at least one `P` successor.
    ObjectSome { property: PropertyExpression },
    /// `∃D`: things with at least one value for data property `D`.
    DataSome { property: String },
}

impl ClassExpression {
    pub fn named(iri: impl Into<String>) -> Self {
        ClassExpression::Named { iri: iri.into() }
    }

    pub fn some(property: PropertyExpression) -> Self {
        ClassExpression::ObjectSome { property }
    }

    pub fn data_some(property: impl Into<String>) -> Self {
        ClassExpression::DataSome {
            property: property.into(),
        }
    }

    pub fn as_named(&self) -> Option<&str> {
        match self {
            ClassExpression::Named { iri } => Some(iri),
            _ => None,
        }
    }
}

impl fmt::Display for ClassExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassExpression::Named { iri } => write!(f, "{}", local_name(iri)),
            ClassExpression::ObjectSome { property } => write!(f, "∃{property}"),
            ClassExpression::DataSome { property } => write!(f, "∃{}", local_name(property)),
        }
    }
}

// ============================================================================
// Axioms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Class,
    ObjectProperty,
    DataProperty,
    AnnotationProperty,
    NamedIndividual,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Class => "class",
            EntityKind::ObjectProperty => "object property",
            EntityKind::DataProperty => "data property",
            EntityKind::AnnotationProperty => "annotation property",
            EntityKind::NamedIndividual => "individual",
        };
        f.write_str(s)
    }
}

/// Property characteristics with no effect on the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyCharacteristic {
    Functional,
    InverseFunctional,
    Transitive,
    Asymmetric,
    Reflexive,
    Irreflexive,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "axiom", rename_all = "snake_case")]
pub enum OwlAxiom {
    SubObjectPropertyOf {
        sub: PropertyExpression,
        sup: PropertyExpression,
    },
    SubDataPropertyOf {
        sub: String,
        sup: String,
    },
    SubClassOf {
        sub: ClassExpression,
        sup: ClassExpression,
    },
    ObjectPropertyDomain {
        property: PropertyExpression,
        domain: ClassExpression,
    },
    DataPropertyDomain {
        property: String,
        domain: ClassExpression,
    },
    ObjectPropertyRange {
        property: PropertyExpression,
        range: ClassExpression,
    },
    DataPropertyRange {
        property: String,
        datatype: String,
    },
    InverseObjectProperties {
        first: String,
        second: String,
    },
    SymmetricObjectProperty {
        property: String,
    },
    EquivalentDataProperties {
        properties: Vec<String>,
    },
    EquivalentObjectProperties {
        properties: Vec<PropertyExpression>,
    },
    EquivalentClasses {
        classes: Vec<ClassExpression>,
    },
    DisjointClasses {
        classes: Vec<ClassExpression>,
    },
    PropertyCharacteristic {
        property: String,
        characteristic: PropertyCharacteristic,
    },
    ClassAssertion {
        individual: String,
        class: String,
    },
}

/// Axiom kinds. The declaration order is the processing priority of the
/// mapping saturation pass; kinds after `EquivalentClasses` have no effect
/// on mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxiomKind {
    SubObjectPropertyOf,
    SubDataPropertyOf,
    SubClassOf,
    PropertyDomain,
    PropertyRange,
    InverseObjectProperties,
    SymmetricObjectProperty,
    EquivalentDataProperties,
    EquivalentObjectProperties,
    EquivalentClasses,
    DisjointClasses,
    PropertyCharacteristic,
    ClassAssertion,
}

impl AxiomKind {
    pub const ALL: [AxiomKind; 13] = [
        AxiomKind::SubObjectPropertyOf,
        AxiomKind::SubDataPropertyOf,
        AxiomKind::SubClassOf,
        AxiomKind::PropertyDomain,
        AxiomKind::PropertyRange,
        AxiomKind::InverseObjectProperties,
        AxiomKind::SymmetricObjectProperty,
        AxiomKind::EquivalentDataProperties,
        AxiomKind::EquivalentObjectProperties,
        AxiomKind::EquivalentClasses,
        AxiomKind::DisjointClasses,
        AxiomKind::PropertyCharacteristic,
        AxiomKind::ClassAssertion,
    ];

    pub fn affects_taxonomy(self) -> bool {
        self <= AxiomKind::EquivalentClasses
    }
}

impl fmt::Display for AxiomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl OwlAxiom {
    pub fn kind(&self) -> AxiomKind {
        match self {
            OwlAxiom::SubObjectPropertyOf { .. } => AxiomKind::SubObjectPropertyOf,
            OwlAxiom::SubDataPropertyOf { .. } => AxiomKind::SubDataPropertyOf,
            OwlAxiom::SubClassOf { .. } => AxiomKind::SubClassOf,
            OwlAxiom::ObjectPropertyDomain { .. } | OwlAxiom::DataPropertyDomain { .. } => {
                AxiomKind::PropertyDomain
            }
            OwlAxiom::ObjectPropertyRange { .. } | OwlAxiom::DataPropertyRange { .. } => {
                AxiomKind::PropertyRange
            }
            OwlAxiom::InverseObjectProperties { .. } => AxiomKind::InverseObjectProperties,
            OwlAxiom::SymmetricObjectProperty { .. } => AxiomKind::SymmetricObjectProperty,
            OwlAxiom::EquivalentDataProperties { .. } => AxiomKind::EquivalentDataProperties,
            OwlAxiom::EquivalentObjectProperties { .. } => AxiomKind::EquivalentObjectProperties,
            OwlAxiom::EquivalentClasses { .. } => AxiomKind::EquivalentClasses,
            OwlAxiom::DisjointClasses { .. } => AxiomKind::DisjointClasses,
            OwlAxiom::PropertyCharacteristic { .. } => AxiomKind::PropertyCharacteristic,
            OwlAxiom::ClassAssertion { .. } => AxiomKind::ClassAssertion,
        }
    }

    /// Domain and range axioms as the equivalent subclass axiom
    /// (`∃P ⊑ D`, `∃P⁻ ⊑ R`, `∃D ⊑ C`). `None` for everything else,
    /// including data ranges, which constrain values rather than classes.
    pub fn as_subclass_of(&self) -> Option<(ClassExpression, ClassExpression)> {
        match self {
            OwlAxiom::SubClassOf { sub, sup } => Some((sub.clone(), sup.clone())),
            OwlAxiom::ObjectPropertyDomain { property, domain } => {
                Some((ClassExpression::some(property.clone()), domain.clone()))
            }
            OwlAxiom::ObjectPropertyRange { property, range } => {
                Some((ClassExpression::some(property.inverted()), range.clone()))
            }
            OwlAxiom::DataPropertyDomain { property, domain } => {
                Some((ClassExpression::data_some(property.clone()), domain.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for OwlAxiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            OwlAxiom::SubObjectPropertyOf { sub, sup } => write!(f, "SubObjectPropertyOf({sub}, {sup})"),
            OwlAxiom::SubDataPropertyOf { sub, sup } => write!(
                f,
                "SubDataPropertyOf({}, {})",
                local_name(sub),
                local_name(sup)
            ),
            OwlAxiom::SubClassOf { sub, sup } => write!(f, "SubClassOf({sub}, {sup})"),
            OwlAxiom::ObjectPropertyDomain { property, domain } => {
                write!(f, "ObjectPropertyDomain({property}, {domain})")
            }
            OwlAxiom::DataPropertyDomain { property, domain } => {
                write!(f, "DataPropertyDomain({}, {domain})", local_name(property))
            }
            OwlAxiom::ObjectPropertyRange { property, range } => {
                write!(f, "ObjectPropertyRange({property}, {range})")
            }
            OwlAxiom::DataPropertyRange { property, datatype } => write!(
                f,
                "DataPropertyRange({}, {})",
                local_name(property),
                local_name(datatype)
            ),
            OwlAxiom::InverseObjectProperties { first, second } => write!(
                f,
                "InverseObjectProperties({}, {})",
                local_name(first),
                local_name(second)
            ),
            OwlAxiom::SymmetricObjectProperty { property } => {
                write!(f, "SymmetricObjectProperty({})", local_name(property))
            }
            OwlAxiom::EquivalentDataProperties { properties } => {
                let names: Vec<&str> = properties.iter().map(|p| local_name(p)).collect();
                write!(f, "EquivalentDataProperties({})", names.join(", "))
            }
            OwlAxiom::EquivalentObjectProperties { properties } => {
                write!(f, "EquivalentObjectProperties({})", list(properties))
            }
            OwlAxiom::EquivalentClasses { classes } => {
                write!(f, "EquivalentClasses({})", list(classes))
            }
            OwlAxiom::DisjointClasses { classes } => {
                write!(f, "DisjointClasses({})", list(classes))
            }
            OwlAxiom::PropertyCharacteristic {
                property,
                characteristic,
            } => write!(f, "{characteristic:?}Property({})", local_name(property)),
            OwlAxiom::ClassAssertion { individual, class } => write!(
                f,
                "ClassAssertion({}, {})",
                local_name(class),
                local_name(individual)
            ),
        }
    }
}

// ============================================================================
// Ontology
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ontology {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iri: Option<String>,
    #[serde(default)]
    pub declarations: BTreeMap<String, BTreeSet<EntityKind>>,
    #[serde(default)]
    pub axioms: Vec<OwlAxiom>,
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, iri: impl Into<String>, kind: EntityKind) {
        self.declarations.entry(iri.into()).or_default().insert(kind);
    }

    pub fn add_axiom(&mut self, axiom: OwlAxiom) {
        if !self.axioms.contains(&axiom) {
            self.axioms.push(axiom);
        }
    }

    pub fn is_declared(&self, iri: &str, kind: EntityKind) -> bool {
        self.declarations
            .get(iri)
            .is_some_and(|kinds| kinds.contains(&kind))
    }

    pub fn entity_kinds(&self, iri: &str) -> impl Iterator<Item = EntityKind> + '_ {
        self.declarations.get(iri).into_iter().flatten().copied()
    }

    pub fn axioms_of(&self, kind: AxiomKind) -> impl Iterator<Item = &OwlAxiom> {
        self.axioms.iter().filter(move |a| a.kind() == kind)
    }
}
