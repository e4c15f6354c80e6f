//! Pre-computed class and property taxonomies.
//!
//! The taxonomy is a fixed set of subsumption edges read off the ontology's
//! axioms; ancestors and descendants are reachability queries over it. No
//! other inference is performed.

use crate::owl::{AxiomKind, ClassExpression, EntityKind, Ontology, OwlAxiom, PropertyExpression};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    Direct,
    Transitive,
}

/// Read access to a pre-computed taxonomy.
pub trait OntologyHierarchy: Send + Sync {
    fn class_ancestors(&self, class: &ClassExpression, reach: Reach) -> BTreeSet<ClassExpression>;

    fn class_descendants(&self, class: &ClassExpression, reach: Reach)
        -> BTreeSet<ClassExpression>;

    fn object_property_ancestors(
        &self,
        property: &PropertyExpression,
        reach: Reach,
    ) -> BTreeSet<PropertyExpression>;

    fn object_property_descendants(
        &self,
        property: &PropertyExpression,
        reach: Reach,
    ) -> BTreeSet<PropertyExpression>;

    fn data_property_ancestors(&self, property: &str, reach: Reach) -> BTreeSet<String>;

    fn data_property_descendants(&self, property: &str, reach: Reach) -> BTreeSet<String>;

    fn is_declared(&self, iri: &str, kind: EntityKind) -> bool;
}

// ============================================================================
// Subsumption graph
// ============================================================================

#[derive(Debug, Clone)]
struct Digraph<N: Ord + Clone> {
    parents: BTreeMap<N, BTreeSet<N>>,
    children: BTreeMap<N, BTreeSet<N>>,
}

impl<N: Ord + Clone> Default for Digraph<N> {
    fn default() -> Self {
        Self {
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

impl<N: Ord + Clone> Digraph<N> {
    fn add_edge(&mut self, child: N, parent: N) {
        if child == parent {
            return;
        }
        self.parents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
        self.children.entry(parent).or_default().insert(child);
    }

    fn add_equivalence(&mut self, a: N, b: N) {
        self.add_edge(a.clone(), b.clone());
        self.add_edge(b, a);
    }

    fn edge_count(&self) -> usize {
        self.parents.values().map(BTreeSet::len).sum()
    }

    /// Nodes reachable from `start` (excluding `start`), breadth first.
    fn reach(edges: &BTreeMap<N, BTreeSet<N>>, start: &N, reach: Reach) -> BTreeSet<N> {
        let direct = edges.get(start).cloned().unwrap_or_default();
        if reach == Reach::Direct {
            return direct;
        }
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<N> = direct.into_iter().collect();
        while let Some(node) = queue.pop_front() {
            if node == *start || !seen.insert(node.clone()) {
                continue;
            }
            if let Some(next) = edges.get(&node) {
                queue.extend(next.iter().cloned());
            }
        }
        seen
    }

    fn ancestors(&self, node: &N, reach: Reach) -> BTreeSet<N> {
        Self::reach(&self.parents, node, reach)
    }

    fn descendants(&self, node: &N, reach: Reach) -> BTreeSet<N> {
        Self::reach(&self.children, node, reach)
    }
}

// ============================================================================
// Taxonomy
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    classes: Digraph<ClassExpression>,
    object_properties: Digraph<PropertyExpression>,
    data_properties: Digraph<String>,
    declarations: BTreeMap<String, BTreeSet<EntityKind>>,
}

impl Taxonomy {
    pub fn from_ontology(ontology: &Ontology) -> Self {
        let mut taxonomy = Taxonomy {
            declarations: ontology.declarations.clone(),
            ..Default::default()
        };
        for kind in AxiomKind::ALL.into_iter().filter(|k| k.affects_taxonomy()) {
            for axiom in ontology.axioms_of(kind) {
                taxonomy.add_axiom(axiom);
            }
        }
        tracing::debug!(
            class_edges = taxonomy.classes.edge_count(),
            object_property_edges = taxonomy.object_properties.edge_count(),
            data_property_edges = taxonomy.data_properties.edge_count(),
            "taxonomy built"
        );
        taxonomy
    }

    fn add_axiom(&mut self, axiom: &OwlAxiom) {
        if let Some((sub, sup)) = axiom.as_subclass_of() {
            self.classes.add_edge(sub, sup);
            return;
        }
        match axiom {
            OwlAxiom::SubObjectPropertyOf { sub, sup } => self.sub_object_property(sub, sup),
            OwlAxiom::SubDataPropertyOf { sub, sup } => self.sub_data_property(sub, sup),
            OwlAxiom::InverseObjectProperties { first, second } => {
                // P ≡ Q⁻
                let p = PropertyExpression::named(first.clone());
                let q_inv = PropertyExpression::inverse_of(second.clone());
                self.sub_object_property(&p, &q_inv);
                self.sub_object_property(&q_inv, &p);
            }
            OwlAxiom::SymmetricObjectProperty { property } => {
                let p = PropertyExpression::named(property.clone());
                let p_inv = p.inverted();
                self.sub_object_property(&p, &p_inv);
                self.sub_object_property(&p_inv, &p);
            }
            OwlAxiom::EquivalentObjectProperties { properties } => {
                for (a, b) in pairs(properties) {
                    self.sub_object_property(a, b);
                    self.sub_object_property(b, a);
                }
            }
            OwlAxiom::EquivalentDataProperties { properties } => {
                for (a, b) in pairs(properties) {
                    self.sub_data_property(a, b);
                    self.sub_data_property(b, a);
                }
            }
            OwlAxiom::EquivalentClasses { classes } => {
                for (a, b) in pairs(classes) {
                    self.classes.add_equivalence(a.clone(), b.clone());
                }
            }
            _ => {}
        }
    }

    /// `P ⊑ Q` also gives `P⁻ ⊑ Q⁻`, `∃P ⊑ ∃Q` and `∃P⁻ ⊑ ∃Q⁻`.
    fn sub_object_property(&mut self, sub: &PropertyExpression, sup: &PropertyExpression) {
        self.object_properties.add_edge(sub.clone(), sup.clone());
        self.object_properties
            .add_edge(sub.inverted(), sup.inverted());
        self.classes.add_edge(
            ClassExpression::some(sub.clone()),
            ClassExpression::some(sup.clone()),
        );
        self.classes.add_edge(
            ClassExpression::some(sub.inverted()),
            ClassExpression::some(sup.inverted()),
        );
    }

    fn sub_data_property(&mut self, sub: &str, sup: &str) {
        self.data_properties
            .add_edge(sub.to_string(), sup.to_string());
        self.classes.add_edge(
            ClassExpression::data_some(sub),
            ClassExpression::data_some(sup),
        );
    }
}

fn pairs<T>(items: &[T]) -> impl Iterator<Item = (&T, &T)> {
    items
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| items[i + 1..].iter().map(move |b| (a, b)))
}

impl OntologyHierarchy for Taxonomy {
    fn class_ancestors(&self, class: &ClassExpression, reach: Reach) -> BTreeSet<ClassExpression> {
        self.classes.ancestors(class, reach)
    }

    fn class_descendants(
        &self,
        class: &ClassExpression,
        reach: Reach,
    ) -> BTreeSet<ClassExpression> {
        self.classes.descendants(class, reach)
    }

    fn object_property_ancestors(
        &self,
        property: &PropertyExpression,
        reach: Reach,
    ) -> BTreeSet<PropertyExpression> {
        self.object_properties.ancestors(property, reach)
    }

    fn object_property_descendants(
        &self,
        property: &PropertyExpression,
        reach: Reach,
    ) -> BTreeSet<PropertyExpression> {
        self.object_properties.descendants(property, reach)
    }

    fn data_property_ancestors(&self, property: &str, reach: Reach) -> BTreeSet<String> {
        self.data_properties
            .ancestors(&property.to_string(), reach)
    }

    fn data_property_descendants(&self, property: &str, reach: Reach) -> BTreeSet<String> {
        self.data_properties
            .descendants(&property.to_string(), reach)
    }

    fn is_declared(&self, iri: &str, kind: EntityKind) -> bool {
        self.declarations
            .get(iri)
            .is_some_and(|kinds| kinds.contains(&kind))
    }
}
