//! Mappings: `triple(s, p, o) <- SELECT ...`.

use crate::atom::TripleAtom;
use crate::sql::SqlQuery;
use crate::term::{Function, Term, Variable};
use crate::vocab::RDF_TYPE;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("mapping `{id}`: predicate must be an IRI, got {found}")]
    NonIriPredicate { id: String, found: Term },
    #[error("mapping `{id}`: class must be an IRI, got {found}")]
    NonIriClass { id: String, found: Term },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Class,
    ObjectProperty,
    DataProperty,
}

impl MappingKind {
    pub fn is_property(self) -> bool {
        !matches!(self, MappingKind::Class)
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingKind::Class => "class",
            MappingKind::ObjectProperty => "object property",
            MappingKind::DataProperty => "data property",
        };
        f.write_str(s)
    }
}

/// A declarative mapping.
///
/// Head variables name select items of `source` (by alias or column name).
/// Equality, ordering and hashing ignore `id`, which is only a label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMapping")]
pub struct Mapping {
    pub id: String,
    head: TripleAtom,
    pub source: SqlQuery,
    #[serde(default)]
    pub filters: BTreeSet<Function>,
}

#[derive(Deserialize)]
struct RawMapping {
    id: String,
    head: TripleAtom,
    source: SqlQuery,
    #[serde(default)]
    filters: BTreeSet<Function>,
}

impl TryFrom<RawMapping> for Mapping {
    type Error = MappingError;

    fn try_from(raw: RawMapping) -> Result<Self, Self::Error> {
        let mut mapping = Mapping::from_head(raw.id, raw.head, raw.source)?;
        mapping.filters = raw.filters;
        Ok(mapping)
    }
}

impl Mapping {
    /// `triple(subject, rdf:type, <class_iri>) <- source`.
    pub fn class(
        id: impl Into<String>,
        class_iri: impl Into<String>,
        subject: Term,
        source: SqlQuery,
    ) -> Self {
        Self {
            id: id.into(),
            head: TripleAtom::new(subject, Term::iri(RDF_TYPE), Term::iri(class_iri)),
            source,
            filters: BTreeSet::new(),
        }
    }

    /// `triple(subject, <property_iri>, object) <- source`.
    pub fn property(
        id: impl Into<String>,
        property_iri: impl Into<String>,
        subject: Term,
        object: Term,
        source: SqlQuery,
    ) -> Self {
        Self {
            id: id.into(),
            head: TripleAtom::new(subject, Term::iri(property_iri), object),
            source,
            filters: BTreeSet::new(),
        }
    }

    /// Build from an arbitrary head, rejecting non-IRI predicates and classes.
    pub fn from_head(
        id: impl Into<String>,
        head: TripleAtom,
        source: SqlQuery,
    ) -> Result<Self, MappingError> {
        let id = id.into();
        let Some(predicate) = head.predicate.as_iri() else {
            return Err(MappingError::NonIriPredicate {
                id,
                found: head.predicate,
            });
        };
        if predicate == RDF_TYPE && head.object.as_iri().is_none() {
            return Err(MappingError::NonIriClass {
                id,
                found: head.object,
            });
        }
        Ok(Self {
            id,
            head,
            source,
            filters: BTreeSet::new(),
        })
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Function>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// The target atom (mapping head).
    pub fn head(&self) -> &TripleAtom {
        &self.head
    }

    pub fn subject(&self) -> &Term {
        &self.head.subject
    }

    pub fn object(&self) -> &Term {
        &self.head.object
    }

    pub fn predicate_iri(&self) -> &str {
        self.head.predicate.as_iri().unwrap_or_default()
    }

    pub fn kind(&self) -> MappingKind {
        if self.predicate_iri() == RDF_TYPE {
            MappingKind::Class
        } else if self.head.object.is_iri_valued() {
            MappingKind::ObjectProperty
        } else {
            MappingKind::DataProperty
        }
    }

    /// Class IRI for class mappings, property IRI otherwise.
    pub fn signature(&self) -> &str {
        match self.kind() {
            MappingKind::Class => self.head.object.as_iri().unwrap_or_default(),
            _ => self.predicate_iri(),
        }
    }

    pub fn head_variables(&self) -> BTreeSet<Variable> {
        self.head.variables()
    }

    /// Same source and filters under a new head. The head's predicate and
    /// class are taken from IRIs, so the invariants hold.
    pub fn retarget(&self, id: impl Into<String>, head: TripleAtom) -> Result<Self, MappingError> {
        let mut mapping = Self::from_head(id, head, self.source.clone())?;
        mapping.filters = self.filters.clone();
        Ok(mapping)
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.source == other.source
    }
}

impl Eq for Mapping {}

impl Hash for Mapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.head.hash(state);
        self.source.hash(state);
    }
}

impl PartialOrd for Mapping {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Mapping {
    fn cmp(&self, other: &Self) -> Ordering {
        self.head
            .cmp(&other.head)
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::XSD_STRING;

    fn employees() -> SqlQuery {
        SqlQuery::from_table("Employee", &["id", "name"])
    }

    #[test]
    fn class_mapping_signature_is_the_class() {
        let m = Mapping::class(
            "m1",
            "http://ex.org/Employee",
            Term::uri_template("http://ex.org/emp/{}", vec![Term::var("id")]),
            employees(),
        );
        assert_eq!(m.kind(), MappingKind::Class);
        assert_eq!(m.signature(), "http://ex.org/Employee");
    }

    #[test]
    fn property_kind_follows_the_object() {
        let subject = Term::uri_template("http://ex.org/emp/{}", vec![Term::var("id")]);
        let data = Mapping::property(
            "m2",
            "http://ex.org/name",
            subject.clone(),
            Term::Variable(Variable::typed("name", XSD_STRING)),
            employees(),
        );
        assert_eq!(data.kind(), MappingKind::DataProperty);
        assert_eq!(data.signature(), "http://ex.org/name");

        let object = Mapping::property(
            "m3",
            "http://ex.org/self",
            subject.clone(),
            subject,
            employees(),
        );
        assert_eq!(object.kind(), MappingKind::ObjectProperty);
    }

    #[test]
    fn equality_ignores_id() {
        let a = Mapping::class("a", "http://ex.org/A", Term::var("id"), employees());
        let b = Mapping::class("b", "http://ex.org/A", Term::var("id"), employees());
        assert_eq!(a, b);
    }

    #[test]
    fn non_iri_heads_are_rejected() {
        let head = TripleAtom::new(Term::var("id"), Term::var("p"), Term::var("o"));
        assert!(matches!(
            Mapping::from_head("bad", head, employees()),
            Err(MappingError::NonIriPredicate { .. })
        ));
        let head = TripleAtom::new(Term::var("id"), Term::iri(RDF_TYPE), Term::var("c"));
        assert!(matches!(
            Mapping::from_head("bad", head, employees()),
            Err(MappingError::NonIriClass { .. })
        ));
    }
}
