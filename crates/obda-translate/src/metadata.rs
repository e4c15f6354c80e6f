//! Column metadata for translated queries.

use crate::unfold::{TermType, UnfoldedQuery};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub label: String,
    pub is_literal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("branch {branch} has {found} typed columns, expected {expected}")]
    ArityMismatch {
        branch: usize,
        expected: usize,
        found: usize,
    },
}

/// One entry per projected column, in projection order.
///
/// A column's kind is taken from the first branch that binds it. The
/// datatype is kept only when every literal-valued branch agrees on it.
pub fn derive_metadata(query: &UnfoldedQuery) -> Result<Vec<ColumnMetadata>, MetadataError> {
    let expected = query.columns.len();
    for (branch, unfolded) in query.branches.iter().enumerate() {
        if unfolded.types.len() != expected {
            return Err(MetadataError::ArityMismatch {
                branch,
                expected,
                found: unfolded.types.len(),
            });
        }
    }

    Ok(query
        .columns
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let types: Vec<&TermType> = query
                .branches
                .iter()
                .map(|b| &b.types[index])
                .filter(|t| **t != TermType::Unbound)
                .collect();
            let is_literal = matches!(types.first(), Some(TermType::Literal { .. }));
            let mut datatypes = types.iter().filter_map(|t| match t {
                TermType::Literal { datatype } => Some(datatype.as_deref()),
                _ => None,
            });
            let first = datatypes.next().flatten();
            let datatype = if is_literal && datatypes.all(|d| d == first) {
                first.map(str::to_string)
            } else {
                None
            };
            ColumnMetadata {
                label: label.clone(),
                is_literal,
                datatype,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unfold::UnfoldedBranch;
    use obda_model::{SqlQuery, vocab};

    fn query(types: Vec<Vec<TermType>>) -> UnfoldedQuery {
        UnfoldedQuery {
            columns: vec!["x".into(), "v".into()],
            branches: types
                .into_iter()
                .map(|types| UnfoldedBranch {
                    query: SqlQuery::from_table("T", &["a", "b"]),
                    types,
                })
                .collect(),
            distinct: false,
            distinct_union: false,
        }
    }

    fn literal(datatype: &str) -> TermType {
        TermType::Literal {
            datatype: Some(datatype.into()),
        }
    }

    #[test]
    fn first_bound_branch_decides_the_kind() {
        let metadata = derive_metadata(&query(vec![
            vec![TermType::Unbound, literal(vocab::XSD_DECIMAL)],
            vec![TermType::Iri, literal(vocab::XSD_DECIMAL)],
        ]))
        .unwrap();
        assert_eq!(
            metadata,
            vec![
                ColumnMetadata {
                    label: "x".into(),
                    is_literal: false,
                    datatype: None,
                },
                ColumnMetadata {
                    label: "v".into(),
                    is_literal: true,
                    datatype: Some(vocab::XSD_DECIMAL.into()),
                },
            ]
        );
    }

    #[test]
    fn disagreeing_datatypes_are_dropped() {
        let metadata = derive_metadata(&query(vec![
            vec![TermType::Iri, literal(vocab::XSD_DECIMAL)],
            vec![TermType::Iri, literal(vocab::XSD_STRING)],
        ]))
        .unwrap();
        assert_eq!(metadata[1].datatype, None);
        assert!(metadata[1].is_literal);
    }

    #[test]
    fn arity_mismatches_are_reported() {
        let err = derive_metadata(&query(vec![vec![TermType::Iri]])).unwrap_err();
        assert_eq!(
            err,
            MetadataError::ArityMismatch {
                branch: 0,
                expected: 2,
                found: 1
            }
        );
    }
}
