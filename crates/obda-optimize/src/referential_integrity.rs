//! Removing mappings made redundant by foreign keys.
//!
//! With `Order.customerId -> Customer.id`, a mapping producing
//! `:person/{customerId}` from `Order` adds nothing once `:person/{id}` is
//! produced from `Customer`: every referenced customer row exists.

use crate::containment::{foreign_key_rules, MappingContainmentChecker};
use crate::knowledge_base::KnowledgeBase;
use crate::processor::{MappingProcessor, ProcessorKind, ProcessorOutput, ProcessorReport};
use obda_model::{Mapping, MappingSet};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferentialIntegrityProcessor;

impl MappingProcessor for ReferentialIntegrityProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::ReferentialIntegrity
    }

    fn process(&self, mut mappings: MappingSet, kb: &KnowledgeBase) -> ProcessorOutput {
        let mut report = ProcessorReport::new(self.kind(), mappings.len());
        let rules = foreign_key_rules(kb.metadata());
        if rules.is_empty() {
            return ProcessorOutput { mappings, report };
        }
        tracing::debug!(rules = rules.len(), "foreign-key rules built");

        let checker = MappingContainmentChecker::new(kb.metadata());
        let mut redundant: BTreeSet<Mapping> = BTreeSet::new();

        for signature in mappings.signatures() {
            let group: Vec<&Mapping> = mappings.get(signature).collect();
            if group.len() < 2 {
                continue;
            }
            let mut marked = vec![false; group.len()];
            for i in 0..group.len() {
                for j in 0..group.len() {
                    // A mapping already marked neither removes nor is removed
                    // again, so mutually contained mappings keep one copy.
                    if i == j || marked[i] || marked[j] {
                        continue;
                    }
                    match checker.is_contained(group[i], group[j], &rules) {
                        Ok(true) => {
                            tracing::debug!(kept = %group[i].id, removed = %group[j].id, "mapping contained");
                            marked[j] = true;
                        }
                        Ok(false) => {}
                        Err(err) => {
                            tracing::trace!(error = %err, "containment check skipped");
                            report.skip(err.reason.category());
                        }
                    }
                }
            }
            redundant.extend(
                group
                    .iter()
                    .zip(&marked)
                    .filter(|(_, flag)| **flag)
                    .map(|(m, _)| (*m).clone()),
            );
        }

        report.removed = mappings.remove_all(&redundant);
        report.after = mappings.len();
        ProcessorOutput { mappings, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obda_model::{
        ColumnDefinition, DbMetadata, ForeignKey, ForeignKeyColumn, RelationId, SqlQuery,
        TableDefinition, Term,
    };
    use obda_ontology::Ontology;
    use std::sync::Arc;

    fn person(id: &str, table: &str, column: &str) -> Mapping {
        Mapping::class(
            id,
            "http://ex.org/Person",
            Term::uri_template("http://ex.org/person/{}", vec![Term::var(column)]),
            SqlQuery::from_table(table, &[column]),
        )
    }

    fn shop() -> DbMetadata {
        let customer = TableDefinition::new(
            RelationId::new("Customer"),
            vec![ColumnDefinition::new("id", "INT")],
        );
        let mut order = TableDefinition::new(
            RelationId::new("Order"),
            vec![
                ColumnDefinition::new("id", "INT"),
                ColumnDefinition::new("customerId", "INT"),
            ],
        );
        order.foreign_keys.push(ForeignKey {
            name: Some("order_customer".into()),
            from_table: RelationId::new("Order"),
            to_table: RelationId::new("Customer"),
            columns: vec![ForeignKeyColumn {
                fk_column: "customerId".into(),
                pk_column: "id".into(),
            }],
        });
        DbMetadata::from(vec![customer, order])
    }

    #[test]
    fn referencing_mapping_is_removed() {
        let mappings = MappingSet::from(vec![
            person("customers", "Customer", "id"),
            person("orders", "Order", "customerId"),
        ]);
        let kb = KnowledgeBase::new(MappingSet::new(), Arc::new(shop()), Ontology::new());
        let out = ReferentialIntegrityProcessor.process(mappings, &kb);

        assert_eq!(out.report.removed, 1);
        let survivors: Vec<&str> = out.mappings.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(survivors, vec!["customers"]);
    }

    #[test]
    fn unsupported_sources_are_counted_not_fatal() {
        let filtered = Mapping::class(
            "filtered",
            "http://ex.org/Person",
            Term::uri_template("http://ex.org/person/{}", vec![Term::var("id")]),
            SqlQuery::from_table("Customer", &["id"])
                .with_filter(obda_model::SqlExpr::equals(
                    obda_model::SqlExpr::column("Customer", "id"),
                    obda_model::SqlExpr::string("1"),
                )),
        );
        let mappings = MappingSet::from(vec![filtered, person("orders", "Order", "customerId")]);
        let kb = KnowledgeBase::new(MappingSet::new(), Arc::new(shop()), Ontology::new());
        let out = ReferentialIntegrityProcessor.process(mappings, &kb);

        assert_eq!(out.report.removed, 0);
        assert_eq!(out.mappings.len(), 2);
        assert_eq!(out.report.skipped.get("where filter in source"), Some(&2));
    }
}
