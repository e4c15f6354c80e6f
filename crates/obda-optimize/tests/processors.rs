use obda_model::{DbMetadata, Mapping, MappingSet, SqlExpr, SqlQuery, Term};
use obda_ontology::{ClassExpression, Ontology, OwlAxiom};
use obda_optimize::{
    DisjunctionProcessor, KnowledgeBase, KnowledgeBaseProcessor, MappingContainmentChecker,
    OptimizeError, OptimizerPipeline, ProcessorKind, TMappingProcessor,
};
use obda_sql::parse_sql_ddl;
use std::sync::Arc;

const EX: &str = "http://ex.org/";

fn iri(local: &str) -> String {
    format!("{EX}{local}")
}

fn subject(column: &str) -> Term {
    Term::uri_template(format!("{EX}thing/{{}}"), vec![Term::var(column)])
}

fn class_mapping(id: &str, class: &str, table: &str, column: &str) -> Mapping {
    Mapping::class(id, iri(class), subject(column), SqlQuery::from_table(table, &[column]))
}

fn chain() -> Ontology {
    let mut ontology = Ontology::new();
    for (sub, sup) in [("A", "B"), ("B", "C")] {
        ontology.add_axiom(OwlAxiom::SubClassOf {
            sub: ClassExpression::named(iri(sub)),
            sup: ClassExpression::named(iri(sup)),
        });
    }
    ontology
}

#[test]
fn tmapping_closes_subclass_chains_and_is_idempotent() {
    let mappings = MappingSet::from(vec![class_mapping("a", "A", "TA", "id")]);
    let mut kb = KnowledgeBase::new(mappings, Arc::new(DbMetadata::new()), chain());

    let report = TMappingProcessor.optimize(&mut kb).unwrap();
    assert_eq!(report.added, 2);
    for class in ["A", "B", "C"] {
        let found: Vec<&Mapping> = kb.mappings().get(&iri(class)).collect();
        assert_eq!(found.len(), 1, "one mapping for {class}");
        assert_eq!(found[0].source, SqlQuery::from_table("TA", &["id"]));
    }

    let again = TMappingProcessor.optimize(&mut kb).unwrap();
    assert_eq!(again.added, 0);
    assert_eq!(kb.mappings().len(), 3);
}

#[test]
fn referential_integrity_removes_the_order_mapping() {
    let metadata = parse_sql_ddl(
        "CREATE TABLE Customer (id INT PRIMARY KEY, name VARCHAR(40));
         CREATE TABLE Orders (id INT PRIMARY KEY, customerId INT REFERENCES Customer(id));",
    )
    .unwrap();
    let mappings = MappingSet::from(vec![
        class_mapping("customers", "Person", "Customer", "id"),
        class_mapping("orders", "Person", "Orders", "customerId"),
    ]);
    let mut kb = KnowledgeBase::new(mappings, Arc::new(metadata), Ontology::new());

    let reports = OptimizerPipeline::from_kinds(&[ProcessorKind::ReferentialIntegrity])
        .run(&mut kb)
        .unwrap();
    assert_eq!(reports[0].removed, 1);
    let ids: Vec<&str> = kb.mappings().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["customers"]);
}

#[test]
fn referential_integrity_handles_tables_referencing_themselves() {
    let metadata = parse_sql_ddl(
        "CREATE TABLE Employee (id INT PRIMARY KEY, managerId INT REFERENCES Employee(id));",
    )
    .unwrap();
    let mappings = MappingSet::from(vec![
        class_mapping("ids", "Person", "Employee", "id"),
        class_mapping("managers", "Person", "Employee", "managerId"),
    ]);
    let mut kb = KnowledgeBase::new(mappings, Arc::new(metadata), Ontology::new());

    let reports = OptimizerPipeline::from_kinds(&[ProcessorKind::ReferentialIntegrity])
        .run(&mut kb)
        .unwrap();
    assert_eq!(reports[0].removed, 1);
    let ids: Vec<&str> = kb.mappings().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["ids"]);
}

fn line_mapping(id: &str, table: &str) -> Mapping {
    Mapping::class(
        id,
        iri("Line"),
        Term::uri_template(
            format!("{EX}line/{{}}/{{}}"),
            vec![Term::var("orderNo"), Term::var("lineNo")],
        ),
        SqlQuery::from_table(table, &["orderNo", "lineNo"]),
    )
}

#[test]
fn referential_integrity_follows_composite_foreign_keys() {
    let metadata = parse_sql_ddl(
        "CREATE TABLE OrderLine (orderNo INT, lineNo INT, product VARCHAR(40),
             PRIMARY KEY (orderNo, lineNo));
         CREATE TABLE Shipment (id INT PRIMARY KEY, orderNo INT, lineNo INT,
             FOREIGN KEY (orderNo, lineNo) REFERENCES OrderLine(orderNo, lineNo));",
    )
    .unwrap();
    let rules = obda_optimize::foreign_key_rules(&metadata);
    assert_eq!(rules.len(), 1);

    let mappings = MappingSet::from(vec![
        line_mapping("lines", "OrderLine"),
        line_mapping("shipments", "Shipment"),
    ]);
    let mut kb = KnowledgeBase::new(mappings, Arc::new(metadata), Ontology::new());
    let reports = OptimizerPipeline::from_kinds(&[ProcessorKind::ReferentialIntegrity])
        .run(&mut kb)
        .unwrap();
    assert_eq!(reports[0].removed, 1);
    let ids: Vec<&str> = kb.mappings().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["lines"]);
}

#[test]
fn containment_never_holds_across_unrelated_tables() {
    let metadata = parse_sql_ddl(
        "CREATE TABLE Left1 (id INT PRIMARY KEY);
         CREATE TABLE Right1 (id INT PRIMARY KEY);",
    )
    .unwrap();
    let checker = MappingContainmentChecker::new(&metadata);
    let left = class_mapping("l", "Thing", "Left1", "id");
    let right = class_mapping("r", "Thing", "Right1", "id");
    let rules = obda_optimize::foreign_key_rules(&metadata);
    assert!(!checker.is_contained(&left, &right, &rules).unwrap());
    assert!(!checker.is_contained(&right, &left, &rules).unwrap());
}

#[test]
fn disjunction_merges_where_clauses_and_keeps_identical_ones() {
    let base = SqlQuery::from_table("T", &["id"]);
    let filter = |value: &str| SqlExpr::equals(SqlExpr::column("T", "kind"), SqlExpr::string(value));
    let mappings = MappingSet::from(vec![
        Mapping::class("x", iri("K"), subject("id"), base.clone().with_filter(filter("x"))),
        Mapping::class("y", iri("K"), subject("id"), base.clone().with_filter(filter("y"))),
        Mapping::class("z", iri("Other"), subject("id"), base.with_filter(filter("z"))),
    ]);
    let mut kb = KnowledgeBase::new(mappings, Arc::new(DbMetadata::new()), Ontology::new());

    let report = DisjunctionProcessor.optimize(&mut kb).unwrap();
    assert_eq!(report.removed, 1);
    let merged: Vec<&Mapping> = kb.mappings().get(&iri("K")).collect();
    assert_eq!(merged.len(), 1);
    assert_eq!(
        merged[0].source.where_clause.iter().next(),
        Some(&SqlExpr::or(filter("x"), filter("y")))
    );

    let again = DisjunctionProcessor.optimize(&mut kb).unwrap();
    assert_eq!(again.removed, 0);
}

#[test]
fn published_knowledge_bases_reject_further_passes() {
    let mappings = MappingSet::from(vec![class_mapping("a", "A", "TA", "id")]);
    let mut kb = KnowledgeBase::new(mappings, Arc::new(DbMetadata::new()), chain());
    let snapshot = kb.publish();
    assert_eq!(snapshot.len(), 1);
    assert!(kb.is_published());

    let err = TMappingProcessor.optimize(&mut kb).unwrap_err();
    assert!(matches!(err, OptimizeError::ImmutableMappingSet));
    assert_eq!(kb.mappings().len(), 1);
}
