//! Integration tests for the complete OBDA pipeline
//!
//! These tests run the engine end to end across crates:
//! - DDL + ontology + mapping documents → knowledge base
//! - Mapping passes → published mapping set
//! - SPARQL → SQL translation, including concurrent use of one context
//!
//! Run with: cargo test --test integration_tests

use obda_dsl::load_mappings;
use obda_model::vocab::XSD_DECIMAL;
use obda_ontology::load_ontology;
use obda_optimize::{KnowledgeBase, ProcessorKind};
use obda_sql::{load_sql_ddl, SqlFrontend};
use obda_translate::{EngineConfig, EngineContext, QueryTranslator, Stage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn build_translator(
    dir: &Path,
    ddl: &str,
    ontology: &str,
    mappings: &str,
    config: EngineConfig,
) -> (QueryTranslator, Vec<obda_optimize::ProcessorReport>) {
    let ddl_path = dir.join("schema.sql");
    let ontology_path = dir.join("ontology.ttl");
    let mappings_path = dir.join("mappings.obda");
    fs::write(&ddl_path, ddl).unwrap();
    fs::write(&ontology_path, ontology).unwrap();
    fs::write(&mappings_path, mappings).unwrap();

    let metadata = load_sql_ddl(&ddl_path).unwrap();
    let ontology = load_ontology(&ontology_path).unwrap();
    let mappings = load_mappings(&mappings_path, &SqlFrontend::with_metadata(&metadata)).unwrap();
    let mut kb = KnowledgeBase::new(mappings, Arc::new(metadata), ontology);
    let (context, reports) = EngineContext::prepare(config, &mut kb).unwrap();
    (QueryTranslator::new(Arc::new(context)), reports)
}

// ============================================================================
// End to end
// ============================================================================

const EMPLOYEE_DDL: &str = "
CREATE TABLE Employee (id INT PRIMARY KEY, name VARCHAR(40), salary DECIMAL(10,2));
";

const EMPLOYEE_TTL: &str = r#"
@prefix :     <http://ex.org/> .
@prefix owl:  <http://www.w3.org/2002/07/owl#> .

:Employee a owl:Class .
:salary   a owl:DatatypeProperty .
"#;

const EMPLOYEE_OBDA: &str = r#"
[PrefixDeclaration]
:       http://ex.org/
xsd:    http://www.w3.org/2001/XMLSchema#

[MappingDeclaration] @collection [[
mappingId   employees
target      :emp/{id} a :Employee .
source      SELECT id FROM Employee

mappingId   salaries
target      :emp/{id} :salary {salary}^^xsd:decimal .
source      SELECT id, salary FROM Employee
]]
"#;

#[test]
fn test_employee_query_end_to_end() {
    let dir = tempdir().unwrap();
    let strict = EngineConfig {
        strict_mode: true,
        ..EngineConfig::default()
    };
    let (translator, reports) =
        build_translator(dir.path(), EMPLOYEE_DDL, EMPLOYEE_TTL, EMPLOYEE_OBDA, strict);
    assert_eq!(reports.len(), 3);

    let result = translator
        .translate("SELECT ?x WHERE { ?x a <http://ex.org/Employee> }")
        .unwrap();
    assert_eq!(
        result.sql,
        "SELECT 'http://ex.org/emp/' || CAST(v0.id AS VARCHAR) AS x\nFROM Employee AS v0"
    );
    assert_eq!(result.columns.len(), 1);
    assert_eq!(result.columns[0].label, "x");
    assert!(!result.columns[0].is_literal);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["columns"][0]["is_literal"], false);
}

#[test]
fn test_literal_columns_carry_their_datatype() {
    let dir = tempdir().unwrap();
    let (translator, _) = build_translator(
        dir.path(),
        EMPLOYEE_DDL,
        EMPLOYEE_TTL,
        EMPLOYEE_OBDA,
        EngineConfig::default(),
    );
    let result = translator
        .translate("SELECT ?x ?s WHERE { ?x <http://ex.org/salary> ?s FILTER(?s > 100) }")
        .unwrap();
    assert!(result.sql.contains("v0.salary > 100"));
    assert!(result.columns[1].is_literal);
    assert_eq!(result.columns[1].datatype.as_deref(), Some(XSD_DECIMAL));
}

// ============================================================================
// Mapping passes
// ============================================================================

#[test]
fn test_tmapping_closes_the_class_chain() {
    let ttl = r#"
@prefix :     <http://ex.org/> .
@prefix owl:  <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

:A a owl:Class ; rdfs:subClassOf :B .
:B a owl:Class ; rdfs:subClassOf :C .
:C a owl:Class .
"#;
    let obda = r#"
[PrefixDeclaration]
:       http://ex.org/

[MappingDeclaration] @collection [[
mappingId   a
target      :thing/{id} a :A .
source      SELECT id FROM Things
]]
"#;
    let dir = tempdir().unwrap();
    let config = EngineConfig {
        processors: vec![ProcessorKind::TMapping],
        ..EngineConfig::default()
    };
    let (translator, reports) = build_translator(
        dir.path(),
        "CREATE TABLE Things (id INT PRIMARY KEY);",
        ttl,
        obda,
        config,
    );
    assert_eq!(reports[0].added, 2);

    let mappings = translator.context().mappings();
    for class in ["A", "B", "C"] {
        assert_eq!(mappings.get(&format!("http://ex.org/{class}")).count(), 1);
    }
    let result = translator
        .translate("SELECT ?x WHERE { ?x a <http://ex.org/C> }")
        .unwrap();
    assert!(result.sql.contains("FROM Things AS v0"));
}

#[test]
fn test_referential_integrity_drops_the_implied_mapping() {
    let ddl = "
CREATE TABLE Customer (id INT PRIMARY KEY, name VARCHAR(40));
CREATE TABLE Orders (id INT PRIMARY KEY, customerId INT REFERENCES Customer(id));
";
    let ttl = r#"
@prefix :     <http://ex.org/> .
@prefix owl:  <http://www.w3.org/2002/07/owl#> .

:Customer a owl:Class .
"#;
    let obda = r#"
[PrefixDeclaration]
:       http://ex.org/

[MappingDeclaration] @collection [[
mappingId   customers
target      :customer/{id} a :Customer .
source      SELECT id FROM Customer

mappingId   ordering-customers
target      :customer/{customerId} a :Customer .
source      SELECT customerId FROM Orders
]]
"#;
    let dir = tempdir().unwrap();
    let (translator, reports) =
        build_translator(dir.path(), ddl, ttl, obda, EngineConfig::default());
    let ri = reports
        .iter()
        .find(|r| r.processor == ProcessorKind::ReferentialIntegrity)
        .unwrap();
    assert_eq!(ri.removed, 1);

    let ids: Vec<&str> = translator
        .context()
        .mappings()
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(ids, vec!["customers"]);

    let result = translator
        .translate("SELECT ?c WHERE { ?c a <http://ex.org/Customer> }")
        .unwrap();
    assert!(!result.sql.contains("UNION"));
    assert!(result.sql.contains("FROM Customer AS v0"));
}

// ============================================================================
// Failures and concurrency
// ============================================================================

#[test]
fn test_parse_failures_are_attributed_to_the_parse_stage() {
    let dir = tempdir().unwrap();
    let (translator, _) = build_translator(
        dir.path(),
        EMPLOYEE_DDL,
        EMPLOYEE_TTL,
        EMPLOYEE_OBDA,
        EngineConfig::default(),
    );
    let text = "SELECT ?x WHERE { ?x a <http://ex.org/Employee> ";
    let err = translator.translate(text).unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert_eq!(err.query, text);
}

#[test]
fn test_concurrent_translation_shares_one_context() {
    let dir = tempdir().unwrap();
    let (translator, _) = build_translator(
        dir.path(),
        EMPLOYEE_DDL,
        EMPLOYEE_TTL,
        EMPLOYEE_OBDA,
        EngineConfig::default(),
    );
    let queries = [
        "SELECT ?x WHERE { ?x a <http://ex.org/Employee> }",
        "SELECT ?x ?s WHERE { ?x <http://ex.org/salary> ?s }",
        "SELECT ?s WHERE { <http://ex.org/emp/7> <http://ex.org/salary> ?s }",
    ];
    let expected: Vec<String> = queries
        .iter()
        .map(|q| translator.translate(q).unwrap().sql)
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let translator = translator.clone();
                let query = queries[i % queries.len()];
                scope.spawn(move || (i, translator.translate(query).map(|r| r.sql)))
            })
            .collect();
        for handle in handles {
            let (i, sql) = handle.join().unwrap();
            assert_eq!(sql.unwrap(), expected[i % queries.len()]);
        }
    });
}
