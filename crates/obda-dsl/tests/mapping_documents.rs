use obda_dsl::{load_mappings, parse_obda, MappingParseError};
use obda_model::{MappingKind, Term};
use obda_sql::{parse_sql_ddl, SqlFrontend};
use std::io::Write;

const SCHEMA: &str = "
CREATE TABLE Employee (id INT PRIMARY KEY, name VARCHAR(80), salary DECIMAL(10,2), dept INT);
CREATE TABLE Dept (id INT PRIMARY KEY, title VARCHAR(80));
";

const MAPPINGS: &str = r#"
[PrefixDeclaration]
:       http://ex.org/
xsd:    http://www.w3.org/2001/XMLSchema#

[MappingDeclaration] @collection [[
mappingId   emp
target      :emp/{id} a :Employee ;
                :salary {salary}^^xsd:decimal ;
                :worksFor :dept/{dept} .
source      SELECT * FROM Employee

# departments
mappingId   dept
target      :dept/{id} a :Department ; :title {title} .
source      SELECT d.id, d.title FROM Dept d
]]
"#;

#[test]
fn document_with_schema_aware_sources() {
    let md = parse_sql_ddl(SCHEMA).unwrap();
    let doc = parse_obda(MAPPINGS, &SqlFrontend::with_metadata(&md)).unwrap();

    assert_eq!(doc.mappings.len(), 5);
    let kinds: Vec<MappingKind> = doc.mappings.iter().map(|m| m.kind()).collect();
    assert_eq!(
        kinds.iter().filter(|k| **k == MappingKind::Class).count(),
        2
    );
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == MappingKind::ObjectProperty)
            .count(),
        1
    );

    let salary = doc.mappings.get("http://ex.org/salary").next().unwrap();
    let Term::Variable(v) = salary.object() else {
        panic!("salary should be a column");
    };
    assert_eq!(
        v.datatype.as_deref(),
        Some("http://www.w3.org/2001/XMLSchema#decimal")
    );
    // `SELECT *` was expanded against the schema.
    assert_eq!(salary.source.select.len(), 4);
}

#[test]
fn unknown_tables_surface_as_source_errors() {
    let md = parse_sql_ddl(SCHEMA).unwrap();
    let text = "[MappingDeclaration] @collection [[\nmappingId x\ntarget <http://ex.org/{id}> a <http://ex.org/C> .\nsource SELECT id FROM Nope\n]]\n";
    let err = parse_obda(text, &SqlFrontend::with_metadata(&md)).unwrap_err();
    assert!(matches!(err, MappingParseError::Source { line: 2, .. }));
}

#[test]
fn json_and_obda_files_load_to_the_same_set() {
    let md = parse_sql_ddl(SCHEMA).unwrap();
    let frontend = SqlFrontend::with_metadata(&md);
    let doc = parse_obda(MAPPINGS, &frontend).unwrap();

    let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(json, "{}", serde_json::to_string(&doc.mappings).unwrap()).unwrap();
    let reloaded = load_mappings(json.path(), &frontend).unwrap();
    assert_eq!(reloaded, doc.mappings);

    let mut obda = tempfile::Builder::new().suffix(".obda").tempfile().unwrap();
    write!(obda, "{MAPPINGS}").unwrap();
    assert_eq!(load_mappings(obda.path(), &frontend).unwrap(), doc.mappings);

    let txt = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    assert!(matches!(
        load_mappings(txt.path(), &frontend),
        Err(MappingParseError::UnsupportedFormat(_))
    ));
}
