//! `.obda` mapping documents.
//!
//! ```text
//! [PrefixDeclaration]
//! :       http://ex.org/
//! xsd:    http://www.w3.org/2001/XMLSchema#
//!
//! [MappingDeclaration] @collection [[
//! mappingId   employees
//! target      :emp/{id} a :Employee ; :name {name} .
//! source      SELECT id, name
//!             FROM Employee
//! ]]
//! ```
//!
//! Entries are separated by blank lines; a line that does not start with a
//! keyword continues the previous entry's field. A target with several
//! triples yields one mapping per triple, with ids `<id>:0`, `<id>:1`, ...

use crate::target::parse_target;
use crate::MappingParseError;
use obda_model::vocab::{OWL_NS, RDFS_NS, RDF_NS, XSD_NS};
use obda_model::{Mapping, MappingSet, SqlQuery, Substitution, Term, TripleAtom, Variable};
use obda_sql::SqlFrontend;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct ObdaDocument {
    pub prefixes: BTreeMap<String, String>,
    pub mappings: MappingSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Prefixes,
    Mappings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Target,
    Source,
}

#[derive(Debug, Default)]
struct Entry {
    line: usize,
    id: Option<String>,
    target: Option<String>,
    source: Option<String>,
    last: Option<Field>,
}

impl Entry {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.target.is_none() && self.source.is_none()
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Id => &mut self.id,
            Field::Target => &mut self.target,
            Field::Source => &mut self.source,
        }
    }
}

fn default_prefixes() -> BTreeMap<String, String> {
    [("rdf", RDF_NS), ("rdfs", RDFS_NS), ("owl", OWL_NS), ("xsd", XSD_NS)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn line_error(line: usize, message: impl Into<String>) -> MappingParseError {
    MappingParseError::Line {
        line,
        message: message.into(),
    }
}

pub fn parse_obda(text: &str, frontend: &SqlFrontend<'_>) -> Result<ObdaDocument, MappingParseError> {
    let mut doc = ObdaDocument {
        prefixes: default_prefixes(),
        mappings: MappingSet::new(),
    };
    let mut section = Section::None;
    let mut entry = Entry::default();
    let mut seen_ids = BTreeSet::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if line.starts_with('#') {
            continue;
        }

        // ------------------------------------------------------------------
        // Section headers
        // ------------------------------------------------------------------
        if line.starts_with("[PrefixDeclaration]") {
            section = Section::Prefixes;
            continue;
        }
        if line.starts_with("[MappingDeclaration]") {
            section = Section::Mappings;
            continue;
        }
        if line == "]]" {
            finish_entry(&mut entry, &mut doc, &mut seen_ids, frontend)?;
            section = Section::None;
            continue;
        }

        match section {
            Section::None => {
                if !line.is_empty() {
                    return Err(line_error(line_no, format!("unexpected `{line}` outside a section")));
                }
            }
            Section::Prefixes => {
                if line.is_empty() {
                    continue;
                }
                let (prefix, namespace) = line
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| line_error(line_no, "prefix declaration expects `prefix: <namespace>`"))?;
                let prefix = prefix
                    .strip_suffix(':')
                    .ok_or_else(|| line_error(line_no, format!("prefix `{prefix}` must end with `:`")))?;
                let namespace = namespace.trim().trim_start_matches('<').trim_end_matches('>');
                doc.prefixes.insert(prefix.to_string(), namespace.to_string());
            }
            Section::Mappings => {
                if line.is_empty() {
                    finish_entry(&mut entry, &mut doc, &mut seen_ids, frontend)?;
                    continue;
                }
                let (keyword, rest) = line
                    .split_once(char::is_whitespace)
                    .map(|(k, r)| (k, r.trim()))
                    .unwrap_or((line, ""));
                let field = match keyword {
                    "mappingId" => Some(Field::Id),
                    "target" => Some(Field::Target),
                    "source" => Some(Field::Source),
                    _ => None,
                };
                match field {
                    Some(Field::Id) if entry.id.is_some() => {
                        // A new entry without a separating blank line.
                        finish_entry(&mut entry, &mut doc, &mut seen_ids, frontend)?;
                        start_field(&mut entry, Field::Id, rest, line_no)?;
                    }
                    Some(field) => start_field(&mut entry, field, rest, line_no)?,
                    None => {
                        let Some(last) = entry.last else {
                            return Err(line_error(
                                line_no,
                                format!("expected `mappingId`, `target` or `source`, found `{keyword}`"),
                            ));
                        };
                        if last == Field::Id {
                            return Err(line_error(line_no, "mappingId must fit on one line"));
                        }
                        if let Some(value) = entry.slot(last) {
                            value.push('\n');
                            value.push_str(line);
                        }
                    }
                }
            }
        }
    }

    if section == Section::Mappings {
        return Err(line_error(text.lines().count(), "unterminated mapping collection (missing `]]`)"));
    }
    finish_entry(&mut entry, &mut doc, &mut seen_ids, frontend)?;

    tracing::debug!(
        mappings = doc.mappings.len(),
        prefixes = doc.prefixes.len(),
        "mapping document parsed"
    );
    Ok(doc)
}

fn start_field(entry: &mut Entry, field: Field, value: &str, line: usize) -> Result<(), MappingParseError> {
    if entry.is_empty() {
        entry.line = line;
    }
    let slot = entry.slot(field);
    if slot.is_some() {
        return Err(line_error(line, format!("duplicate `{field:?}` in one mapping entry")));
    }
    *slot = Some(value.to_string());
    entry.last = Some(field);
    Ok(())
}

fn finish_entry(
    entry: &mut Entry,
    doc: &mut ObdaDocument,
    seen_ids: &mut BTreeSet<String>,
    frontend: &SqlFrontend<'_>,
) -> Result<(), MappingParseError> {
    let entry = std::mem::take(entry);
    if entry.is_empty() {
        return Ok(());
    }
    let line = entry.line;
    let id = entry
        .id
        .ok_or_else(|| line_error(line, "mapping entry is missing `mappingId`"))?;
    if !seen_ids.insert(id.clone()) {
        return Err(line_error(line, format!("duplicate mappingId `{id}`")));
    }
    let target = entry
        .target
        .ok_or_else(|| line_error(line, format!("mapping `{id}` is missing its target")))?;
    let source_text = entry
        .source
        .ok_or_else(|| line_error(line, format!("mapping `{id}` is missing its source")))?;

    let source = frontend
        .parse_query(&source_text)
        .map_err(|source| MappingParseError::Source {
            id: id.clone(),
            line,
            source,
        })?;
    let heads = parse_target(&target, &doc.prefixes)
        .map_err(|message| line_error(line, format!("mapping `{id}`: {message}")))?;

    let single = heads.len() == 1;
    for (n, head) in heads.into_iter().enumerate() {
        let head = align_with_source(&head, &source)
            .map_err(|message| line_error(line, format!("mapping `{id}`: {message}")))?;
        let mapping_id = if single { id.clone() } else { format!("{id}:{n}") };
        let mapping = Mapping::from_head(mapping_id, head, source.clone())
            .map_err(|e| line_error(line, e.to_string()))?;
        doc.mappings.add(mapping);
    }
    Ok(())
}

/// Every head column must be projected by the source; names are matched
/// case-insensitively and rewritten to the projected spelling.
fn align_with_source(head: &TripleAtom, source: &SqlQuery) -> Result<TripleAtom, String> {
    let mut renaming = Substitution::new();
    for variable in head.variables() {
        let projected = source
            .select
            .iter()
            .filter_map(|item| item.output_name())
            .find(|name| name.eq_ignore_ascii_case(&variable.name))
            .ok_or_else(|| format!("column `{}` is not projected by the source", variable.name))?;
        if projected != variable.name {
            let renamed = Variable {
                name: projected.to_string(),
                datatype: variable.datatype.clone(),
            };
            renaming.bind(variable, Term::Variable(renamed));
        }
    }
    Ok(head.apply(&renaming))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
[PrefixDeclaration]
:		http://ex.org/

[MappingDeclaration] @collection [[
mappingId	employees
target		:emp/{ID} a :Employee ; :name {name} .
source		SELECT id, name
			FROM Employee

mappingId	managers
target		:emp/{id} a :Manager .
source		SELECT id FROM Employee WHERE role = 'manager'
]]
"#;

    #[test]
    fn parses_prefixes_and_multi_triple_targets() {
        let doc = parse_obda(DOC, &SqlFrontend::new()).unwrap();
        assert_eq!(doc.prefixes.get("").map(String::as_str), Some("http://ex.org/"));
        assert_eq!(doc.mappings.len(), 3);

        let ids: BTreeSet<&str> = doc.mappings.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains("employees:0"));
        assert!(ids.contains("employees:1"));
        assert!(ids.contains("managers"));

        // `{ID}` is rewritten to the projected `id`.
        let employee = doc.mappings.get("http://ex.org/Employee").next().unwrap();
        assert_eq!(
            employee.subject(),
            &Term::uri_template("http://ex.org/emp/{}", vec![Term::var("id")])
        );
    }

    #[test]
    fn errors_carry_line_numbers() {
        let missing_source = "[MappingDeclaration] @collection [[\nmappingId m\ntarget :x a :C .\n]]\n";
        let err = parse_obda(missing_source, &SqlFrontend::new()).unwrap_err();
        assert!(matches!(err, MappingParseError::Line { line: 2, .. }));

        let unprojected = "[PrefixDeclaration]\n: http://ex.org/\n[MappingDeclaration] @collection [[\nmappingId m\ntarget :x/{y} a :C .\nsource SELECT id FROM T\n]]\n";
        let err = parse_obda(unprojected, &SqlFrontend::new()).unwrap_err();
        assert!(err.to_string().contains("not projected"));

        let bad_sql = "[MappingDeclaration] @collection [[\nmappingId m\ntarget <http://x> a <http://C> .\nsource SELECT id FROM\n]]\n";
        assert!(matches!(
            parse_obda(bad_sql, &SqlFrontend::new()),
            Err(MappingParseError::Source { .. })
        ));
    }

    #[test]
    fn unterminated_collection_is_rejected() {
        let err = parse_obda("[MappingDeclaration] @collection [[\n", &SqlFrontend::new()).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }
}
