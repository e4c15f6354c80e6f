//! RDF statements read with Sophia.
//!
//! Sophia terms are read through their display form (`<iri>`, `_:b0`,
//! `"lex"@en`, `"lex"^^<dt>`) so the rest of the crate only sees plain
//! strings.

use crate::OwlError;
use sophia::api::prelude::*;
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfNode {
    Iri(String),
    BlankNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RdfLiteral {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfObject {
    Node(RdfNode),
    Literal(RdfLiteral),
}

impl RdfObject {
    pub fn as_node(&self) -> Option<&RdfNode> {
        match self {
            RdfObject::Node(node) => Some(node),
            RdfObject::Literal(_) => None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            RdfObject::Node(RdfNode::Iri(iri)) => Some(iri),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdfStatement {
    pub subject: RdfNode,
    pub predicate: String,
    pub object: RdfObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    RdfXml,
}

impl RdfFormat {
    pub fn from_path(path: &Path) -> Result<Self, OwlError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "nt" | "ntriples" => Ok(RdfFormat::NTriples),
            "ttl" | "turtle" => Ok(RdfFormat::Turtle),
            "rdf" | "owl" | "xml" => Ok(RdfFormat::RdfXml),
            other => Err(OwlError::UnsupportedFormat(other.to_string())),
        }
    }

    fn label(self) -> &'static str {
        match self {
            RdfFormat::NTriples => "N-Triples",
            RdfFormat::Turtle => "Turtle",
            RdfFormat::RdfXml => "RDF/XML",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct StatementSinkError {
    message: String,
}

impl From<OwlError> for StatementSinkError {
    fn from(value: OwlError) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub(crate) fn parse_term(term: &str) -> Result<RdfObject, OwlError> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(RdfObject::Node(RdfNode::Iri(rest.to_string())));
    }
    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(RdfObject::Node(RdfNode::BlankNode(rest.to_string())));
    }
    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !escaped {
                end_quote = Some(i);
                break;
            }
            escaped = ch == '\\' && !escaped;
        }
        let Some(end) = end_quote else {
            return Err(OwlError::Term(format!("missing closing quote: {s}")));
        };
        let lexical = unescape(&s[1..end]);
        let rest = s[end + 1..].trim();
        let mut literal = RdfLiteral {
            lexical,
            datatype: None,
            language: None,
        };
        if let Some(lang) = rest.strip_prefix('@') {
            literal.language = Some(lang.to_string());
        } else if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            if !dt.is_empty() {
                literal.datatype = Some(dt.to_string());
            }
        }
        return Ok(RdfObject::Literal(literal));
    }

    Err(OwlError::Term(format!("unsupported RDF term form: {s}")))
}

fn parse_node(term: &str) -> Result<RdfNode, OwlError> {
    match parse_term(term)? {
        RdfObject::Node(node) => Ok(node),
        RdfObject::Literal(_) => Err(OwlError::Term(format!(
            "expected IRI or blank node, got literal: {term}"
        ))),
    }
}

// Sophia parsers have distinct concrete triple types; the term display
// forms are only available on those, so the sink is stamped out per format.
macro_rules! collect_statements {
    ($parser:expr, $format:expr) => {{
        let mut out = Vec::new();
        let mut parser = $parser;
        parser
            .try_for_each_triple(|t| -> Result<(), StatementSinkError> {
                let subject = parse_node(&t.s().to_string())?;
                let RdfNode::Iri(predicate) = parse_node(&t.p().to_string())? else {
                    return Ok(());
                };
                let object = parse_term(&t.o().to_string())?;
                out.push(RdfStatement {
                    subject,
                    predicate,
                    object,
                });
                Ok(())
            })
            .map_err(|e| OwlError::Parse {
                format: $format.label(),
                message: e.to_string(),
            })?;
        Ok(out)
    }};
}

pub fn parse_statements(
    reader: impl BufRead,
    format: RdfFormat,
) -> Result<Vec<RdfStatement>, OwlError> {
    match format {
        RdfFormat::NTriples => {
            collect_statements!(sophia::turtle::parser::nt::parse_bufread(reader), format)
        }
        RdfFormat::Turtle => {
            collect_statements!(sophia::turtle::parser::turtle::parse_bufread(reader), format)
        }
        RdfFormat::RdfXml => {
            collect_statements!(sophia::xml::parser::parse_bufread(reader), format)
        }
    }
}
