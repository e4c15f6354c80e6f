//! Mapping documents for the OBDA engine.
//!
//! Two surface forms are accepted:
//! - `.obda`: prefix and mapping declarations with Turtle-like targets and
//!   SQL sources (modules `obda` and `target`)
//! - `.json`: the serde form of a mapping list, as written by `obda optimize`
//!
//! Sources are lowered through `obda_sql::SqlFrontend`, so a frontend with
//! database metadata expands `SELECT *` and reports unknown tables.

pub mod obda;
pub mod target;

pub use obda::{parse_obda, ObdaDocument};
pub use target::{iri_or_template, parse_target};

use obda_model::{Mapping, MappingSet};
use obda_sql::{SqlFrontend, SqlFrontendError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingParseError {
    #[error("parse error on line {line}: {message}")]
    Line { line: usize, message: String },
    #[error("mapping `{id}` (line {line}): invalid source query: {source}")]
    Source {
        id: String,
        line: usize,
        #[source]
        source: SqlFrontendError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON mapping document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported mapping format: .{0}")]
    UnsupportedFormat(String),
}

/// Parse the JSON form of a mapping list.
pub fn parse_json_mappings(text: &str) -> Result<MappingSet, MappingParseError> {
    let mappings: Vec<Mapping> = serde_json::from_str(text)?;
    Ok(MappingSet::from(mappings))
}

/// Load a mapping file; the format follows the extension.
pub fn load_mappings(path: &Path, frontend: &SqlFrontend<'_>) -> Result<MappingSet, MappingParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let text = match extension.as_str() {
        "obda" | "json" => std::fs::read_to_string(path)?,
        other => return Err(MappingParseError::UnsupportedFormat(other.to_string())),
    };
    let mappings = if extension == "json" {
        parse_json_mappings(&text)?
    } else {
        parse_obda(&text, frontend)?.mappings
    };
    tracing::debug!(path = %path.display(), mappings = mappings.len(), "mappings loaded");
    Ok(mappings)
}
