//! Database metadata: tables, keys and foreign keys.

use crate::atom::Atom;
use crate::term::Term;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use crate::sql::RelationId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyColumn {
    pub fk_column: String,
    pub pk_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub from_table: RelationId,
    pub to_table: RelationId,
    pub columns: Vec<ForeignKeyColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub id: RelationId,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDefinition {
    pub fn new(id: RelationId, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            id,
            columns,
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Canonical variable name for a column: `[schema.]table.column`.
    pub fn column_variable(&self, column: &str) -> String {
        format!("{}.{}", self.id, column)
    }

    /// Full-column table atom over the canonical column variables.
    pub fn atom(&self) -> Atom {
        Atom::table(
            self.id.to_string(),
            self.columns
                .iter()
                .map(|c| Term::var(self.column_variable(&c.name)))
                .collect(),
        )
    }
}

/// Read access to table definitions.
pub trait DatabaseMetadata: Send + Sync {
    fn table(&self, id: &RelationId) -> Option<&TableDefinition>;

    fn tables(&self) -> Box<dyn Iterator<Item = &TableDefinition> + '_>;

    fn foreign_keys(&self) -> Vec<&ForeignKey> {
        self.tables().flat_map(|t| t.foreign_keys.iter()).collect()
    }

    /// Case-insensitive lookup by table name, ignoring the schema.
    fn table_by_name(&self, name: &str) -> Option<&TableDefinition> {
        self.tables()
            .find(|t| t.id.table.eq_ignore_ascii_case(name))
    }
}

/// In-memory metadata, filled by DDL discovery or deserialized from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TableDefinition>", into = "Vec<TableDefinition>")]
pub struct DbMetadata {
    tables: BTreeMap<RelationId, TableDefinition>,
}

impl DbMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: TableDefinition) -> Option<TableDefinition> {
        self.tables.insert(table.id.clone(), table)
    }

    pub fn table_mut(&mut self, id: &RelationId) -> Option<&mut TableDefinition> {
        self.tables.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl DatabaseMetadata for DbMetadata {
    fn table(&self, id: &RelationId) -> Option<&TableDefinition> {
        self.tables.get(id).or_else(|| {
            // Unqualified references resolve against any schema.
            if id.schema.is_none() {
                self.table_by_name(&id.table)
            } else {
                None
            }
        })
    }

    fn tables(&self) -> Box<dyn Iterator<Item = &TableDefinition> + '_> {
        Box::new(self.tables.values())
    }
}

impl From<Vec<TableDefinition>> for DbMetadata {
    fn from(tables: Vec<TableDefinition>) -> Self {
        let mut metadata = DbMetadata::new();
        for table in tables {
            metadata.insert(table);
        }
        metadata
    }
}

impl From<DbMetadata> for Vec<TableDefinition> {
    fn from(metadata: DbMetadata) -> Self {
        metadata.tables.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Variable;

    #[test]
    fn table_atom_uses_canonical_column_variables() {
        let t = TableDefinition::new(
            RelationId::new("Order"),
            vec![
                ColumnDefinition::new("id", "INT"),
                ColumnDefinition::new("customerId", "INT"),
            ],
        );
        let atom = t.atom();
        assert_eq!(atom.arity(), 2);
        assert!(atom.variables().contains(&Variable::new("Order.customerId")));
    }

    #[test]
    fn column_variables_keep_the_schema() {
        let s1 = TableDefinition::new(
            RelationId::qualified("s1", "T"),
            vec![ColumnDefinition::new("id", "INT")],
        );
        let s2 = TableDefinition::new(
            RelationId::qualified("s2", "T"),
            vec![ColumnDefinition::new("id", "INT")],
        );
        assert_eq!(s1.column_variable("id"), "s1.T.id");
        assert_ne!(s1.column_variable("id"), s2.column_variable("id"));
    }

    #[test]
    fn lookup_ignores_case_and_missing_schema() {
        let mut md = DbMetadata::new();
        md.insert(TableDefinition::new(
            RelationId::qualified("public", "Employee"),
            vec![ColumnDefinition::new("id", "INT")],
        ));
        assert!(md.table(&RelationId::new("employee")).is_some());
        assert!(md.table(&RelationId::qualified("hr", "Employee")).is_none());
    }
}
