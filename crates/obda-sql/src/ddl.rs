//! SQL schema discovery
//!
//! Reads `CREATE TABLE` / `ALTER TABLE ... ADD CONSTRAINT` statements into
//! [`DbMetadata`]:
//! - columns with their declared type and nullability
//! - primary keys, inline or as table constraints
//! - foreign keys, inline (`REFERENCES`) or as table constraints; a foreign
//!   key without referred columns points at the target's primary key

use anyhow::{anyhow, bail, Context, Result};
use obda_model::{
    ColumnDefinition, DatabaseMetadata, DbMetadata, ForeignKey, ForeignKeyColumn, RelationId,
    TableDefinition,
};
use sqlparser::ast::{
    AlterTableOperation, ColumnOption, Ident, ObjectName, Statement, TableConstraint,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::path::Path;

/// A foreign key as written, resolved once every table is known.
#[derive(Debug)]
struct PendingForeignKey {
    name: Option<String>,
    from_table: RelationId,
    columns: Vec<String>,
    to_table: RelationId,
    referred: Vec<String>,
}

fn relation_id(name: &ObjectName) -> RelationId {
    let parts: Vec<&str> = name.0.iter().map(|i| i.value.as_str()).collect();
    match parts.as_slice() {
        [.., schema, table] => RelationId::qualified(*schema, *table),
        [table] => RelationId::new(*table),
        [] => RelationId::new(""),
    }
}

fn idents(ids: &[Ident]) -> Vec<String> {
    ids.iter().map(|i| i.value.clone()).collect()
}

/// Parse SQL DDL into table metadata.
pub fn parse_sql_ddl(sql: &str) -> Result<DbMetadata> {
    let dialect = GenericDialect {};
    let statements =
        Parser::parse_sql(&dialect, sql).map_err(|e| anyhow!("failed to parse DDL: {e}"))?;

    let mut metadata = DbMetadata::new();
    let mut pending: Vec<PendingForeignKey> = Vec::new();

    for stmt in statements {
        match stmt {
            Statement::CreateTable {
                name,
                columns: sql_columns,
                constraints,
                ..
            } => {
                let id = relation_id(&name);
                let mut table = TableDefinition::new(id.clone(), Vec::new());

                for col in &sql_columns {
                    let mut column =
                        ColumnDefinition::new(col.name.value.clone(), col.data_type.to_string());
                    for opt in &col.options {
                        match &opt.option {
                            ColumnOption::NotNull => column.nullable = false,
                            ColumnOption::Unique {
                                is_primary: true, ..
                            } => table.primary_key.push(col.name.value.clone()),
                            ColumnOption::ForeignKey {
                                foreign_table,
                                referred_columns,
                                ..
                            } => pending.push(PendingForeignKey {
                                name: opt.name.as_ref().map(|n| n.value.clone()),
                                from_table: id.clone(),
                                columns: vec![col.name.value.clone()],
                                to_table: relation_id(foreign_table),
                                referred: idents(referred_columns),
                            }),
                            _ => {}
                        }
                    }
                    table.columns.push(column);
                }

                for constraint in &constraints {
                    apply_constraint(&mut table, constraint, &mut pending);
                }
                mark_key_columns_not_null(&mut table);
                metadata.insert(table);
            }
            Statement::AlterTable {
                name, operations, ..
            } => {
                let id = relation_id(&name);
                let Some(resolved) = metadata.table(&id).map(|t| t.id.clone()) else {
                    bail!("ALTER TABLE on unknown table `{id}`");
                };
                let Some(table) = metadata.table_mut(&resolved) else {
                    bail!("ALTER TABLE on unknown table `{id}`");
                };
                for op in &operations {
                    if let AlterTableOperation::AddConstraint(constraint) = op {
                        apply_constraint(table, constraint, &mut pending);
                    }
                }
                mark_key_columns_not_null(table);
            }
            _ => {}
        }
    }

    for fk in pending {
        resolve_foreign_key(&mut metadata, fk)?;
    }

    tracing::debug!(
        tables = metadata.len(),
        foreign_keys = metadata.foreign_keys().len(),
        "schema discovered"
    );
    Ok(metadata)
}

/// Read and parse a DDL file.
pub fn load_sql_ddl(path: &Path) -> Result<DbMetadata> {
    let sql = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    parse_sql_ddl(&sql).with_context(|| format!("in schema {}", path.display()))
}

fn apply_constraint(
    table: &mut TableDefinition,
    constraint: &TableConstraint,
    pending: &mut Vec<PendingForeignKey>,
) {
    match constraint {
        TableConstraint::Unique {
            columns,
            is_primary: true,
            ..
        } => table.primary_key = idents(columns),
        TableConstraint::ForeignKey {
            name,
            columns,
            foreign_table,
            referred_columns,
            ..
        } => pending.push(PendingForeignKey {
            name: name.as_ref().map(|n| n.value.clone()),
            from_table: table.id.clone(),
            columns: idents(columns),
            to_table: relation_id(foreign_table),
            referred: idents(referred_columns),
        }),
        _ => {}
    }
}

fn mark_key_columns_not_null(table: &mut TableDefinition) {
    let key = table.primary_key.clone();
    for column in &mut table.columns {
        if key.iter().any(|k| k.eq_ignore_ascii_case(&column.name)) {
            column.nullable = false;
        }
    }
}

fn resolve_foreign_key(metadata: &mut DbMetadata, fk: PendingForeignKey) -> Result<()> {
    let target = metadata.table(&fk.to_table).ok_or_else(|| {
        anyhow!(
            "foreign key on `{}` references unknown table `{}`",
            fk.from_table,
            fk.to_table
        )
    })?;
    let referred = if fk.referred.is_empty() {
        target.primary_key.clone()
    } else {
        fk.referred
    };
    if referred.len() != fk.columns.len() {
        bail!(
            "foreign key on `{}` has {} column(s) but references {} in `{}`",
            fk.from_table,
            fk.columns.len(),
            referred.len(),
            target.id
        );
    }
    for column in &referred {
        if target.column(column).is_none() {
            bail!("foreign key references unknown column `{}.{column}`", target.id);
        }
    }

    let foreign_key = ForeignKey {
        name: fk.name,
        from_table: fk.from_table.clone(),
        to_table: target.id.clone(),
        columns: fk
            .columns
            .into_iter()
            .zip(referred)
            .map(|(fk_column, pk_column)| ForeignKeyColumn {
                fk_column,
                pk_column,
            })
            .collect(),
    };
    let source = metadata
        .table_mut(&fk.from_table)
        .ok_or_else(|| anyhow!("unknown table `{}`", fk.from_table))?;
    source.foreign_keys.push(foreign_key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"
        CREATE TABLE Customer (
            id INT PRIMARY KEY,
            name VARCHAR(100) NOT NULL
        );
        CREATE TABLE "Order" (
            id INT,
            customerId INT REFERENCES Customer,
            total DECIMAL(10, 2),
            PRIMARY KEY (id)
        );
    "#;

    #[test]
    fn columns_keys_and_inline_references() -> Result<()> {
        let md = parse_sql_ddl(SHOP)?;
        let customer = md.table(&RelationId::new("Customer")).unwrap();
        assert_eq!(customer.primary_key, vec!["id".to_string()]);
        assert!(!customer.column("name").unwrap().nullable);
        assert!(!customer.column("id").unwrap().nullable);

        let order = md.table(&RelationId::new("Order")).unwrap();
        assert_eq!(order.primary_key, vec!["id".to_string()]);
        assert!(order.column("total").unwrap().nullable);
        assert_eq!(order.foreign_keys.len(), 1);
        let fk = &order.foreign_keys[0];
        assert_eq!(fk.to_table, RelationId::new("Customer"));
        assert_eq!(fk.columns[0].fk_column, "customerId");
        assert_eq!(fk.columns[0].pk_column, "id");
        Ok(())
    }

    #[test]
    fn alter_table_adds_foreign_keys() -> Result<()> {
        let md = parse_sql_ddl(
            "CREATE TABLE Dept (code INT PRIMARY KEY);
             CREATE TABLE Emp (id INT PRIMARY KEY, dept INT);
             ALTER TABLE Emp ADD CONSTRAINT fk_dept FOREIGN KEY (dept) REFERENCES Dept (code);",
        )?;
        let fks = md.foreign_keys();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].name.as_deref(), Some("fk_dept"));
        Ok(())
    }

    #[test]
    fn dangling_references_are_errors() {
        let err = parse_sql_ddl("CREATE TABLE A (id INT, b INT REFERENCES B (id));").unwrap_err();
        assert!(err.to_string().contains("unknown table"));
    }
}
