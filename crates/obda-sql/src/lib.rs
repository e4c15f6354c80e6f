//! Relational plumbing for the OBDA engine.
//!
//! - `ddl`: schema discovery from `CREATE TABLE` / `ALTER TABLE` scripts
//! - `select`: mapping-source and query SELECT statements → query trees
//! - `render`: query trees → SQL text for ANSI, PostgreSQL or MySQL
//!
//! All parsing goes through `sqlparser`; nothing here hand-rolls a SQL
//! grammar.

pub mod ddl;
pub mod render;
pub mod select;

pub use ddl::{load_sql_ddl, parse_sql_ddl};
pub use render::{DialectRenderer, RenderError, SqlDialect, SqlRenderer};
pub use select::{SqlFrontend, SqlFrontendError};
