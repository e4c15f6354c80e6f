//! OBDA core model
//!
//! Value types shared by every stage of the engine:
//!
//! - `term`: variables, literals, IRIs and function terms (including URI templates)
//! - `atom`: triple atoms (mapping heads, query patterns) and table atoms
//! - `substitution` / `unify`: bindings, composition and most-general unifiers
//! - `sql`: the relational side of a mapping (select list, FROM tree, WHERE set)
//! - `mapping` / `mapping_set`: mappings indexed by signature, plus the
//!   read-only snapshot handed to query answering
//! - `rule` / `schema`: foreign-key rules and the database metadata provider
//!
//! Everything here is a closed set of plain data types: cloning is a deep,
//! structural copy and comparisons are structural.

pub mod atom;
pub mod mapping;
pub mod mapping_set;
pub mod rule;
pub mod schema;
pub mod sql;
pub mod substitution;
pub mod template;
pub mod term;
pub mod unify;
pub mod vocab;

pub use atom::{Atom, Predicate, TripleAtom};
pub use mapping::{Mapping, MappingError, MappingKind};
pub use mapping_set::{MappingSet, ReadOnlyMappingSet};
pub use rule::Rule;
pub use schema::{
    ColumnDefinition, DatabaseMetadata, DbMetadata, ForeignKey, ForeignKeyColumn, RelationId,
    TableDefinition,
};
pub use sql::{
    BinaryOp, ColumnRef, FromExpr, Join, JoinCondition, JoinKind, SelectItem, SqlExpr, SqlQuery,
    SqlUnion, SqlValue, SubQuery, TableRef, UnaryOp,
};
pub use substitution::Substitution;
pub use term::{Function, FunctionSymbol, IriRef, Literal, Operator, Term, Variable};
pub use unify::{unify, unify_terms, UnificationFailure};
