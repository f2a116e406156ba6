//! Dialect-aware SQL statement model, type mapping and upsert planning.
//!
//! `sqlport-core` turns a database-agnostic description of tables and
//! statements into dialect-correct SQL text plus an ordered parameter
//! list. It never talks to a database; execution belongs to the caller
//! (see `sqlport-migrate` for the catalog/migration side).
//!
//! # Architecture
//!
//! - **Schema descriptors** - [`TableDescriptor`], [`ColumnDescriptor`],
//!   [`IndexDescriptor`], [`ConstraintDescriptor`]: the declared shape of
//!   a table, derived once and immutable afterwards.
//! - **Statement model** - named clauses with a fixed build order and an
//!   internal parameter accumulator; no raw value splicing.
//! - **Dialects** - [`dialect::MySqlDialect`], [`dialect::PostgresDialect`]
//!   and [`dialect::DmDialect`] behind the [`dialect::Dialect`] trait,
//!   selected through [`dialect::DialectKind`] at construction time.
//! - **Upsert planner** - [`upsert::plan_insert`] decides between a native
//!   conflict clause and a synthesized `MERGE INTO` statement.

pub mod dialect;
pub mod error;
pub mod schema;
pub mod statement;
pub mod upsert;
pub mod value;

pub use error::{DialectError, Result};
pub use schema::{
    ColumnDescriptor, ConstraintDescriptor, ConstraintKind, FieldKind, IndexColumn,
    IndexDescriptor, TableDescriptor,
};
pub use statement::{Assignment, AssignValue, BuiltStatement, Clause, ConflictAction, Statement};
pub use upsert::{plan_insert, OnConflict, UpsertSpec};
pub use value::{SqlValue, ToSqlValue};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{Dialect, DialectKind};
    pub use crate::error::{DialectError, Result};
    pub use crate::schema::{
        ColumnDescriptor, ConstraintDescriptor, ConstraintKind, FieldKind, IndexColumn,
        IndexDescriptor, TableDescriptor,
    };
    pub use crate::statement::{
        Assignment, AssignValue, BuiltStatement, Clause, ConflictAction, Statement,
    };
    pub use crate::upsert::{plan_insert, resolve_conflict_target, OnConflict, UpsertSpec};
    pub use crate::value::{SqlValue, ToSqlValue};
}
