//! Schema migration on top of `sqlport-core`.
//!
//! This crate owns everything that touches a live database: the
//! [`SqlExecutor`] execution seam, catalog introspection, and the
//! [`Migrator`] that applies declared tables, columns, indexes,
//! constraints and sequences against one engine at a time.
//!
//! # Example
//!
//! ```no_run
//! use sqlport_core::prelude::*;
//! use sqlport_migrate::{AnyExecutor, Migrator};
//!
//! # async fn demo(pool: sqlx::AnyPool) -> sqlport_migrate::Result<()> {
//! let migrator = Migrator::new(AnyExecutor::new(pool), DialectKind::Postgres);
//!
//! let users = TableDescriptor::new("users")
//!     .column(
//!         ColumnDescriptor::new("id", FieldKind::Uint)
//!             .size(64)
//!             .primary_key()
//!             .auto_increment(),
//!     )
//!     .column(ColumnDescriptor::new("email", FieldKind::String).unique());
//!
//! if !migrator.has_table("users").await? {
//!     migrator.create_table(&users).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod executor;
pub mod migrator;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{LiveColumn, TableInfo};
pub use error::{MigrateError, Result};
pub use executor::{AnyExecutor, SqlExecutor, StatementRunner};
pub use migrator::Migrator;
