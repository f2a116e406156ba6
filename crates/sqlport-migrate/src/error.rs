//! Migration error types.

use thiserror::Error;

/// Errors that can occur during schema migration.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Statement planning failed.
    #[error("planning error: {0}")]
    Plan(#[from] sqlport_core::DialectError),

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement failed to execute.
    #[error("statement failed: {message}: {sql}")]
    Execution {
        /// SQL text of the failed statement.
        sql: String,
        /// Driver-reported message.
        message: String,
    },

    /// The named table is not declared in the schema.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The named column is not declared on the table.
    #[error("unknown column {column} on table {table}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The named index is not declared on the table.
    #[error("unknown index {index} on table {table}")]
    UnknownIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },

    /// The named constraint is not declared on the table.
    #[error("unknown constraint {constraint} on table {table}")]
    UnknownConstraint {
        /// Table name.
        table: String,
        /// Constraint name.
        constraint: String,
    },

    /// A sequence name could not be extracted from a column default.
    #[error("no sequence found in default {default:?} of {table}.{column}")]
    SequenceDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// The default expression that was inspected.
        default: String,
    },

    /// A catalog query returned a row of unexpected shape.
    #[error("malformed catalog row from query: {0}")]
    CatalogRow(String),

    /// The operation is not supported on this dialect.
    #[error("unsupported on dialect {dialect}: {operation}")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// Operation description.
        operation: &'static str,
    },
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
