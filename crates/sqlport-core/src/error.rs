//! Error types for statement building and upsert planning.

/// Errors raised while building dialect SQL.
///
/// These are configuration errors: they always name the identifier that
/// caused them and are never worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    /// No conflict target was given and the table declares no primary key.
    #[error("table '{table}' has no primary key and no conflict target was given")]
    MissingConflictTarget {
        /// Table the upsert was planned against.
        table: String,
    },

    /// A conflict target column is neither part of the primary key nor
    /// covered by a declared unique constraint.
    #[error("conflict target column '{column}' does not resolve to a key of table '{table}'")]
    ConflictTargetNotKey {
        /// Owning table.
        table: String,
        /// Offending column.
        column: String,
    },

    /// A conflict target column is missing from the insert column list.
    #[error("conflict column '{column}' is not present in the insert column list")]
    ConflictColumnNotInserted {
        /// Offending column.
        column: String,
    },

    /// A referenced column does not exist on the table descriptor.
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn {
        /// Owning table.
        table: String,
        /// Requested column.
        column: String,
    },

    /// A value row does not match the insert column list.
    #[error("row {row} carries {got} values but {want} columns were named")]
    RowArity {
        /// Zero-based row index.
        row: usize,
        /// Number of values supplied.
        got: usize,
        /// Number of columns named.
        want: usize,
    },
}

/// Result type for statement building.
pub type Result<T> = std::result::Result<T, DialectError>;
