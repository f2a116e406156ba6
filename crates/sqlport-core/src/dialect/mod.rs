//! Dialect capability set and registry.
//!
//! A [`Dialect`] bundles everything that varies between target engines:
//! identifier quoting, placeholder style, the type mapper, the conflict
//! clause writer and the migrator-facing DDL syntax hooks. Shared
//! behavior lives in trait default methods; each dialect overrides only
//! the operations it needs.

mod dm;
mod mysql;
mod postgres;

pub use dm::DmDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use crate::schema::ColumnDescriptor;
use crate::statement::{ConflictAction, SqlWriter};

/// Parameter placeholder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?` markers.
    Question,
    /// `$1`, `$2`, ... markers.
    Dollar,
}

/// How an insert resolves conflicts on this dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// Native `ON DUPLICATE KEY UPDATE`.
    OnDuplicateKey,
    /// Native `ON CONFLICT ... DO UPDATE / DO NOTHING`.
    OnConflict,
    /// No native clause; a `MERGE INTO` statement is synthesized.
    Merge,
}

/// Escapes a string literal for direct inclusion in DDL text (comments
/// only; data values always travel as bound parameters).
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Capability set of one target engine.
pub trait Dialect: Send + Sync {
    /// Dialect name.
    fn name(&self) -> &'static str;

    /// Identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes an identifier. Schema-qualified names are quoted per part.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let mut out = String::with_capacity(name.len() + 4);
        for (i, part) in name.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push(q);
            out.push_str(part);
            out.push(q);
        }
        out
    }

    /// Placeholder style.
    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    /// Maps a column descriptor to this dialect's native type clause.
    ///
    /// Never fails: unrecognized input degrades to pass-through.
    fn map_type(&self, column: &ColumnDescriptor) -> String;

    /// Upsert family of this dialect.
    fn upsert_style(&self) -> UpsertStyle;

    /// Writes a reference to the proposed (excluded/new) row's `column`.
    /// The substitution table lives here, never at call sites.
    fn write_proposed_ref(&self, w: &mut SqlWriter<'_>, column: &str);

    /// Writes the native conflict clause. Only called on dialects whose
    /// [`Dialect::upsert_style`] is native; merge dialects leave the
    /// default no-op in place.
    fn write_conflict_clause(
        &self,
        _w: &mut SqlWriter<'_>,
        _target: &[String],
        _action: &ConflictAction,
    ) {
    }

    /// Zero-row dummy table that satisfies `SELECT ... FROM` syntax, for
    /// merge dialects.
    fn dummy_table(&self) -> Option<&'static str> {
        None
    }

    /// Alias given to the proposed-row source of a synthesized merge.
    /// Matches the qualifier emitted by [`Dialect::write_proposed_ref`].
    fn merge_source_alias(&self) -> &'static str {
        "excluded"
    }

    /// Whether column comments can be declared inline in column DDL.
    fn supports_inline_comment(&self) -> bool {
        false
    }

    /// Statement setting a column comment after the fact. `full_type` is
    /// the complete column definition for engines that can only restate
    /// the column.
    fn column_comment_sql(&self, table: &str, column: &str, _full_type: &str, comment: &str)
        -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            quote_literal(comment)
        )
    }

    /// Statement altering a column to `full_type`.
    fn alter_column_sql(&self, table: &str, column: &str, full_type: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            full_type
        )
    }

    /// Statement renaming a column.
    fn rename_column_sql(&self, table: &str, old: &str, new: &str, _full_type: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_identifier(table),
            self.quote_identifier(old),
            self.quote_identifier(new)
        )
    }

    /// Native index rename, or `None` when the migrator must fall back
    /// to drop-then-create.
    fn rename_index_sql(&self, _table: &str, _old: &str, _new: &str) -> Option<String> {
        None
    }

    /// Whether `CREATE INDEX IF NOT EXISTS` is accepted.
    fn supports_create_index_if_not_exists(&self) -> bool {
        true
    }

    /// Statement dropping an index.
    fn drop_index_sql(&self, _table: &str, name: &str) -> String {
        format!("DROP INDEX {}", self.quote_identifier(name))
    }

    /// Statement dropping a table.
    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.quote_identifier(table))
    }

    /// Statement dropping a named constraint. `is_check` distinguishes
    /// check constraints on engines with dedicated syntax.
    fn drop_constraint_sql(&self, table: &str, name: &str, _is_check: bool) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }

    /// Statement toggling foreign-key enforcement for the session.
    fn fk_checks_sql(&self, enable: bool) -> String;

    /// Whether auto-increment is emulated through explicit sequences.
    fn supports_sequences(&self) -> bool {
        false
    }

    /// Marker substring identifying auto-increment columns in the
    /// catalog's `extra` metadata.
    fn auto_increment_marker(&self) -> &'static str {
        "auto_increment"
    }

    /// Savepoint statement for nested-transaction emulation.
    fn savepoint_sql(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    /// Rollback-to-savepoint statement.
    fn rollback_to_savepoint_sql(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }
}

/// Supported dialect variants; selected once at connection-open time and
/// passed explicitly, never looked up ambiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectKind {
    /// MySQL and compatible engines.
    MySql,
    /// PostgreSQL and compatible engines.
    Postgres,
    /// DM (Dameng), an Oracle-syntax engine without a native multi-row
    /// upsert clause.
    Dm,
}

impl DialectKind {
    /// Resolves the variant to its capability set.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::MySql => &MySqlDialect,
            Self::Postgres => &PostgresDialect,
            Self::Dm => &DmDialect,
        }
    }

    /// Dialect name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.dialect().name()
    }
}
