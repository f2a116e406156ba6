//! Catalog introspection: query text and row mapping.
//!
//! Queries are written with `?` markers and rebound to the dialect's
//! placeholder style before execution. Rows come back as positional
//! [`SqlValue`] lists and are mapped with explicit column indexes, so a
//! shape mismatch surfaces as [`MigrateError::CatalogRow`] instead of a
//! silent misread.

use sqlport_core::dialect::{Dialect, DialectKind, Placeholder};
use sqlport_core::SqlValue;

use crate::error::{MigrateError, Result};

/// Rewrites `?` markers to `$N` for dollar-placeholder dialects.
pub(crate) fn rebind(sql: &str, dialect: &dyn Dialect) -> String {
    match dialect.placeholder() {
        Placeholder::Question => sql.to_string(),
        Placeholder::Dollar => {
            let mut out = String::with_capacity(sql.len() + 8);
            let mut n = 0;
            for ch in sql.chars() {
                if ch == '?' {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                } else {
                    out.push(ch);
                }
            }
            out
        }
    }
}

/// One column as reported by the live catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Engine-native data type name.
    pub data_type: String,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Default expression, if any.
    pub default: Option<String>,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether the column carries a unique constraint.
    pub unique: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Column comment, if any.
    pub comment: Option<String>,
}

impl LiveColumn {
    /// Maps a row of the column catalog query. Column order:
    /// name, data type, is_nullable, default, key flag, extra, comment.
    pub(crate) fn from_row(row: &[SqlValue], marker: &str) -> Result<Self> {
        if row.len() != 7 {
            return Err(MigrateError::CatalogRow(format!(
                "expected 7 column fields, got {}",
                row.len()
            )));
        }
        let key_flag = opt_text(&row[4]).unwrap_or_default();
        let extra = opt_text(&row[5]).unwrap_or_default();
        Ok(Self {
            name: text(&row[0])?,
            data_type: text(&row[1])?,
            nullable: is_yes(&row[2]),
            default: opt_text(&row[3]).map(|d| d.trim_matches('\'').to_string()),
            primary_key: key_flag == "PRI",
            unique: key_flag == "UNI",
            auto_increment: extra.to_lowercase().contains(marker),
            comment: opt_text(&row[6]).filter(|c| !c.is_empty()),
        })
    }
}

/// One table as reported by the live catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    /// Schema the table lives in.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Catalog table type (e.g. `BASE TABLE`, `VIEW`).
    pub table_type: String,
    /// Table comment, if any.
    pub comment: Option<String>,
}

impl TableInfo {
    /// Maps a row of the table catalog query.
    pub(crate) fn from_row(row: &[SqlValue]) -> Result<Self> {
        if row.len() != 4 {
            return Err(MigrateError::CatalogRow(format!(
                "expected 4 table fields, got {}",
                row.len()
            )));
        }
        Ok(Self {
            schema: text(&row[0])?,
            name: text(&row[1])?,
            table_type: text(&row[2])?,
            comment: opt_text(&row[3]).filter(|c| !c.is_empty()),
        })
    }
}

pub(crate) fn text(value: &SqlValue) -> Result<String> {
    match value {
        SqlValue::Text(s) => Ok(s.clone()),
        other => Err(MigrateError::CatalogRow(format!(
            "expected text, got {other:?}"
        ))),
    }
}

pub(crate) fn opt_text(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Text(s) => Some(s.clone()),
        _ => None,
    }
}

/// `YES`/`NO` flags and driver-dependent booleans.
pub(crate) fn is_yes(value: &SqlValue) -> bool {
    match value {
        SqlValue::Text(s) => s.eq_ignore_ascii_case("yes") || s == "1",
        SqlValue::Bool(b) => *b,
        SqlValue::Int(i) => *i != 0,
        _ => false,
    }
}

/// Count scalar from a `SELECT count(*)` row set.
pub(crate) fn count(rows: &[Vec<SqlValue>]) -> i64 {
    match rows.first().and_then(|r| r.first()) {
        Some(SqlValue::Int(n)) => *n,
        Some(SqlValue::Text(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Extracts the sequence name from a `nextval('...')` column default.
pub(crate) fn sequence_from_default(default: &str) -> Option<String> {
    let rest = default.trim().strip_prefix("nextval('")?;
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

/// Statement reported by `current_database` on each engine.
pub(crate) fn current_database_sql(kind: DialectKind) -> &'static str {
    match kind {
        DialectKind::MySql => "SELECT DATABASE()",
        DialectKind::Postgres => "SELECT current_database()",
        DialectKind::Dm => "SELECT CURRENT_SCHEMA",
    }
}

/// Exact-match-preferred, prefix-fallback schema lookup.
pub(crate) const SCHEMA_LOOKUP: &str = "SELECT schema_name FROM information_schema.schemata \
     WHERE schema_name LIKE ? ORDER BY schema_name = ? DESC, schema_name LIMIT 1";

pub(crate) const HAS_TABLE: &str = "SELECT count(*) FROM information_schema.tables \
     WHERE table_schema = ? AND table_name = ?";

pub(crate) const GET_TABLES: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name";

pub(crate) const HAS_COLUMN: &str = "SELECT count(*) FROM information_schema.columns \
     WHERE table_schema = ? AND table_name = ? AND column_name = ?";

pub(crate) const HAS_CONSTRAINT: &str =
    "SELECT count(*) FROM information_schema.table_constraints \
     WHERE table_schema = ? AND table_name = ? AND constraint_name = ?";

pub(crate) const COLUMN_DEFAULT: &str = "SELECT column_default FROM information_schema.columns \
     WHERE table_schema = ? AND table_name = ? AND column_name = ?";

/// Table metadata. The comment source differs per engine.
pub(crate) fn table_type_sql(kind: DialectKind) -> &'static str {
    match kind {
        DialectKind::MySql | DialectKind::Dm => {
            "SELECT table_schema, table_name, table_type, table_comment \
             FROM information_schema.tables WHERE table_schema = ? AND table_name = ?"
        }
        DialectKind::Postgres => {
            "SELECT t.table_schema, t.table_name, t.table_type, obj_description(c.oid) \
             FROM information_schema.tables t \
             JOIN pg_class c ON c.relname = t.table_name \
             JOIN pg_namespace n ON n.oid = c.relnamespace AND n.nspname = t.table_schema \
             WHERE t.table_schema = ? AND t.table_name = ?"
        }
    }
}

/// Column scan. Selects, in order: name, data type, is_nullable,
/// default, key flag (`PRI`/`UNI`), extra, comment. Engines without a
/// materialized key-flag/extra column synthesize them in the query so
/// the row shape stays uniform.
pub(crate) fn column_scan_sql(kind: DialectKind) -> &'static str {
    match kind {
        DialectKind::MySql | DialectKind::Dm => {
            "SELECT column_name, data_type, is_nullable, column_default, \
             column_key, extra, column_comment \
             FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position"
        }
        DialectKind::Postgres => {
            "SELECT c.column_name, c.data_type, c.is_nullable, c.column_default, \
             COALESCE((SELECT CASE tc.constraint_type \
                 WHEN 'PRIMARY KEY' THEN 'PRI' WHEN 'UNIQUE' THEN 'UNI' END \
               FROM information_schema.key_column_usage kcu \
               JOIN information_schema.table_constraints tc \
                 ON tc.constraint_name = kcu.constraint_name \
                AND tc.table_schema = kcu.table_schema \
               WHERE kcu.table_schema = c.table_schema \
                 AND kcu.table_name = c.table_name \
                 AND kcu.column_name = c.column_name \
               ORDER BY CASE tc.constraint_type WHEN 'PRIMARY KEY' THEN 0 ELSE 1 END \
               LIMIT 1), ''), \
             CASE WHEN c.column_default LIKE 'nextval(%' THEN 'auto_increment' ELSE '' END, \
             col_description(to_regclass(c.table_schema || '.' || c.table_name), \
                             c.ordinal_position) \
             FROM information_schema.columns c \
             WHERE c.table_schema = ? AND c.table_name = ? ORDER BY c.ordinal_position"
        }
    }
}

/// Index existence check.
pub(crate) fn has_index_sql(kind: DialectKind) -> &'static str {
    match kind {
        DialectKind::MySql | DialectKind::Dm => {
            "SELECT count(*) FROM information_schema.statistics \
             WHERE table_schema = ? AND table_name = ? AND index_name = ?"
        }
        DialectKind::Postgres => {
            "SELECT count(*) FROM pg_indexes \
             WHERE schemaname = ? AND tablename = ? AND indexname = ?"
        }
    }
}
