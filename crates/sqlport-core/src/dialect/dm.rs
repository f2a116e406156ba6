//! DM (Dameng) dialect.
//!
//! Oracle-flavored syntax: no native multi-row upsert clause, so the
//! planner synthesizes a `MERGE INTO` statement with a `UNION`-of-rows
//! source selected from the zero-row dummy table `DUAL`. The source is
//! aliased `excluded` so update assignments read the same as on engines
//! with a native conflict clause.

use crate::schema::{ColumnDescriptor, FieldKind};
use crate::statement::SqlWriter;

use super::{Dialect, Placeholder, UpsertStyle};

/// Inline varchar ceiling; anything wider becomes a LOB column.
const VARCHAR_CEILING: u32 = 8188;

const KEYED_STRING_SIZE: u32 = 191;

/// DM dialect: emulated `MERGE INTO` upserts, identity columns, no
/// native index rename.
#[derive(Debug, Clone, Copy, Default)]
pub struct DmDialect;

impl DmDialect {
    fn int_type(column: &ColumnDescriptor) -> String {
        let base = match column.size {
            1..=8 => "TINYINT",
            9..=16 => "SMALLINT",
            17..=32 => "INT",
            _ => "BIGINT",
        };
        let mut sql = String::from(base);
        if column.auto_increment {
            sql.push_str(" IDENTITY(1, 1)");
        }
        sql
    }

    fn float_type(column: &ColumnDescriptor) -> String {
        if column.precision > 0 {
            return format!("DECIMAL({}, {})", column.precision, column.scale);
        }
        if column.size > 0 && column.size <= 32 {
            String::from("REAL")
        } else {
            String::from("DOUBLE")
        }
    }

    fn string_type(column: &ColumnDescriptor) -> String {
        let mut size = column.size;
        if size == 0 && (column.is_keyed() || column.default.is_some()) {
            size = KEYED_STRING_SIZE;
        }
        if size == 0 || size > VARCHAR_CEILING {
            String::from("CLOB")
        } else {
            format!("VARCHAR({size})")
        }
    }

    fn time_type(column: &ColumnDescriptor) -> String {
        let mut sql = if column.precision > 0 {
            format!("TIMESTAMP({})", column.precision)
        } else {
            String::from("TIMESTAMP")
        };
        if column.nullable && !column.primary_key {
            sql.push_str(" NULL");
        }
        sql
    }

    fn bytes_type(column: &ColumnDescriptor) -> String {
        if column.size > 0 && column.size <= VARCHAR_CEILING {
            format!("VARBINARY({})", column.size)
        } else {
            String::from("BLOB")
        }
    }

    fn custom_type(raw: &str, column: &ColumnDescriptor) -> String {
        let mut sql = String::from(raw);
        if column.auto_increment && !sql.to_uppercase().contains("IDENTITY") {
            sql.push_str(" IDENTITY(1, 1)");
        }
        sql
    }
}

impl Dialect for DmDialect {
    fn name(&self) -> &'static str {
        "dm"
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    fn map_type(&self, column: &ColumnDescriptor) -> String {
        match &column.kind {
            FieldKind::Bool => String::from("BIT"),
            FieldKind::Int | FieldKind::Uint => Self::int_type(column),
            FieldKind::Float => Self::float_type(column),
            FieldKind::String => Self::string_type(column),
            FieldKind::Time => Self::time_type(column),
            FieldKind::Bytes => Self::bytes_type(column),
            FieldKind::Custom(raw) => Self::custom_type(raw, column),
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::Merge
    }

    fn write_proposed_ref(&self, w: &mut SqlWriter<'_>, column: &str) {
        w.push("excluded.");
        w.ident(column);
    }

    fn dummy_table(&self) -> Option<&'static str> {
        Some("DUAL")
    }

    fn supports_create_index_if_not_exists(&self) -> bool {
        false
    }

    fn fk_checks_sql(&self, enable: bool) -> String {
        let state = if enable { "ENABLE" } else { "DISABLE" };
        format!("SET SCHEMA_CONSTRAINT_CHECK {state}")
    }
}
