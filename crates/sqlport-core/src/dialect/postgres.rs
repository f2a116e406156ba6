//! PostgreSQL dialect.

use crate::schema::{ColumnDescriptor, FieldKind};
use crate::statement::{ConflictAction, SqlWriter};

use super::{Dialect, Placeholder, UpsertStyle};

const KEYED_STRING_SIZE: u32 = 191;

/// PostgreSQL dialect: native `ON CONFLICT`, `$N` placeholders,
/// sequence-backed auto-increment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    fn int_type(column: &ColumnDescriptor) -> String {
        // Unsigned widths are bumped one tier so the full value range
        // still fits in a signed column.
        let size = if column.kind == FieldKind::Uint && column.size > 0 {
            column.size.saturating_mul(2)
        } else {
            column.size
        };
        let base = if column.auto_increment {
            match size {
                1..=16 => "smallserial",
                17..=32 => "serial",
                _ => "bigserial",
            }
        } else {
            match size {
                1..=16 => "smallint",
                17..=32 => "integer",
                _ => "bigint",
            }
        };
        String::from(base)
    }

    fn float_type(column: &ColumnDescriptor) -> String {
        if column.precision > 0 {
            return format!("numeric({}, {})", column.precision, column.scale);
        }
        if column.size > 0 && column.size <= 32 {
            String::from("real")
        } else {
            String::from("double precision")
        }
    }

    fn string_type(column: &ColumnDescriptor) -> String {
        let mut size = column.size;
        if size == 0 && (column.is_keyed() || column.default.is_some()) {
            size = KEYED_STRING_SIZE;
        }
        // varchar length is capped by the engine; anything wider is text.
        if size == 0 || size > 10_485_760 {
            String::from("text")
        } else {
            format!("varchar({size})")
        }
    }

    fn time_type(column: &ColumnDescriptor) -> String {
        let mut sql = if column.precision > 0 {
            format!("timestamptz({})", column.precision)
        } else {
            String::from("timestamptz")
        };
        if column.nullable && !column.primary_key {
            sql.push_str(" NULL");
        }
        sql
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Dollar
    }

    fn map_type(&self, column: &ColumnDescriptor) -> String {
        match &column.kind {
            FieldKind::Bool => String::from("boolean"),
            FieldKind::Int | FieldKind::Uint => Self::int_type(column),
            FieldKind::Float => Self::float_type(column),
            FieldKind::String => Self::string_type(column),
            FieldKind::Time => Self::time_type(column),
            FieldKind::Bytes => String::from("bytea"),
            FieldKind::Custom(raw) => raw.clone(),
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    fn write_proposed_ref(&self, w: &mut SqlWriter<'_>, column: &str) {
        w.push("excluded.");
        w.ident(column);
    }

    fn write_conflict_clause(
        &self,
        w: &mut SqlWriter<'_>,
        target: &[String],
        action: &ConflictAction,
    ) {
        w.push("ON CONFLICT (");
        w.ident_list(target);
        w.push(") ");
        match action {
            ConflictAction::DoNothing => w.push("DO NOTHING"),
            ConflictAction::DoUpdate(assignments) => {
                w.push("DO UPDATE SET ");
                for (i, a) in assignments.iter().enumerate() {
                    if i > 0 {
                        w.push(",");
                    }
                    w.assignment(a);
                }
            }
        }
    }

    fn rename_index_sql(&self, _table: &str, old: &str, new: &str) -> Option<String> {
        Some(format!(
            "ALTER INDEX {} RENAME TO {}",
            self.quote_identifier(old),
            self.quote_identifier(new)
        ))
    }

    fn fk_checks_sql(&self, enable: bool) -> String {
        let role = if enable { "origin" } else { "replica" };
        format!("SET session_replication_role = '{role}'")
    }

    fn supports_sequences(&self) -> bool {
        true
    }
}
