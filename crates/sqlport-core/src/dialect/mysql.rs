//! MySQL dialect.

use crate::schema::{ColumnDescriptor, FieldKind};
use crate::statement::{ConflictAction, SqlWriter};

use super::{Dialect, Placeholder, UpsertStyle};

const MEDIUM_TEXT_CEILING: u32 = 1 << 16;
const LONG_TEXT_CEILING: u32 = 1 << 24;

/// Minimum inlineable varchar size for keyed columns declared with size
/// zero. InnoDB rejects unbounded text in index keys; 191 chars keeps
/// the key under the 767-byte limit with utf8mb4.
const KEYED_STRING_SIZE: u32 = 191;

/// MySQL dialect: native `ON DUPLICATE KEY UPDATE`, inline comments,
/// backtick quoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    fn int_type(column: &ColumnDescriptor) -> String {
        let base = match column.size {
            1..=8 => "tinyint",
            9..=16 => "smallint",
            17..=24 => "mediumint",
            25..=32 => "int",
            _ => "bigint",
        };
        let mut sql = String::from(base);
        if column.kind == FieldKind::Uint {
            sql.push_str(" unsigned");
        }
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }

    fn float_type(column: &ColumnDescriptor) -> String {
        if column.precision > 0 {
            return format!("decimal({}, {})", column.precision, column.scale);
        }
        if column.size <= 32 {
            String::from("float")
        } else {
            String::from("double")
        }
    }

    fn string_type(column: &ColumnDescriptor) -> String {
        let mut size = column.size;
        if size == 0 && (column.is_keyed() || column.default.is_some()) {
            size = KEYED_STRING_SIZE;
        }
        if size >= MEDIUM_TEXT_CEILING && size <= LONG_TEXT_CEILING {
            return String::from("mediumtext");
        }
        if size == 0 || size > LONG_TEXT_CEILING {
            return String::from("longtext");
        }
        format!("varchar({size})")
    }

    fn time_type(column: &ColumnDescriptor) -> String {
        let mut sql = String::from("datetime");
        if column.precision > 0 {
            sql.push_str(&format!("({})", column.precision));
        }
        if column.nullable && !column.primary_key {
            sql.push_str(" NULL");
        }
        sql
    }

    fn bytes_type(column: &ColumnDescriptor) -> String {
        if column.size > 0 && column.size < MEDIUM_TEXT_CEILING {
            return format!("varbinary({})", column.size);
        }
        if column.size >= MEDIUM_TEXT_CEILING && column.size <= LONG_TEXT_CEILING {
            return String::from("mediumblob");
        }
        String::from("longblob")
    }

    fn custom_type(raw: &str, column: &ColumnDescriptor) -> String {
        let mut sql = String::from(raw);
        if column.auto_increment && !sql.to_lowercase().contains("auto_increment") {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    fn map_type(&self, column: &ColumnDescriptor) -> String {
        match &column.kind {
            FieldKind::Bool => String::from("boolean"),
            FieldKind::Int | FieldKind::Uint => Self::int_type(column),
            FieldKind::Float => Self::float_type(column),
            FieldKind::String => Self::string_type(column),
            FieldKind::Time => Self::time_type(column),
            FieldKind::Bytes => Self::bytes_type(column),
            FieldKind::Custom(raw) => Self::custom_type(raw, column),
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnDuplicateKey
    }

    fn write_proposed_ref(&self, w: &mut SqlWriter<'_>, column: &str) {
        w.push("VALUES(");
        w.ident(column);
        w.push(")");
    }

    fn write_conflict_clause(
        &self,
        w: &mut SqlWriter<'_>,
        _target: &[String],
        action: &ConflictAction,
    ) {
        // The planner has already replaced DO NOTHING / empty updates
        // with a self-assignment, so only assignments reach us. The
        // conflict target is implied by the table's keys on MySQL.
        let assignments = match action {
            ConflictAction::DoUpdate(a) => a.as_slice(),
            ConflictAction::DoNothing => &[],
        };
        w.push("ON DUPLICATE KEY UPDATE ");
        for (i, a) in assignments.iter().enumerate() {
            if i > 0 {
                w.push(",");
            }
            w.assignment(a);
        }
    }

    fn supports_inline_comment(&self) -> bool {
        true
    }

    fn column_comment_sql(
        &self,
        table: &str,
        column: &str,
        full_type: &str,
        comment: &str,
    ) -> String {
        // No COMMENT ON here; the column definition is restated.
        format!(
            "ALTER TABLE {} MODIFY COLUMN {} {} COMMENT {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            full_type,
            super::quote_literal(comment)
        )
    }

    fn alter_column_sql(&self, table: &str, column: &str, full_type: &str) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {} {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            full_type
        )
    }

    fn rename_column_sql(&self, table: &str, old: &str, new: &str, full_type: &str) -> String {
        format!(
            "ALTER TABLE {} CHANGE {} {} {}",
            self.quote_identifier(table),
            self.quote_identifier(old),
            self.quote_identifier(new),
            full_type
        )
    }

    fn rename_index_sql(&self, table: &str, old: &str, new: &str) -> Option<String> {
        Some(format!(
            "ALTER TABLE {} RENAME INDEX {} TO {}",
            self.quote_identifier(table),
            self.quote_identifier(old),
            self.quote_identifier(new)
        ))
    }

    fn supports_create_index_if_not_exists(&self) -> bool {
        false
    }

    fn drop_index_sql(&self, table: &str, name: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(name),
            self.quote_identifier(table)
        )
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }

    fn drop_constraint_sql(&self, table: &str, name: &str, is_check: bool) -> String {
        let keyword = if is_check { "CHECK" } else { "FOREIGN KEY" };
        format!(
            "ALTER TABLE {} DROP {} {}",
            self.quote_identifier(table),
            keyword,
            self.quote_identifier(name)
        )
    }

    fn fk_checks_sql(&self, enable: bool) -> String {
        format!("SET FOREIGN_KEY_CHECKS = {}", i32::from(enable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;

    fn col(kind: FieldKind) -> ColumnDescriptor {
        ColumnDescriptor::new("c", kind)
    }

    #[test]
    fn test_int_tiers() {
        let d = MySqlDialect;
        let cases = [
            (8, "tinyint"),
            (16, "smallint"),
            (24, "mediumint"),
            (32, "int"),
            (64, "bigint"),
        ];
        for (size, want) in cases {
            assert_eq!(d.map_type(&col(FieldKind::Int).size(size)), want);
        }
    }

    #[test]
    fn test_uint_and_auto_increment_appear_once() {
        let d = MySqlDialect;
        let c = col(FieldKind::Uint).size(64).auto_increment();
        let first = d.map_type(&c);
        assert_eq!(first, "bigint unsigned AUTO_INCREMENT");
        // Mapping is pure; repeating it never stacks modifiers.
        assert_eq!(d.map_type(&c), first);
        assert_eq!(first.matches("unsigned").count(), 1);
        assert_eq!(first.matches("AUTO_INCREMENT").count(), 1);
    }

    #[test]
    fn test_float_precision_and_width() {
        let d = MySqlDialect;
        assert_eq!(d.map_type(&col(FieldKind::Float).precision(10, 2)), "decimal(10, 2)");
        assert_eq!(d.map_type(&col(FieldKind::Float).size(32)), "float");
        assert_eq!(d.map_type(&col(FieldKind::Float).size(64)), "double");
    }

    #[test]
    fn test_string_keyed_zero_size_gets_inline_varchar() {
        let d = MySqlDialect;
        assert_eq!(
            d.map_type(&col(FieldKind::String).primary_key()),
            "varchar(191)"
        );
        assert_eq!(d.map_type(&col(FieldKind::String).unique()), "varchar(191)");
        assert_eq!(d.map_type(&col(FieldKind::String).indexed()), "varchar(191)");
    }

    #[test]
    fn test_string_tiers() {
        let d = MySqlDialect;
        assert_eq!(d.map_type(&col(FieldKind::String)), "longtext");
        assert_eq!(d.map_type(&col(FieldKind::String).size(255)), "varchar(255)");
        assert_eq!(d.map_type(&col(FieldKind::String).size(70_000)), "mediumtext");
        assert_eq!(
            d.map_type(&col(FieldKind::String).size(20_000_000)),
            "longtext"
        );
    }

    #[test]
    fn test_time_null_qualifier() {
        let d = MySqlDialect;
        assert_eq!(
            d.map_type(&col(FieldKind::Time).precision(3, 0)),
            "datetime(3) NULL"
        );
        assert_eq!(d.map_type(&col(FieldKind::Time).not_null()), "datetime");
        assert_eq!(d.map_type(&col(FieldKind::Time).primary_key()), "datetime");
    }

    #[test]
    fn test_bytes_tiers() {
        let d = MySqlDialect;
        assert_eq!(d.map_type(&col(FieldKind::Bytes).size(16)), "varbinary(16)");
        assert_eq!(d.map_type(&col(FieldKind::Bytes).size(70_000)), "mediumblob");
        assert_eq!(d.map_type(&col(FieldKind::Bytes)), "longblob");
    }

    #[test]
    fn test_custom_passthrough_no_duplicate_modifier() {
        let d = MySqlDialect;
        assert_eq!(
            d.map_type(&col(FieldKind::Custom("json".into()))),
            "json"
        );
        assert_eq!(
            d.map_type(&col(FieldKind::Custom("serial".into())).auto_increment()),
            "serial AUTO_INCREMENT"
        );
        assert_eq!(
            d.map_type(&col(FieldKind::Custom("int AUTO_INCREMENT".into())).auto_increment()),
            "int AUTO_INCREMENT"
        );
    }
}
