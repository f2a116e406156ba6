//! Schema migrator.
//!
//! [`Migrator`] applies declared [`TableDescriptor`]s against a live
//! database through one [`SqlExecutor`]. Catalog reads go through the
//! introspection queries in [`crate::catalog`]; DDL text comes from the
//! dialect hooks. DDL is never assumed transactional: multi-statement
//! operations abort on the first failure, and restoration steps (the
//! foreign-key re-enable in [`Migrator::drop_tables`]) run regardless.

use std::sync::atomic::{AtomicBool, Ordering};

use sqlport_core::dialect::{quote_literal, Dialect, DialectKind};
use sqlport_core::schema::{
    ColumnDescriptor, ConstraintDescriptor, ConstraintKind, IndexDescriptor, TableDescriptor,
};
use sqlport_core::SqlValue;
use tracing::{debug, info, warn};

use crate::catalog::{self, LiveColumn, TableInfo};
use crate::error::{MigrateError, Result};
use crate::executor::{SqlExecutor, StatementRunner};

/// Applies schema changes through an executor, one dialect at a time.
pub struct Migrator<E> {
    exec: E,
    kind: DialectKind,
    stale_statements: AtomicBool,
}

impl<E: SqlExecutor> Migrator<E> {
    /// Creates a migrator for the given executor and dialect.
    pub fn new(exec: E, kind: DialectKind) -> Self {
        Self {
            exec,
            kind,
            stale_statements: AtomicBool::new(false),
        }
    }

    /// The dialect in use.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.kind.dialect()
    }

    /// The underlying executor.
    #[must_use]
    pub fn executor(&self) -> &E {
        &self.exec
    }

    /// Returns and clears the prepared-statement staleness flag. Set
    /// after any DDL that changes a table's shape; callers owning a
    /// statement cache should flush it when this reads true.
    pub fn take_stale_statements(&self) -> bool {
        self.stale_statements.swap(false, Ordering::AcqRel)
    }

    fn mark_stale(&self) {
        self.stale_statements.store(true, Ordering::Release);
    }

    async fn run(&self, sql: &str) -> Result<u64> {
        debug!(sql = %sql, "Executing DDL");
        self.exec.execute(sql, &[]).await
    }

    async fn fetch(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Vec<SqlValue>>> {
        let sql = catalog::rebind(sql, self.dialect());
        debug!(sql = %sql, "Querying catalog");
        self.exec.query(&sql, &params).await
    }

    // Catalog reads

    /// Name of the database/schema the connection currently points at.
    pub async fn current_database(&self) -> Result<String> {
        let rows = self
            .fetch(catalog::current_database_sql(self.kind), Vec::new())
            .await?;
        match rows.first().and_then(|r| r.first()) {
            Some(SqlValue::Text(name)) => Ok(name.clone()),
            _ => Err(MigrateError::CatalogRow(
                "current database query returned no name".into(),
            )),
        }
    }

    /// Splits a possibly qualified table name into `(schema, table)`.
    ///
    /// A qualifier is resolved against the live schema catalog with an
    /// exact match preferred and a lexical prefix fallback; unqualified
    /// names use the current database.
    pub async fn current_schema(&self, table: &str) -> Result<(String, String)> {
        let Some((qualifier, bare)) = table.split_once('.') else {
            return Ok((self.current_database().await?, table.to_string()));
        };
        let rows = self
            .fetch(
                catalog::SCHEMA_LOOKUP,
                vec![
                    SqlValue::Text(format!("{qualifier}%")),
                    SqlValue::Text(qualifier.to_string()),
                ],
            )
            .await?;
        let schema = match rows.first().and_then(|r| r.first()) {
            Some(SqlValue::Text(name)) => name.clone(),
            _ => qualifier.to_string(),
        };
        Ok((schema, bare.to_string()))
    }

    /// Whether the table exists.
    pub async fn has_table(&self, table: &str) -> Result<bool> {
        let (schema, name) = self.current_schema(table).await?;
        let rows = self
            .fetch(
                catalog::HAS_TABLE,
                vec![SqlValue::Text(schema), SqlValue::Text(name)],
            )
            .await?;
        Ok(catalog::count(&rows) > 0)
    }

    /// Base-table names in the current database.
    pub async fn get_tables(&self) -> Result<Vec<String>> {
        let schema = self.current_database().await?;
        let rows = self
            .fetch(catalog::GET_TABLES, vec![SqlValue::Text(schema)])
            .await?;
        rows.iter()
            .map(|row| catalog::text(row.first().unwrap_or(&SqlValue::Null)))
            .collect()
    }

    /// Schema, name, type and comment of the table as the catalog sees
    /// it.
    pub async fn table_type(&self, table: &str) -> Result<TableInfo> {
        let (schema, name) = self.current_schema(table).await?;
        let rows = self
            .fetch(
                catalog::table_type_sql(self.kind),
                vec![SqlValue::Text(schema), SqlValue::Text(name.clone())],
            )
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| MigrateError::UnknownTable(name))?;
        TableInfo::from_row(row)
    }

    /// Whether the column exists on the table.
    pub async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let (schema, name) = self.current_schema(table).await?;
        let rows = self
            .fetch(
                catalog::HAS_COLUMN,
                vec![
                    SqlValue::Text(schema),
                    SqlValue::Text(name),
                    SqlValue::Text(column.to_string()),
                ],
            )
            .await?;
        Ok(catalog::count(&rows) > 0)
    }

    /// Live column descriptions in ordinal order.
    pub async fn column_types(&self, table: &str) -> Result<Vec<LiveColumn>> {
        let (schema, name) = self.current_schema(table).await?;
        let rows = self
            .fetch(
                catalog::column_scan_sql(self.kind),
                vec![SqlValue::Text(schema), SqlValue::Text(name)],
            )
            .await?;
        let marker = self.dialect().auto_increment_marker();
        rows.iter()
            .map(|row| LiveColumn::from_row(row, marker))
            .collect()
    }

    // Column DDL

    /// Adds a declared column to its table. On dialects without inline
    /// comments the comment is issued as a follow-up statement; its
    /// failure propagates.
    pub async fn add_column(&self, table: &TableDescriptor, column: &str) -> Result<()> {
        let col = self.declared_column(table, column)?;
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            d.quote_identifier(&table.name),
            self.column_definition(col, false)
        );
        self.run(&sql).await?;
        self.mark_stale();
        self.comment_follow_up(table, col).await
    }

    /// Alters a column to its declared type.
    pub async fn alter_column(&self, table: &TableDescriptor, column: &str) -> Result<()> {
        let col = self.declared_column(table, column)?;
        let d = self.dialect();
        let sql = d.alter_column_sql(&table.name, &col.name, &self.full_column_type(col));
        self.run(&sql).await?;
        self.mark_stale();
        self.comment_follow_up(table, col).await
    }

    /// Reconciles one live column with its declaration. Currently only
    /// the comment is diffed; the comment statement is issued only when
    /// the live comment differs.
    pub async fn migrate_column(
        &self,
        table: &TableDescriptor,
        column: &str,
        live: &LiveColumn,
    ) -> Result<()> {
        let col = self.declared_column(table, column)?;
        if col.comment == live.comment {
            return Ok(());
        }
        let Some(comment) = &col.comment else {
            return Ok(());
        };
        let d = self.dialect();
        let sql =
            d.column_comment_sql(&table.name, &col.name, &self.full_column_type(col), comment);
        self.run(&sql).await?;
        Ok(())
    }

    /// Drops a column.
    pub async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            d.quote_identifier(table),
            d.quote_identifier(column)
        );
        self.run(&sql).await?;
        self.mark_stale();
        Ok(())
    }

    /// Renames a column. The declared definition of the new name feeds
    /// dialects that must restate the column to rename it.
    pub async fn rename_column(
        &self,
        table: &TableDescriptor,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let col = self
            .declared_column(table, new)
            .or_else(|_| self.declared_column(table, old))?;
        let d = self.dialect();
        let sql = d.rename_column_sql(&table.name, old, new, &self.full_column_type(col));
        self.run(&sql).await?;
        self.mark_stale();
        Ok(())
    }

    // Index DDL

    /// Whether the named index exists on the table.
    pub async fn has_index(&self, table: &str, index: &str) -> Result<bool> {
        let (schema, name) = self.current_schema(table).await?;
        let rows = self
            .fetch(
                catalog::has_index_sql(self.kind),
                vec![
                    SqlValue::Text(schema),
                    SqlValue::Text(name),
                    SqlValue::Text(index.to_string()),
                ],
            )
            .await?;
        Ok(catalog::count(&rows) > 0)
    }

    /// Creates a declared index. Re-running is a no-op: existence is
    /// checked first, and `IF NOT EXISTS` is added where the engine
    /// accepts it.
    pub async fn create_index(&self, table: &TableDescriptor, index: &str) -> Result<()> {
        let idx = self.declared_index(table, index)?;
        if self.has_index(&table.name, &idx.name).await? {
            debug!(table = %table.name, index = %idx.name, "Index already exists, skipping");
            return Ok(());
        }
        let sql = self.index_create_sql(&table.name, idx, &idx.name, true);
        self.run(&sql).await?;
        Ok(())
    }

    /// Drops an index.
    pub async fn drop_index(&self, table: &str, index: &str) -> Result<()> {
        let sql = self.dialect().drop_index_sql(table, index);
        self.run(&sql).await?;
        Ok(())
    }

    /// Renames an index, natively where the engine supports it.
    ///
    /// Engines without a native rename get DROP-then-CREATE from the
    /// declared descriptor with an identical column list. That pair is
    /// not atomic; a failure between the two leaves the index absent.
    pub async fn rename_index(
        &self,
        table: &TableDescriptor,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let d = self.dialect();
        if let Some(sql) = d.rename_index_sql(&table.name, old, new) {
            self.run(&sql).await?;
            return Ok(());
        }
        let idx = self
            .declared_index(table, new)
            .or_else(|_| self.declared_index(table, old))?;
        warn!(
            table = %table.name,
            old = %old,
            new = %new,
            "No native index rename, dropping and recreating"
        );
        self.drop_index(&table.name, old).await?;
        let sql = self.index_create_sql(&table.name, idx, new, false);
        self.run(&sql).await?;
        Ok(())
    }

    // Table DDL

    /// Creates a declared table: base DDL, then declared indexes, then
    /// per-column comments as separate statements where the engine has
    /// no inline comment syntax. The sequence aborts on the first
    /// failure.
    pub async fn create_table(&self, table: &TableDescriptor) -> Result<()> {
        info!(table = %table.name, "Creating table");
        let d = self.dialect();
        let mut runner = StatementRunner::new(&self.exec);
        runner.run_sql(&self.create_table_sql(table)).await;
        for idx in &table.indexes {
            runner
                .run_sql(&self.index_create_sql(&table.name, idx, &idx.name, true))
                .await;
        }
        if !d.supports_inline_comment() {
            for col in &table.columns {
                if let Some(comment) = &col.comment {
                    let sql = d.column_comment_sql(
                        &table.name,
                        &col.name,
                        &self.full_column_type(col),
                        comment,
                    );
                    runner.run_sql(&sql).await;
                }
            }
        }
        self.mark_stale();
        runner.finish()
    }

    /// Base `CREATE TABLE` text for a declared table.
    #[must_use]
    pub fn create_table_sql(&self, table: &TableDescriptor) -> String {
        let d = self.dialect();
        let pk = table.primary_key_columns();
        let inline_pk = pk.len() == 1;

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c, inline_pk))
            .collect();
        if pk.len() > 1 {
            let names: Vec<String> = pk.iter().map(|c| d.quote_identifier(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", names.join(",")));
        }
        for constraint in &table.constraints {
            parts.push(self.constraint_definition(constraint));
        }
        format!(
            "CREATE TABLE {} ({})",
            d.quote_identifier(&table.name),
            parts.join(", ")
        )
    }

    /// Drops tables in reverse declaration order with foreign-key
    /// enforcement suspended for the whole batch. Enforcement is
    /// re-enabled even when a drop fails; the first failure is returned.
    pub async fn drop_tables(&self, tables: &[&str]) -> Result<()> {
        let d = self.dialect();
        self.run(&d.fk_checks_sql(false)).await?;
        let mut first_error = None;
        for table in tables.iter().rev() {
            match self.run(&d.drop_table_sql(table)).await {
                Ok(_) => {}
                Err(e) => {
                    warn!(table = %table, error = %e, "Drop failed, aborting batch");
                    first_error = Some(e);
                    break;
                }
            }
        }
        let enable = self.run(&d.fk_checks_sql(true)).await;
        self.mark_stale();
        match first_error {
            Some(e) => Err(e),
            None => enable.map(|_| ()),
        }
    }

    // Constraints

    /// Whether the named constraint exists on the table.
    pub async fn has_constraint(&self, table: &str, constraint: &str) -> Result<bool> {
        let (schema, name) = self.current_schema(table).await?;
        let rows = self
            .fetch(
                catalog::HAS_CONSTRAINT,
                vec![
                    SqlValue::Text(schema),
                    SqlValue::Text(name),
                    SqlValue::Text(constraint.to_string()),
                ],
            )
            .await?;
        Ok(catalog::count(&rows) > 0)
    }

    /// Adds a declared constraint to its table.
    pub async fn add_constraint(&self, table: &TableDescriptor, constraint: &str) -> Result<()> {
        let c = table.get_constraint(constraint).ok_or_else(|| {
            MigrateError::UnknownConstraint {
                table: table.name.clone(),
                constraint: constraint.to_string(),
            }
        })?;
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} ADD {}",
            d.quote_identifier(&table.name),
            self.constraint_definition(c)
        );
        self.run(&sql).await?;
        Ok(())
    }

    /// Drops a constraint, dispatching to check-specific syntax where
    /// the declared kind is known.
    pub async fn drop_constraint(&self, table: &TableDescriptor, constraint: &str) -> Result<()> {
        let is_check = table
            .get_constraint(constraint)
            .is_some_and(|c| matches!(c.kind, ConstraintKind::Check { .. }));
        let sql = self
            .dialect()
            .drop_constraint_sql(&table.name, constraint, is_check);
        self.run(&sql).await?;
        Ok(())
    }

    // Sequences

    /// Creates the backing sequence for a column and wires it up as the
    /// column default, owned by the column.
    pub async fn create_sequence(&self, table: &TableDescriptor, column: &str) -> Result<()> {
        let d = self.require_sequences()?;
        let col = self.declared_column(table, column)?;
        let seq = format!("{}_{}_seq", table.bare_name(), col.name);
        self.run(&format!(
            "CREATE SEQUENCE IF NOT EXISTS {}",
            d.quote_identifier(&seq)
        ))
        .await?;
        self.run(&format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT nextval({})",
            d.quote_identifier(&table.name),
            d.quote_identifier(&col.name),
            quote_literal(&seq)
        ))
        .await?;
        self.run(&format!(
            "ALTER SEQUENCE {} OWNED BY {}.{}",
            d.quote_identifier(&seq),
            d.quote_identifier(&table.name),
            d.quote_identifier(&col.name)
        ))
        .await?;
        Ok(())
    }

    /// Restarts a column's backing sequence. The sequence name is read
    /// from the live column default, never recomputed from the naming
    /// convention.
    pub async fn update_sequence(
        &self,
        table: &TableDescriptor,
        column: &str,
        start: i64,
    ) -> Result<()> {
        let d = self.require_sequences()?;
        let seq = self.live_sequence_name(table, column).await?;
        self.run(&format!(
            "ALTER SEQUENCE {} RESTART WITH {start}",
            d.quote_identifier(&seq)
        ))
        .await?;
        Ok(())
    }

    /// Detaches and drops a column's backing sequence.
    pub async fn delete_sequence(&self, table: &TableDescriptor, column: &str) -> Result<()> {
        let d = self.require_sequences()?;
        let seq = self.live_sequence_name(table, column).await?;
        self.run(&format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
            d.quote_identifier(&table.name),
            d.quote_identifier(column)
        ))
        .await?;
        self.run(&format!(
            "DROP SEQUENCE IF EXISTS {}",
            d.quote_identifier(&seq)
        ))
        .await?;
        Ok(())
    }

    async fn live_sequence_name(&self, table: &TableDescriptor, column: &str) -> Result<String> {
        let (schema, name) = self.current_schema(&table.name).await?;
        let rows = self
            .fetch(
                catalog::COLUMN_DEFAULT,
                vec![
                    SqlValue::Text(schema),
                    SqlValue::Text(name),
                    SqlValue::Text(column.to_string()),
                ],
            )
            .await?;
        let default = match rows.first().and_then(|r| r.first()) {
            Some(SqlValue::Text(d)) => d.clone(),
            _ => String::new(),
        };
        catalog::sequence_from_default(&default).ok_or_else(|| MigrateError::SequenceDefault {
            table: table.name.clone(),
            column: column.to_string(),
            default,
        })
    }

    fn require_sequences(&self) -> Result<&'static dyn Dialect> {
        let d = self.dialect();
        if !d.supports_sequences() {
            return Err(MigrateError::Unsupported {
                dialect: d.name(),
                operation: "sequences",
            });
        }
        Ok(d)
    }

    // Definition builders

    fn declared_column<'t>(
        &self,
        table: &'t TableDescriptor,
        column: &str,
    ) -> Result<&'t ColumnDescriptor> {
        table
            .get_column(column)
            .ok_or_else(|| MigrateError::UnknownColumn {
                table: table.name.clone(),
                column: column.to_string(),
            })
    }

    fn declared_index<'t>(
        &self,
        table: &'t TableDescriptor,
        index: &str,
    ) -> Result<&'t IndexDescriptor> {
        table
            .get_index(index)
            .ok_or_else(|| MigrateError::UnknownIndex {
                table: table.name.clone(),
                index: index.to_string(),
            })
    }

    /// Column definition for CREATE/ADD: name, type, nullability,
    /// default, keys, and the comment where the engine takes it inline.
    fn column_definition(&self, col: &ColumnDescriptor, inline_pk: bool) -> String {
        let d = self.dialect();
        let mut def = format!("{} {}", d.quote_identifier(&col.name), d.map_type(col));
        if !col.nullable && !col.primary_key {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &col.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        if col.unique {
            def.push_str(" UNIQUE");
        }
        if inline_pk && col.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if d.supports_inline_comment() {
            if let Some(comment) = &col.comment {
                def.push_str(" COMMENT ");
                def.push_str(&quote_literal(comment));
            }
        }
        def
    }

    /// Full type clause for restating a column in ALTER/CHANGE/comment
    /// statements.
    fn full_column_type(&self, col: &ColumnDescriptor) -> String {
        let mut full = self.dialect().map_type(col);
        if !col.nullable && !col.primary_key {
            full.push_str(" NOT NULL");
        }
        if let Some(default) = &col.default {
            full.push_str(" DEFAULT ");
            full.push_str(default);
        }
        full
    }

    fn constraint_definition(&self, constraint: &ConstraintDescriptor) -> String {
        let d = self.dialect();
        let mut def = format!("CONSTRAINT {} ", d.quote_identifier(&constraint.name));
        match &constraint.kind {
            ConstraintKind::ForeignKey {
                columns,
                references_table,
                references_columns,
                on_delete,
                on_update,
            } => {
                let own: Vec<String> = columns.iter().map(|c| d.quote_identifier(c)).collect();
                let refs: Vec<String> = references_columns
                    .iter()
                    .map(|c| d.quote_identifier(c))
                    .collect();
                def.push_str(&format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    own.join(","),
                    d.quote_identifier(references_table),
                    refs.join(",")
                ));
                if let Some(action) = on_delete {
                    def.push_str(" ON DELETE ");
                    def.push_str(action);
                }
                if let Some(action) = on_update {
                    def.push_str(" ON UPDATE ");
                    def.push_str(action);
                }
            }
            ConstraintKind::Check { expression } => {
                def.push_str(&format!("CHECK ({expression})"));
            }
        }
        def
    }

    fn index_create_sql(
        &self,
        table: &str,
        idx: &IndexDescriptor,
        name: &str,
        if_not_exists: bool,
    ) -> String {
        let d = self.dialect();
        let mut sql = String::from("CREATE ");
        if idx.unique {
            sql.push_str("UNIQUE ");
        } else if let Some(class) = &idx.class {
            sql.push_str(class);
            sql.push(' ');
        }
        sql.push_str("INDEX ");
        if if_not_exists && d.supports_create_index_if_not_exists() {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&d.quote_identifier(name));
        sql.push_str(" ON ");
        sql.push_str(&d.quote_identifier(table));
        if let Some(method) = &idx.method {
            sql.push_str(" USING ");
            sql.push_str(method);
        }
        sql.push_str(" (");
        for (i, col) in idx.columns.iter().enumerate() {
            if i > 0 {
                sql.push(',');
            }
            match &col.expression {
                Some(expr) => sql.push_str(expr),
                None => sql.push_str(&d.quote_identifier(&col.name)),
            }
            if let Some(collate) = &col.collate {
                sql.push_str(" COLLATE ");
                sql.push_str(collate);
            }
            if let Some(sort) = &col.sort {
                sql.push(' ');
                sql.push_str(sort);
            }
        }
        sql.push(')');
        if let Some(predicate) = &idx.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql
    }

    async fn comment_follow_up(
        &self,
        table: &TableDescriptor,
        col: &ColumnDescriptor,
    ) -> Result<()> {
        let d = self.dialect();
        if d.supports_inline_comment() {
            return Ok(());
        }
        let Some(comment) = &col.comment else {
            return Ok(());
        };
        let sql =
            d.column_comment_sql(&table.name, &col.name, &self.full_column_type(col), comment);
        self.run(&sql).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExecutor;
    use sqlport_core::schema::{FieldKind, IndexColumn};

    fn users() -> TableDescriptor {
        TableDescriptor::new("users")
            .column(
                ColumnDescriptor::new("id", FieldKind::Uint)
                    .size(64)
                    .primary_key()
                    .auto_increment(),
            )
            .column(
                ColumnDescriptor::new("email", FieldKind::String)
                    .size(255)
                    .not_null()
                    .comment("login address"),
            )
            .column(ColumnDescriptor::new("name", FieldKind::String).size(255))
            .index(IndexDescriptor::new(
                "idx_users_email",
                vec![IndexColumn::new("email")],
            ))
    }

    fn count_row(n: i64) -> Vec<Vec<SqlValue>> {
        vec![vec![SqlValue::Int(n)]]
    }

    fn name_row(name: &str) -> Vec<Vec<SqlValue>> {
        vec![vec![SqlValue::Text(name.into())]]
    }

    #[tokio::test]
    async fn test_current_schema_prefers_exact_match() {
        let exec = MockExecutor::new().expect_query(name_row("app_prod"));
        let m = Migrator::new(exec, DialectKind::MySql);

        let (schema, table) = m.current_schema("app.users").await.unwrap();
        assert_eq!(schema, "app_prod");
        assert_eq!(table, "users");

        let queried = m.executor().queried_sql();
        assert!(queried[0].contains("ORDER BY schema_name = ? DESC"));
    }

    #[tokio::test]
    async fn test_current_schema_unqualified_uses_database() {
        let exec = MockExecutor::new().expect_query(name_row("shop"));
        let m = Migrator::new(exec, DialectKind::MySql);

        let (schema, table) = m.current_schema("users").await.unwrap();
        assert_eq!(schema, "shop");
        assert_eq!(table, "users");
        assert_eq!(m.executor().queried_sql(), vec!["SELECT DATABASE()"]);
    }

    #[tokio::test]
    async fn test_has_table() {
        let exec = MockExecutor::new()
            .expect_query(name_row("shop"))
            .expect_query(count_row(1));
        let m = Migrator::new(exec, DialectKind::MySql);
        assert!(m.has_table("users").await.unwrap());
    }

    #[tokio::test]
    async fn test_catalog_query_rebinding_for_postgres() {
        let exec = MockExecutor::new()
            .expect_query(name_row("public"))
            .expect_query(count_row(0));
        let m = Migrator::new(exec, DialectKind::Postgres);
        assert!(!m.has_table("users").await.unwrap());

        let queried = m.executor().queried_sql();
        assert!(queried[1].contains("table_schema = $1 AND table_name = $2"));
    }

    #[tokio::test]
    async fn test_column_types_maps_flags() {
        let rows = vec![
            vec![
                SqlValue::Text("id".into()),
                SqlValue::Text("bigint".into()),
                SqlValue::Text("NO".into()),
                SqlValue::Null,
                SqlValue::Text("PRI".into()),
                SqlValue::Text("auto_increment".into()),
                SqlValue::Null,
            ],
            vec![
                SqlValue::Text("email".into()),
                SqlValue::Text("varchar".into()),
                SqlValue::Text("NO".into()),
                SqlValue::Text("'unknown'".into()),
                SqlValue::Text("UNI".into()),
                SqlValue::Text("".into()),
                SqlValue::Text("login address".into()),
            ],
        ];
        let exec = MockExecutor::new()
            .expect_query(name_row("shop"))
            .expect_query(rows);
        let m = Migrator::new(exec, DialectKind::MySql);

        let cols = m.column_types("users").await.unwrap();
        assert_eq!(cols.len(), 2);
        assert!(cols[0].primary_key && cols[0].auto_increment);
        assert!(cols[1].unique);
        assert_eq!(cols[1].default.as_deref(), Some("unknown"));
        assert_eq!(cols[1].comment.as_deref(), Some("login address"));
    }

    #[tokio::test]
    async fn test_add_column_inline_comment_on_mysql() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::MySql);
        m.add_column(&users(), "email").await.unwrap();

        let executed = m.executor().executed_sql();
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0],
            "ALTER TABLE `users` ADD COLUMN `email` varchar(255) NOT NULL \
             COMMENT 'login address'"
        );
        assert!(m.take_stale_statements());
        assert!(!m.take_stale_statements());
    }

    #[tokio::test]
    async fn test_add_column_comment_follow_up_on_postgres() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::Postgres);
        m.add_column(&users(), "email").await.unwrap();

        let executed = m.executor().executed_sql();
        assert_eq!(executed.len(), 2);
        assert_eq!(
            executed[1],
            "COMMENT ON COLUMN \"users\".\"email\" IS 'login address'"
        );
    }

    #[tokio::test]
    async fn test_comment_follow_up_failure_propagates() {
        let exec = MockExecutor::new().fail_on("COMMENT ON");
        let m = Migrator::new(exec, DialectKind::Postgres);
        let err = m.add_column(&users(), "email").await.unwrap_err();
        assert!(matches!(err, MigrateError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_migrate_column_skips_equal_comment() {
        let live = LiveColumn {
            name: "email".into(),
            data_type: "varchar".into(),
            nullable: false,
            default: None,
            primary_key: false,
            unique: false,
            auto_increment: false,
            comment: Some("login address".into()),
        };
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::Postgres);
        m.migrate_column(&users(), "email", &live).await.unwrap();
        assert!(m.executor().executed().is_empty());

        let stale = LiveColumn {
            comment: Some("old text".into()),
            ..live
        };
        m.migrate_column(&users(), "email", &stale).await.unwrap();
        assert_eq!(m.executor().executed().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_column_restates_type_on_mysql() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::MySql);
        m.rename_column(&users(), "name", "full_name").await.unwrap();
        // Unknown new name falls back to the old declaration.
        assert_eq!(
            m.executor().executed_sql()[0],
            "ALTER TABLE `users` CHANGE `name` `full_name` varchar(255)"
        );
    }

    #[tokio::test]
    async fn test_create_index_skips_existing() {
        let exec = MockExecutor::new()
            .expect_query(name_row("shop"))
            .expect_query(count_row(1));
        let m = Migrator::new(exec, DialectKind::MySql);
        m.create_index(&users(), "idx_users_email").await.unwrap();
        assert!(m.executor().executed().is_empty());
    }

    #[tokio::test]
    async fn test_create_index_unknown_name() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::MySql);
        let err = m.create_index(&users(), "idx_missing").await.unwrap_err();
        assert!(matches!(err, MigrateError::UnknownIndex { .. }));
    }

    #[tokio::test]
    async fn test_rename_index_native_on_postgres() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::Postgres);
        m.rename_index(&users(), "idx_users_email", "idx_email")
            .await
            .unwrap();
        assert_eq!(
            m.executor().executed_sql(),
            vec!["ALTER INDEX \"idx_users_email\" RENAME TO \"idx_email\""]
        );
    }

    #[tokio::test]
    async fn test_rename_index_falls_back_to_drop_create() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::Dm);
        m.rename_index(&users(), "idx_users_email", "idx_email")
            .await
            .unwrap();

        let executed = m.executor().executed_sql();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0], "DROP INDEX \"idx_users_email\"");
        assert_eq!(
            executed[1],
            "CREATE INDEX \"idx_email\" ON \"users\" (\"email\")"
        );
    }

    #[tokio::test]
    async fn test_create_table_sequence_and_comment_abort() {
        let exec = MockExecutor::new().fail_on("COMMENT ON");
        let m = Migrator::new(exec, DialectKind::Postgres);
        let table = users();
        let err = m.create_table(&table).await.unwrap_err();
        assert!(matches!(err, MigrateError::Execution { .. }));

        let executed = m.executor().executed_sql();
        // CREATE TABLE, CREATE INDEX, then the failing comment; nothing
        // after the failure.
        assert_eq!(executed.len(), 3);
        assert!(executed[0].starts_with("CREATE TABLE \"users\""));
        assert!(executed[0].contains("\"id\" bigserial PRIMARY KEY"));
        assert!(executed[0].contains("\"email\" varchar(255) NOT NULL"));
        assert!(executed[1].starts_with("CREATE INDEX IF NOT EXISTS \"idx_users_email\""));
        assert!(executed[2].starts_with("COMMENT ON COLUMN"));
    }

    #[tokio::test]
    async fn test_create_table_composite_primary_key() {
        let table = TableDescriptor::new("memberships")
            .column(ColumnDescriptor::new("org", FieldKind::Int).size(64).primary_key())
            .column(ColumnDescriptor::new("user", FieldKind::Int).size(64).primary_key());
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::MySql);
        let sql = m.create_table_sql(&table);
        assert_eq!(
            sql,
            "CREATE TABLE `memberships` (`org` bigint, `user` bigint, \
             PRIMARY KEY (`org`,`user`))"
        );
    }

    #[tokio::test]
    async fn test_drop_tables_reverse_order_single_fk_pair() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::MySql);
        m.drop_tables(&["users", "orders", "items"]).await.unwrap();

        let executed = m.executor().executed_sql();
        assert_eq!(
            executed,
            vec![
                "SET FOREIGN_KEY_CHECKS = 0",
                "DROP TABLE IF EXISTS `items`",
                "DROP TABLE IF EXISTS `orders`",
                "DROP TABLE IF EXISTS `users`",
                "SET FOREIGN_KEY_CHECKS = 1",
            ]
        );
    }

    #[tokio::test]
    async fn test_drop_tables_reenables_fk_checks_on_failure() {
        let exec = MockExecutor::new().fail_on("DROP TABLE IF EXISTS `orders`");
        let m = Migrator::new(exec, DialectKind::MySql);
        let err = m.drop_tables(&["users", "orders", "items"]).await.unwrap_err();
        assert!(matches!(err, MigrateError::Execution { .. }));

        let executed = m.executor().executed_sql();
        // The failed drop aborts the batch but the re-enable still runs.
        assert_eq!(executed.last().unwrap(), "SET FOREIGN_KEY_CHECKS = 1");
        assert!(!executed.iter().any(|s| s.contains("`users`")));
    }

    #[tokio::test]
    async fn test_add_and_drop_constraint() {
        let table = TableDescriptor::new("orders")
            .column(ColumnDescriptor::new("user_id", FieldKind::Int).size(64))
            .constraint(ConstraintDescriptor {
                name: "fk_orders_user".into(),
                kind: ConstraintKind::ForeignKey {
                    columns: vec!["user_id".into()],
                    references_table: "users".into(),
                    references_columns: vec!["id".into()],
                    on_delete: Some("CASCADE".into()),
                    on_update: None,
                },
            });
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::MySql);
        m.add_constraint(&table, "fk_orders_user").await.unwrap();
        m.drop_constraint(&table, "fk_orders_user").await.unwrap();

        let executed = m.executor().executed_sql();
        assert_eq!(
            executed[0],
            "ALTER TABLE `orders` ADD CONSTRAINT `fk_orders_user` \
             FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"
        );
        assert_eq!(
            executed[1],
            "ALTER TABLE `orders` DROP FOREIGN KEY `fk_orders_user`"
        );
    }

    #[tokio::test]
    async fn test_sequences_rejected_off_postgres() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::MySql);
        let err = m.create_sequence(&users(), "id").await.unwrap_err();
        assert!(matches!(err, MigrateError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_create_sequence_statements() {
        let exec = MockExecutor::new();
        let m = Migrator::new(exec, DialectKind::Postgres);
        m.create_sequence(&users(), "id").await.unwrap();

        let executed = m.executor().executed_sql();
        assert_eq!(
            executed,
            vec![
                "CREATE SEQUENCE IF NOT EXISTS \"users_id_seq\"",
                "ALTER TABLE \"users\" ALTER COLUMN \"id\" SET DEFAULT nextval('users_id_seq')",
                "ALTER SEQUENCE \"users_id_seq\" OWNED BY \"users\".\"id\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_update_sequence_resolves_live_name() {
        let exec = MockExecutor::new()
            .expect_query(name_row("public"))
            .expect_query(name_row("nextval('users_id_seq'::regclass)"));
        let m = Migrator::new(exec, DialectKind::Postgres);
        m.update_sequence(&users(), "id", 100).await.unwrap();

        assert_eq!(
            m.executor().executed_sql(),
            vec!["ALTER SEQUENCE \"users_id_seq\" RESTART WITH 100"]
        );
    }

    #[tokio::test]
    async fn test_update_sequence_rejects_unparsable_default() {
        let exec = MockExecutor::new()
            .expect_query(name_row("public"))
            .expect_query(name_row("42"));
        let m = Migrator::new(exec, DialectKind::Postgres);
        let err = m.update_sequence(&users(), "id", 100).await.unwrap_err();
        assert!(matches!(err, MigrateError::SequenceDefault { .. }));
    }

    #[tokio::test]
    async fn test_table_type_missing_table() {
        let exec = MockExecutor::new().expect_query(name_row("shop"));
        let m = Migrator::new(exec, DialectKind::MySql);
        let err = m.table_type("ghost").await.unwrap_err();
        assert!(matches!(err, MigrateError::UnknownTable(_)));
    }
}
