//! Database execution seam.
//!
//! The migrator talks to the database through [`SqlExecutor`], a minimal
//! execute/query capability. [`AnyExecutor`] adapts a `sqlx` [`AnyPool`]
//! to it; tests script their own implementation.

use sqlport_core::dialect::Dialect;
use sqlport_core::{BuiltStatement, SqlValue};
use sqlx::any::AnyRow;
use sqlx::AnyPool;
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Minimal execution capability required by the migrator.
#[allow(async_fn_in_trait)]
pub trait SqlExecutor {
    /// Executes a statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Runs a query, returning all rows as positional values.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Vec<SqlValue>>>;
}

/// [`SqlExecutor`] backed by a `sqlx` any-driver pool.
#[derive(Debug, Clone)]
pub struct AnyExecutor {
    pool: AnyPool,
}

impl AnyExecutor {
    /// Wraps a pool.
    #[must_use]
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Blob(v) => query.bind(v.clone()),
        };
    }
    query
}

fn decode_row(row: &AnyRow) -> Result<Vec<SqlValue>> {
    let mut values = Vec::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name().to_uppercase();
        let value = match type_name.as_str() {
            "BOOL" | "BOOLEAN" | "BIT" => row
                .try_get::<Option<bool>, _>(i)?
                .map_or(SqlValue::Null, SqlValue::Bool),
            "TINYINT" | "SMALLINT" | "INT" | "INTEGER" | "MEDIUMINT" | "BIGINT" | "INT2"
            | "INT4" | "INT8" => row
                .try_get::<Option<i64>, _>(i)?
                .map_or(SqlValue::Null, SqlValue::Int),
            "REAL" | "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT4" | "FLOAT8" => row
                .try_get::<Option<f64>, _>(i)?
                .map_or(SqlValue::Null, SqlValue::Float),
            "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" => row
                .try_get::<Option<Vec<u8>>, _>(i)?
                .map_or(SqlValue::Null, SqlValue::Blob),
            _ => row
                .try_get::<Option<String>, _>(i)?
                .map_or(SqlValue::Null, SqlValue::Text),
        };
        values.push(value);
    }
    Ok(values)
}

impl SqlExecutor for AnyExecutor {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        debug!(sql = %sql, "Executing SQL");
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrateError::Execution {
                sql: sql.to_string(),
                message: e.to_string(),
            })?;
        Ok(result.rows_affected())
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Vec<SqlValue>>> {
        debug!(sql = %sql, "Querying SQL");
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }
}

/// Sequences statements with first-error gating.
///
/// Once a statement fails, later statements are skipped and the captured
/// error is returned from [`StatementRunner::finish`]. Dry-run mode
/// collects SQL text without touching the database. No-op statements are
/// skipped without reporting an affected count.
pub struct StatementRunner<'e, E> {
    exec: &'e E,
    dry_run: bool,
    error: Option<MigrateError>,
    captured: Vec<String>,
}

impl<'e, E: SqlExecutor> StatementRunner<'e, E> {
    /// Creates a runner over an executor.
    pub fn new(exec: &'e E) -> Self {
        Self {
            exec,
            dry_run: false,
            error: None,
            captured: Vec::new(),
        }
    }

    /// Enables dry-run mode (SQL is collected but not executed).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Runs one statement. Returns the affected row count, or `None`
    /// when the statement was skipped: an empty statement, dry-run
    /// mode, or an earlier failure gating the rest of the batch.
    ///
    /// `None` is never an error by itself. A skipped no-op touches
    /// zero rows; execution failures are held and surface through
    /// [`StatementRunner::finish`].
    pub async fn run(&mut self, stmt: &BuiltStatement) -> Option<u64> {
        if stmt.is_empty() || self.error.is_some() {
            return None;
        }
        if self.dry_run {
            self.captured.push(stmt.sql.clone());
            return None;
        }
        match self.exec.execute(&stmt.sql, &stmt.params).await {
            Ok(affected) => Some(affected),
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }

    /// Runs a bare SQL string with no parameters.
    pub async fn run_sql(&mut self, sql: &str) -> Option<u64> {
        let stmt = BuiltStatement {
            sql: sql.to_string(),
            params: Vec::new(),
        };
        self.run(&stmt).await
    }

    /// Places a savepoint, for engines where a migration step needs a
    /// partial rollback inside an open transaction.
    pub async fn savepoint(&mut self, dialect: &dyn Dialect, name: &str) -> Option<u64> {
        self.run_sql(&dialect.savepoint_sql(name)).await
    }

    /// Rolls back to a previously placed savepoint.
    pub async fn rollback_to(&mut self, dialect: &dyn Dialect, name: &str) -> Option<u64> {
        self.run_sql(&dialect.rollback_to_savepoint_sql(name)).await
    }

    /// Whether an earlier statement failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// SQL collected in dry-run mode.
    #[must_use]
    pub fn captured(&self) -> &[String] {
        &self.captured
    }

    /// Consumes the runner, yielding the first failure if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExecutor;

    #[tokio::test]
    async fn test_runner_skips_noop_statements() {
        let exec = MockExecutor::new();
        let mut runner = StatementRunner::new(&exec);
        assert_eq!(runner.run(&BuiltStatement::empty()).await, None);
        runner.finish().unwrap();
        assert!(exec.executed().is_empty());
    }

    #[tokio::test]
    async fn test_runner_gates_after_first_failure() {
        let exec = MockExecutor::new().fail_on("DROP TABLE");
        let mut runner = StatementRunner::new(&exec);
        assert!(runner.run_sql("CREATE TABLE t (a int)").await.is_some());
        assert!(runner.run_sql("DROP TABLE t").await.is_none());
        assert!(runner.run_sql("CREATE TABLE u (a int)").await.is_none());

        assert!(runner.failed());
        assert!(runner.finish().is_err());
        // The gated statement never reached the executor.
        assert_eq!(exec.executed().len(), 2);
    }

    #[tokio::test]
    async fn test_runner_executes_planned_upsert() {
        use sqlport_core::prelude::*;

        let table = TableDescriptor::new("settings")
            .column(ColumnDescriptor::new("key", FieldKind::String).primary_key())
            .column(ColumnDescriptor::new("value", FieldKind::String));
        let spec = UpsertSpec::new(
            vec!["key".into(), "value".into()],
            vec![vec![
                SqlValue::Text("theme".into()),
                SqlValue::Text("dark".into()),
            ]],
        )
        .on_conflict(OnConflict::do_update(vec![Assignment::proposed("value")]));
        let stmt = plan_insert(&table, &spec, DialectKind::Postgres.dialect()).unwrap();

        let exec = MockExecutor::new();
        let mut runner = StatementRunner::new(&exec);
        assert_eq!(runner.run(&stmt).await, Some(1));
        runner.finish().unwrap();

        let (sql, params) = &exec.executed()[0];
        assert_eq!(
            sql,
            "INSERT INTO \"settings\" (\"key\",\"value\") VALUES ($1,$2) \
             ON CONFLICT (\"key\") DO UPDATE SET \"value\"=excluded.\"value\""
        );
        assert_eq!(params.len(), 2);
    }

    #[tokio::test]
    async fn test_runner_savepoint_text() {
        use sqlport_core::dialect::DialectKind;

        let exec = MockExecutor::new();
        let mut runner = StatementRunner::new(&exec);
        let d = DialectKind::Postgres.dialect();
        runner.savepoint(d, "before_indexes").await;
        runner.rollback_to(d, "before_indexes").await;
        runner.finish().unwrap();

        assert_eq!(
            exec.executed_sql(),
            vec![
                "SAVEPOINT before_indexes",
                "ROLLBACK TO SAVEPOINT before_indexes",
            ]
        );
    }

    #[tokio::test]
    async fn test_runner_dry_run_collects_sql() {
        let exec = MockExecutor::new();
        let mut runner = StatementRunner::new(&exec).dry_run(true);
        runner.run_sql("CREATE TABLE t (a int)").await;
        runner.run_sql("DROP TABLE t").await;

        assert_eq!(runner.captured().len(), 2);
        assert!(exec.executed().is_empty());
        runner.finish().unwrap();
    }
}
