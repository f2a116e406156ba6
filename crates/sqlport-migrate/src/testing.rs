//! Scripted executor for migrator tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use sqlport_core::SqlValue;

use crate::error::{MigrateError, Result};
use crate::executor::SqlExecutor;

/// In-memory [`SqlExecutor`] that records statements and replays
/// scripted query results in FIFO order.
pub(crate) struct MockExecutor {
    executed: Mutex<Vec<(String, Vec<SqlValue>)>>,
    queries: Mutex<Vec<String>>,
    results: Mutex<VecDeque<Vec<Vec<SqlValue>>>>,
    fail_on: Vec<String>,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
            fail_on: Vec::new(),
        }
    }

    /// Fails any statement whose SQL contains `fragment`.
    pub(crate) fn fail_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on.push(fragment.into());
        self
    }

    /// Queues one query result.
    pub(crate) fn expect_query(self, rows: Vec<Vec<SqlValue>>) -> Self {
        self.results.lock().unwrap().push_back(rows);
        self
    }

    /// Statements attempted so far, including failed ones.
    pub(crate) fn executed(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.executed.lock().unwrap().clone()
    }

    /// SQL text of attempted statements.
    pub(crate) fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|(sql, _)| sql).collect()
    }

    /// SQL text of issued queries.
    pub(crate) fn queried_sql(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn check_fail(&self, sql: &str) -> Result<()> {
        for fragment in &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(MigrateError::Execution {
                    sql: sql.to_string(),
                    message: format!("scripted failure on {fragment:?}"),
                });
            }
        }
        Ok(())
    }
}

impl SqlExecutor for MockExecutor {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        self.check_fail(sql)?;
        Ok(1)
    }

    async fn query(&self, sql: &str, _params: &[SqlValue]) -> Result<Vec<Vec<SqlValue>>> {
        self.queries.lock().unwrap().push(sql.to_string());
        self.check_fail(sql)?;
        Ok(self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}
