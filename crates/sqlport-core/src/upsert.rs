//! Insert/upsert planner.
//!
//! [`plan_insert`] turns an abstract insert request into one dialect's
//! SQL. Engines with a native conflict clause get `INSERT ... ON
//! DUPLICATE KEY UPDATE` / `INSERT ... ON CONFLICT`; engines without one
//! get a synthesized `MERGE INTO` whose source is a `UNION` of the value
//! rows selected from the dialect's dummy table.

use crate::dialect::{Dialect, UpsertStyle};
use crate::error::{DialectError, Result};
use crate::schema::TableDescriptor;
use crate::statement::{
    Assignment, BuiltStatement, Clause, ConflictAction, SqlWriter, Statement,
};
use crate::value::SqlValue;

/// Conflict handling requested for an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    /// Conflict target columns. Empty means "the primary key".
    pub target: Vec<String>,
    /// Action to take when the target collides.
    pub action: ConflictAction,
}

impl OnConflict {
    /// Keep existing rows untouched on collision of the primary key.
    #[must_use]
    pub fn do_nothing() -> Self {
        Self {
            target: Vec::new(),
            action: ConflictAction::DoNothing,
        }
    }

    /// Update existing rows on collision of the primary key.
    #[must_use]
    pub fn do_update(assignments: Vec<Assignment>) -> Self {
        Self {
            target: Vec::new(),
            action: ConflictAction::DoUpdate(assignments),
        }
    }

    /// Restricts the conflict target to the given columns.
    #[must_use]
    pub fn target(mut self, columns: Vec<String>) -> Self {
        self.target = columns;
        self
    }
}

/// Abstract multi-row insert request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertSpec {
    /// Insert column list.
    pub columns: Vec<String>,
    /// Value rows; each row must match the column list arity.
    pub rows: Vec<Vec<SqlValue>>,
    /// Conflict handling; `None` plans a plain insert.
    pub on_conflict: Option<OnConflict>,
}

impl UpsertSpec {
    /// Creates a plain insert request.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            on_conflict: None,
        }
    }

    /// Attaches conflict handling.
    #[must_use]
    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }
}

/// Resolves a requested conflict target against the table's keys.
///
/// An empty target defaults to the primary key. A target that exactly
/// covers a declared unique key is taken as-is; otherwise the missing
/// primary-key columns are appended. The resolved set must identify a
/// key, so the resolution is idempotent: feeding a resolved target back
/// in returns it unchanged.
pub fn resolve_conflict_target(
    table: &TableDescriptor,
    requested: &[String],
) -> Result<Vec<String>> {
    for name in requested {
        if table.get_column(name).is_none() {
            return Err(DialectError::UnknownColumn {
                table: table.name.clone(),
                column: name.clone(),
            });
        }
    }

    let pk: Vec<String> = table
        .primary_key_columns()
        .iter()
        .map(|c| c.name.clone())
        .collect();

    if requested.is_empty() {
        if pk.is_empty() {
            return Err(DialectError::MissingConflictTarget {
                table: table.name.clone(),
            });
        }
        return Ok(pk);
    }

    if table.covers_unique_key(requested) {
        return Ok(requested.to_vec());
    }

    let mut resolved = requested.to_vec();
    for name in &pk {
        if !resolved.contains(name) {
            resolved.push(name.clone());
        }
    }

    for name in &resolved {
        let is_pk = pk.contains(name);
        if !is_pk && !table.is_unique_member(name) {
            return Err(DialectError::ConflictTargetNotKey {
                table: table.name.clone(),
                column: name.clone(),
            });
        }
    }
    if pk.is_empty() && !table.covers_unique_key(&resolved) {
        return Err(DialectError::MissingConflictTarget {
            table: table.name.clone(),
        });
    }
    Ok(resolved)
}

/// Plans a multi-row insert for the given dialect.
///
/// Zero rows plan to [`BuiltStatement::empty`]. An auto-increment
/// primary-key column whose value is NULL in every row is dropped from
/// the column list so the engine generates it.
pub fn plan_insert(
    table: &TableDescriptor,
    spec: &UpsertSpec,
    dialect: &dyn Dialect,
) -> Result<BuiltStatement> {
    if spec.rows.is_empty() {
        return Ok(BuiltStatement::empty());
    }
    for (i, row) in spec.rows.iter().enumerate() {
        if row.len() != spec.columns.len() {
            return Err(DialectError::RowArity {
                row: i,
                got: row.len(),
                want: spec.columns.len(),
            });
        }
    }

    let (columns, rows) = strip_generated_key(table, &spec.columns, &spec.rows);

    let Some(on_conflict) = &spec.on_conflict else {
        return Ok(plain_insert(&table.name, &columns, rows, dialect));
    };

    let target = resolve_conflict_target(table, &on_conflict.target)?;
    for name in &target {
        if !columns.contains(name) {
            return Err(DialectError::ConflictColumnNotInserted {
                column: name.clone(),
            });
        }
    }

    match dialect.upsert_style() {
        UpsertStyle::OnDuplicateKey | UpsertStyle::OnConflict => {
            let action = native_action(table, &target, dialect, &on_conflict.action);
            let mut stmt = Statement::new();
            stmt.add_clause(Clause::Insert {
                table: table.name.clone(),
                columns,
            });
            stmt.add_clause(Clause::Values { rows });
            stmt.add_clause(Clause::OnConflict { target, action });
            Ok(stmt.build(dialect))
        }
        UpsertStyle::Merge => Ok(merge_insert(
            table,
            &columns,
            rows,
            &target,
            &on_conflict.action,
            dialect,
        )),
    }
}

fn plain_insert(
    table: &str,
    columns: &[String],
    rows: Vec<Vec<SqlValue>>,
    dialect: &dyn Dialect,
) -> BuiltStatement {
    let mut stmt = Statement::new();
    stmt.add_clause(Clause::Insert {
        table: table.into(),
        columns: columns.to_vec(),
    });
    stmt.add_clause(Clause::Values { rows });
    stmt.build(dialect)
}

/// Drops an auto-increment primary-key column from the insert when
/// every row leaves it NULL, so the engine fills it in.
fn strip_generated_key(
    table: &TableDescriptor,
    columns: &[String],
    rows: &[Vec<SqlValue>],
) -> (Vec<String>, Vec<Vec<SqlValue>>) {
    let dropped: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(i, name)| {
            table
                .get_column(name)
                .is_some_and(|c| c.primary_key && c.auto_increment)
                && rows.iter().all(|row| row[*i].is_null())
        })
        .map(|(i, _)| i)
        .collect();
    if dropped.is_empty() {
        return (columns.to_vec(), rows.to_vec());
    }

    let keep = |i: &usize| !dropped.contains(i);
    let columns = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| keep(i))
        .map(|(_, c)| c.clone())
        .collect();
    let rows = rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(i, _)| keep(i))
                .map(|(_, v)| v.clone())
                .collect()
        })
        .collect();
    (columns, rows)
}

/// `DO NOTHING` has no direct spelling under `ON DUPLICATE KEY UPDATE`,
/// and an update with no assignments is not valid SQL on any engine. Both
/// degrade to a self-assignment of a key column, which updates nothing.
fn native_action(
    table: &TableDescriptor,
    target: &[String],
    dialect: &dyn Dialect,
    action: &ConflictAction,
) -> ConflictAction {
    let noop = || {
        let column = table
            .first_primary_key()
            .map_or_else(|| target[0].clone(), |c| c.name.clone());
        ConflictAction::DoUpdate(vec![Assignment::self_assign(column)])
    };
    match action {
        ConflictAction::DoNothing => {
            if dialect.upsert_style() == UpsertStyle::OnDuplicateKey {
                noop()
            } else {
                ConflictAction::DoNothing
            }
        }
        ConflictAction::DoUpdate(assignments) if assignments.is_empty() => noop(),
        other => other.clone(),
    }
}

/// Synthesizes `MERGE INTO ... USING (...) AS excluded ON (...) WHEN
/// [NOT] MATCHED ...` for dialects without a native conflict clause.
fn merge_insert(
    table: &TableDescriptor,
    columns: &[String],
    rows: Vec<Vec<SqlValue>>,
    target: &[String],
    action: &ConflictAction,
    dialect: &dyn Dialect,
) -> BuiltStatement {
    let dummy = dialect.dummy_table().unwrap_or("DUAL");
    let mut w = SqlWriter::new(dialect);

    w.push("MERGE INTO ");
    w.ident(&table.name);
    w.push(" USING (");
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            w.push(" UNION ");
        }
        w.push("SELECT ");
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                w.push(",");
            }
            w.bind(value.clone());
            // Column aliases on the first branch name the source columns.
            if i == 0 {
                w.push(" AS ");
                w.ident(&columns[j]);
            }
        }
        w.push(" FROM ");
        w.push(dummy);
    }
    w.push(") AS ");
    w.push(dialect.merge_source_alias());
    w.push(" ON (");
    for (i, name) in target.iter().enumerate() {
        if i > 0 {
            w.push(" AND ");
        }
        w.ident(&table.name);
        w.push(".");
        w.ident(name);
        w.push(" = ");
        dialect.write_proposed_ref(&mut w, name);
    }
    w.push(")");

    // Join keys never appear in the MATCHED branch; assigning them is
    // invalid under MERGE.
    let assignments: Vec<&Assignment> = match action {
        ConflictAction::DoNothing => Vec::new(),
        ConflictAction::DoUpdate(a) => {
            a.iter().filter(|a| !target.contains(&a.column)).collect()
        }
    };
    if !assignments.is_empty() {
        w.push(" WHEN MATCHED THEN UPDATE SET ");
        for (i, a) in assignments.iter().enumerate() {
            if i > 0 {
                w.push(",");
            }
            w.assignment(a);
        }
    }

    // Identity columns never appear in the insert branch; the engine
    // generates them even when the source carries an explicit value.
    let inserted: Vec<&String> = columns
        .iter()
        .filter(|name| {
            !table
                .get_column(name)
                .is_some_and(|c| c.primary_key && c.auto_increment)
        })
        .collect();
    w.push(" WHEN NOT MATCHED THEN INSERT (");
    for (i, name) in inserted.iter().enumerate() {
        if i > 0 {
            w.push(",");
        }
        w.ident(name);
    }
    w.push(") VALUES (");
    for (i, name) in inserted.iter().enumerate() {
        if i > 0 {
            w.push(",");
        }
        dialect.write_proposed_ref(&mut w, name);
    }
    w.push(")");
    w.finish()
}
