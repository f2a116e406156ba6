//! Structured statement model.
//!
//! A statement under construction is a set of named clauses plus an
//! ordered parameter list. Clause names are unique within a statement
//! and the final SQL text is produced in a fixed priority order, not in
//! insertion order. Placeholder positions are tracked internally by
//! [`SqlWriter`]; callers never splice values into SQL text.

use crate::dialect::{Dialect, Placeholder};
use crate::value::SqlValue;

/// Fixed clause build order. Clauses absent from a statement are
/// skipped; clauses are never rendered in insertion order.
pub const BUILD_ORDER: &[&str] = &[
    "INSERT",
    "UPDATE",
    "SET",
    "VALUES",
    "ON CONFLICT",
    "WHERE",
    "RETURNING",
];

/// Right-hand side of an update assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignValue {
    /// A bound parameter value.
    Value(SqlValue),
    /// A column of the target row (self-reference).
    Column(String),
    /// A column of the proposed (excluded/new) row. Rendered per dialect:
    /// `VALUES(col)`, `excluded.col` or a source-alias qualifier.
    Proposed(String),
}

/// One `column = value` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target column.
    pub column: String,
    /// Assigned value.
    pub value: AssignValue,
}

impl Assignment {
    /// Assigns a bound value to `column`.
    #[must_use]
    pub fn value(column: impl Into<String>, value: SqlValue) -> Self {
        Self {
            column: column.into(),
            value: AssignValue::Value(value),
        }
    }

    /// Assigns the proposed row's value of the same column.
    #[must_use]
    pub fn proposed(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            value: AssignValue::Proposed(column.clone()),
            column,
        }
    }

    /// Self-assignment, used to keep a conflict update syntactically an
    /// update without changing the row.
    #[must_use]
    pub fn self_assign(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            value: AssignValue::Column(column.clone()),
            column,
        }
    }
}

/// Conflict resolution requested for an insert.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    /// Keep the existing row untouched.
    DoNothing,
    /// Update the existing row with the given assignments.
    DoUpdate(Vec<Assignment>),
}

/// A named statement fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `INSERT INTO table (columns)`.
    Insert {
        /// Target table.
        table: String,
        /// Insert column list.
        columns: Vec<String>,
    },
    /// `UPDATE table`.
    Update {
        /// Target table.
        table: String,
    },
    /// `SET a = ?, b = ?`.
    Set(Vec<Assignment>),
    /// `VALUES (?, ?), (?, ?)`.
    Values {
        /// Value rows; every row must match the insert column list.
        rows: Vec<Vec<SqlValue>>,
    },
    /// Dialect-specific conflict clause.
    OnConflict {
        /// Conflict target columns (resolved, never empty).
        target: Vec<String>,
        /// Requested action.
        action: ConflictAction,
    },
    /// `WHERE predicate` with its bound parameters.
    Where {
        /// Predicate body with `?` markers already positioned by the
        /// writer when rendered.
        predicate: String,
        /// Parameters bound by the predicate.
        params: Vec<SqlValue>,
    },
    /// `RETURNING columns`.
    Returning {
        /// Returned columns.
        columns: Vec<String>,
    },
}

impl Clause {
    /// The clause name used for uniqueness and build ordering.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "INSERT",
            Self::Update { .. } => "UPDATE",
            Self::Set(_) => "SET",
            Self::Values { .. } => "VALUES",
            Self::OnConflict { .. } => "ON CONFLICT",
            Self::Where { .. } => "WHERE",
            Self::Returning { .. } => "RETURNING",
        }
    }
}

/// Finished SQL text plus its ordered parameter list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltStatement {
    /// Final SQL text. Empty for a no-op statement.
    pub sql: String,
    /// Positional parameters in bind order.
    pub params: Vec<SqlValue>,
}

impl BuiltStatement {
    /// A no-op statement; executing it reports zero rows affected.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this statement is a no-op.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// SQL text buffer with an internal parameter accumulator.
///
/// Identifier quoting and placeholder style come from the dialect; the
/// writer tracks placeholder positions itself.
pub struct SqlWriter<'d> {
    dialect: &'d dyn Dialect,
    sql: String,
    params: Vec<SqlValue>,
}

impl<'d> SqlWriter<'d> {
    /// Creates an empty writer for the given dialect.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Appends raw SQL text (keywords and punctuation only).
    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Appends a quoted identifier.
    pub fn ident(&mut self, name: &str) {
        let quoted = self.dialect.quote_identifier(name);
        self.sql.push_str(&quoted);
    }

    /// Appends a comma-separated quoted identifier list.
    pub fn ident_list(&mut self, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.sql.push(',');
            }
            self.ident(name);
        }
    }

    /// Binds a parameter and appends its placeholder.
    pub fn bind(&mut self, value: SqlValue) {
        self.params.push(value);
        match self.dialect.placeholder() {
            Placeholder::Question => self.sql.push('?'),
            Placeholder::Dollar => {
                self.sql.push('$');
                self.sql.push_str(&self.params.len().to_string());
            }
        }
    }

    /// Appends an assignment (`col = value`).
    pub fn assignment(&mut self, assignment: &Assignment) {
        self.ident(&assignment.column);
        self.push("=");
        match &assignment.value {
            AssignValue::Value(v) => self.bind(v.clone()),
            AssignValue::Column(c) => self.ident(c),
            AssignValue::Proposed(c) => self.dialect.write_proposed_ref(self, c),
        }
    }

    /// SQL text written so far.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Consumes the writer into a finished statement.
    #[must_use]
    pub fn finish(self) -> BuiltStatement {
        BuiltStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// A statement under construction: clause name -> clause, build order
/// fixed by [`BUILD_ORDER`].
#[derive(Debug, Clone, Default)]
pub struct Statement {
    clauses: Vec<Clause>,
}

impl Statement {
    /// Creates an empty statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause, replacing any clause of the same name.
    pub fn add_clause(&mut self, clause: Clause) {
        if let Some(existing) = self.clauses.iter_mut().find(|c| c.name() == clause.name()) {
            *existing = clause;
        } else {
            self.clauses.push(clause);
        }
    }

    /// Looks up a clause by name.
    #[must_use]
    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.name() == name)
    }

    /// Renders the statement in build order.
    #[must_use]
    pub fn build(&self, dialect: &dyn Dialect) -> BuiltStatement {
        let mut w = SqlWriter::new(dialect);
        for name in BUILD_ORDER {
            let Some(clause) = self.clause(name) else {
                continue;
            };
            if !w.sql.is_empty() {
                w.push(" ");
            }
            render_clause(&mut w, clause, dialect);
        }
        w.finish()
    }
}

fn render_clause(w: &mut SqlWriter<'_>, clause: &Clause, dialect: &dyn Dialect) {
    match clause {
        Clause::Insert { table, columns } => {
            w.push("INSERT INTO ");
            w.ident(table);
            if !columns.is_empty() {
                w.push(" (");
                w.ident_list(columns);
                w.push(")");
            }
        }
        Clause::Update { table } => {
            w.push("UPDATE ");
            w.ident(table);
        }
        Clause::Set(assignments) => {
            w.push("SET ");
            for (i, a) in assignments.iter().enumerate() {
                if i > 0 {
                    w.push(",");
                }
                w.assignment(a);
            }
        }
        Clause::Values { rows } => {
            w.push("VALUES ");
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    w.push(",");
                }
                w.push("(");
                for (j, value) in row.iter().enumerate() {
                    if j > 0 {
                        w.push(",");
                    }
                    w.bind(value.clone());
                }
                w.push(")");
            }
        }
        Clause::OnConflict { target, action } => {
            dialect.write_conflict_clause(w, target, action);
        }
        Clause::Where { predicate, params } => {
            // Predicate text carries `?` markers; re-emit them through the
            // writer so positional dialects stay numbered correctly.
            w.push("WHERE ");
            let mut values = params.iter();
            for ch in predicate.chars() {
                if ch == '?' {
                    let value = values.next().cloned().unwrap_or(SqlValue::Null);
                    w.bind(value);
                } else {
                    w.sql.push(ch);
                }
            }
        }
        Clause::Returning { columns } => {
            w.push("RETURNING ");
            w.ident_list(columns);
        }
    }
}
