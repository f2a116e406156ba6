//! Schema descriptor types.
//!
//! Descriptors describe what the application declares a table to look
//! like. They are derived once from the schema declaration and stay
//! immutable for the life of the process; the live catalog side of the
//! picture lives in `sqlport-migrate`.

use serde::{Deserialize, Serialize};

/// Abstract column kind, resolved to a native type by each dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Boolean.
    Bool,
    /// Signed integer; width selected by [`ColumnDescriptor::size`].
    Int,
    /// Unsigned integer.
    Uint,
    /// Floating point or fixed-point decimal.
    Float,
    /// Character string.
    String,
    /// Date/time value.
    Time,
    /// Byte array.
    Bytes,
    /// Raw dialect type passed through unchanged.
    Custom(String),
}

/// Declared shape of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Abstract kind.
    pub kind: FieldKind,
    /// Bit size for numeric kinds, character/byte length otherwise.
    pub size: u32,
    /// Numeric precision (0 = unspecified).
    pub precision: u32,
    /// Numeric scale.
    pub scale: u32,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Default expression, if any.
    pub default: Option<String>,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
    /// Whether this column auto-increments.
    pub auto_increment: bool,
    /// Whether this column carries a single-column UNIQUE constraint.
    pub unique: bool,
    /// Whether this column is covered by a declared index.
    pub indexed: bool,
    /// Column comment.
    pub comment: Option<String>,
}

impl ColumnDescriptor {
    /// Creates a new column descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: 0,
            precision: 0,
            scale: 0,
            nullable: true,
            default: None,
            primary_key: false,
            auto_increment: false,
            unique: false,
            indexed: false,
            comment: None,
        }
    }

    /// Sets the bit size / length.
    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Sets numeric precision and scale.
    #[must_use]
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Marks the column as primary key. Primary keys are NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the column UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as covered by an index.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Whether the column participates in any key or index.
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.primary_key || self.unique || self.indexed
    }
}

/// One column entry of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Sort direction (`ASC`/`DESC`), if declared.
    pub sort: Option<String>,
    /// Collation, if declared.
    pub collate: Option<String>,
    /// Raw index expression overriding the column reference.
    pub expression: Option<String>,
}

impl IndexColumn {
    /// Creates a plain index column entry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: None,
            collate: None,
            expression: None,
        }
    }

    /// Sets the sort direction.
    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }
}

/// Declared shape of an index. `(table, name)` identifies an index
/// uniquely within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name.
    pub name: String,
    /// Ordered column list.
    pub columns: Vec<IndexColumn>,
    /// Whether this is a UNIQUE index.
    pub unique: bool,
    /// Index class (e.g. `FULLTEXT`), rendered before `INDEX`.
    pub class: Option<String>,
    /// Access method (e.g. `btree`, `gin`), rendered as `USING`.
    pub method: Option<String>,
    /// Partial-index predicate (WHERE clause body).
    pub predicate: Option<String>,
}

impl IndexDescriptor {
    /// Creates a new index over the named columns.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<IndexColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
            class: None,
            method: None,
            predicate: None,
        }
    }

    /// Marks the index UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index class.
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Sets the access method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the partial-index predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Column names covered by the index.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Constraint payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Foreign key constraint.
    ForeignKey {
        /// Columns in the owning table.
        columns: Vec<String>,
        /// Referenced table.
        references_table: String,
        /// Referenced columns.
        references_columns: Vec<String>,
        /// ON DELETE action, if declared.
        on_delete: Option<String>,
        /// ON UPDATE action, if declared.
        on_update: Option<String>,
    },
    /// Check constraint.
    Check {
        /// Check expression body.
        expression: String,
    },
}

/// Declared constraint; name uniqueness is scoped to the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    /// Constraint name.
    pub name: String,
    /// Constraint payload.
    pub kind: ConstraintKind,
}

/// Declared shape of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name, optionally schema-qualified (`schema.table`).
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDescriptor>,
    /// Declared indexes.
    pub indexes: Vec<IndexDescriptor>,
    /// Declared constraints.
    pub constraints: Vec<ConstraintDescriptor>,
}

impl TableDescriptor {
    /// Creates an empty table descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index and marks its member columns as indexed.
    #[must_use]
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        for name in index.column_names() {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name == name) {
                col.indexed = true;
            }
        }
        self.indexes.push(index);
        self
    }

    /// Adds a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: ConstraintDescriptor) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Looks up a constraint by name.
    #[must_use]
    pub fn get_constraint(&self, name: &str) -> Option<&ConstraintDescriptor> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Primary key columns in declaration order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// First primary key column, if any.
    #[must_use]
    pub fn first_primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Whether `columns` exactly covers a declared unique key (a unique
    /// column or the column set of a unique index), order-insensitive.
    #[must_use]
    pub fn covers_unique_key(&self, columns: &[String]) -> bool {
        if columns.len() == 1 {
            if let Some(col) = self.get_column(&columns[0]) {
                if col.unique {
                    return true;
                }
            }
        }
        self.indexes.iter().any(|idx| {
            idx.unique
                && idx.columns.len() == columns.len()
                && idx.column_names().all(|n| columns.iter().any(|c| c == n))
        })
    }

    /// Whether the named column is a member of any unique key.
    #[must_use]
    pub fn is_unique_member(&self, name: &str) -> bool {
        if self.get_column(name).is_some_and(|c| c.unique) {
            return true;
        }
        self.indexes
            .iter()
            .any(|idx| idx.unique && idx.column_names().any(|n| n == name))
    }

    /// Table name without its schema qualifier.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builder() {
        let col = ColumnDescriptor::new("id", FieldKind::Uint)
            .size(64)
            .primary_key()
            .auto_increment();
        assert!(col.primary_key);
        assert!(!col.nullable);
        assert!(col.auto_increment);
        assert!(col.is_keyed());
    }

    #[test]
    fn test_index_marks_columns() {
        let table = TableDescriptor::new("users")
            .column(ColumnDescriptor::new("email", FieldKind::String))
            .index(IndexDescriptor::new(
                "idx_users_email",
                vec![IndexColumn::new("email")],
            ));
        assert!(table.get_column("email").unwrap().indexed);
    }

    #[test]
    fn test_covers_unique_key() {
        let table = TableDescriptor::new("users")
            .column(ColumnDescriptor::new("id", FieldKind::Int).primary_key())
            .column(ColumnDescriptor::new("email", FieldKind::String).unique())
            .column(ColumnDescriptor::new("org", FieldKind::String))
            .column(ColumnDescriptor::new("slug", FieldKind::String))
            .index(
                IndexDescriptor::new(
                    "idx_org_slug",
                    vec![IndexColumn::new("org"), IndexColumn::new("slug")],
                )
                .unique(),
            );

        assert!(table.covers_unique_key(&["email".into()]));
        assert!(table.covers_unique_key(&["slug".into(), "org".into()]));
        assert!(!table.covers_unique_key(&["org".into()]));
        assert!(table.is_unique_member("org"));
        assert!(!table.is_unique_member("id"));
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(TableDescriptor::new("app.users").bare_name(), "users");
        assert_eq!(TableDescriptor::new("users").bare_name(), "users");
    }
}
