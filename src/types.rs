//! Core data model types for a conversion run.
//!
//! Source files are discovered as [`FileIndex`] keys, parsed into [`ParsedTable`]s, bound to a
//! logical table by a [`TableAssociation`], and finally described by one [`TableDefinition`]
//! per logical table name.

use std::fmt;

/// Relative path of a source file (from its scan root) with the extension stripped.
///
/// Always uses `/` separators and never has a leading or trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileIndex(String);

impl FileIndex {
    /// Build an index from a relative path string, normalizing separators.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().replace('\\', "/");
        Self(normalized.trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate `/`-delimited path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for FileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rectangular-ish grid of text cells, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row at 1-based position `n`, if present.
    pub fn row(&self, n: usize) -> Option<&[String]> {
        n.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }
}

/// Logical column type, declared in header files by a small token vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Non-null text (the default for unknown tokens).
    Text,
    /// Text where an empty cell means SQL `NULL`.
    NullableText,
    /// Timestamp, stored as ISO-8601 text with an explicit offset.
    DateTime,
    /// 64-bit integer.
    Integer,
    /// Floating point number.
    Numeric,
}

impl ColumnType {
    /// Map a declared type token to a column type.
    ///
    /// `time` → DateTime, `int` → Integer, `float` → Numeric, `null_string` → NullableText,
    /// anything else → Text.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "time" => Self::DateTime,
            "int" => Self::Integer,
            "float" => Self::Numeric,
            "null_string" => Self::NullableText,
            _ => Self::Text,
        }
    }

    /// SQL type declaration used in `CREATE TABLE`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::DateTime => "TEXT NOT NULL",
            Self::Integer => "INTEGER NOT NULL",
            Self::Numeric => "NUMERIC NOT NULL",
            Self::NullableText => "TEXT NULL",
            Self::Text => "TEXT NOT NULL",
        }
    }
}

/// A named, typed column of a [`TableDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A column whose value is taken from a path segment rather than from file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardColumn {
    /// Parameter name from the path template (not yet normalized).
    pub name: String,
    pub column_type: ColumnType,
    /// Literal path segment value.
    pub value: String,
}

/// `FOREIGN KEY (column) REFERENCES reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    /// Verbatim reference target, e.g. `Users(Id)`.
    pub reference: String,
}

/// Key and constraint metadata attached to a logical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
    pub index_keys: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
}

/// Binds a discovered file to its logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAssociation {
    pub index: FileIndex,
    /// Canonical logical table name.
    pub name: String,
    pub shard_columns: Vec<ShardColumn>,
    pub options: CreateOptions,
}

/// A parsed source file together with its association.
#[derive(Debug, Clone)]
pub struct AssociatedTable {
    pub association: TableAssociation,
    pub table: ParsedTable,
}

/// Merged schema of one logical table.
///
/// Columns are shard columns first, then header columns, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<Column>,
    pub options: CreateOptions,
}

/// One SQL statement (possibly a `;`-joined batch) attributed to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub table: String,
    pub sql: String,
}

impl Statement {
    pub fn new(table: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            sql: sql.into(),
        }
    }
}

/// Normalize a path-like or header string into a camel-style SQL identifier.
///
/// Path separators become underscores first, so `data/widgets` and `data_widgets` both map
/// to `DataWidgets`.
pub fn camel_identifier(raw: &str) -> String {
    use convert_case::{Case, Casing};

    raw.trim().replace('/', "_").to_case(Case::Pascal)
}
