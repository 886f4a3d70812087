use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error type returned by every stage of a conversion run.
///
/// Variants carry enough context (file path, table name, row, statement) to identify what
/// failed without a backtrace.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or removing a specific file failed.
    #[error("failed to access '{}': {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Walking a source tree failed.
    #[error("failed to read source tree '{}': {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A file was selected for parsing but its extension has no parser.
    #[error("unsupported file type '{ext}' ({})", path.display())]
    UnsupportedFileType { path: PathBuf, ext: String },

    /// Delimited text (CSV/TSV) could not be read.
    #[error("failed to parse '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[cfg(feature = "excel")]
    /// Spreadsheet could not be read (feature-gated behind `excel`).
    #[error("failed to parse '{}': {source}", path.display())]
    Excel {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// Configuration is invalid.
    #[error("invalid config: {message}")]
    Config { message: String },

    #[error("failed to parse toml config: {0}")]
    ConfigToml(#[from] toml::de::Error),

    #[error("failed to parse json config: {0}")]
    ConfigJson(#[from] serde_json::Error),

    /// Header files do not describe a usable table schema.
    #[error("schema error in table '{table}': {message}")]
    Schema { table: String, message: String },

    /// A body file has fewer rows than the configured start row.
    #[error("not enough rows in table '{table}'. rows: {rows}, start row: {start_row}")]
    NotEnoughRows {
        table: String,
        rows: usize,
        start_row: usize,
    },

    /// A body file maps to a table that no header file defined.
    #[error("no such table '{table}' (no header file defines it)")]
    NoSuchTable { table: String },

    /// A cell could not be cast into its column's type.
    #[error("failed to cast value at table '{table}' row {row} column '{column}': {message} (raw='{raw}')")]
    Cast {
        table: String,
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// Opening or configuring the database failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database rejected a statement.
    #[error("failed to execute statement for table '{table}': {message}\n{statement}")]
    Database {
        table: String,
        statement: String,
        message: String,
    },

    /// A statement kept failing on foreign-key constraints past the retry ceiling.
    #[error("gave up on table '{table}' after {attempts} attempts: {message}")]
    RetryExhausted {
        table: String,
        attempts: usize,
        message: String,
    },

    /// Fetching a remote repository failed.
    #[error("checkout failed: {message}")]
    Checkout { message: String },
}

impl ConvertError {
    pub(crate) fn file(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::File { path, source }
    }
}
