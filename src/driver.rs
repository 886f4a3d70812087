//! Insertion Driver: executes DDL and DML against the database collaborator.
//!
//! The database sits behind [`StatementSink`]; [`SqliteSink`] is the real one. Inserts that
//! fail on a foreign-key constraint (a referenced row not inserted yet) are deferred to the
//! next pass and retried, at most [`MAX_FOREIGN_KEY_RETRIES`] times each. Every other error
//! aborts the run.

use std::fmt;
use std::path::Path;

use rusqlite::config::DbConfig;
use rusqlite::{Connection, ErrorCode};

use crate::error::{ConvertError, ConvertResult};
use crate::ingestion::ConversionObserver;
use crate::types::Statement;

/// Retries allowed per statement after its first foreign-key failure.
pub const MAX_FOREIGN_KEY_RETRIES: usize = 10;

/// Why the database rejected a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    /// A foreign-key constraint failed; the statement may succeed once its targets exist.
    ForeignKey(String),
    /// Anything else.
    Other(String),
}

impl fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignKey(m) | Self::Other(m) => f.write_str(m),
        }
    }
}

/// Something that executes SQL text.
pub trait StatementSink {
    /// Execute `sql`, which may contain several `;`-separated statements.
    fn execute(&mut self, sql: &str) -> Result<(), ExecuteError>;
}

/// A SQLite database file with foreign-key enforcement on.
pub struct SqliteSink {
    conn: Connection,
}

impl fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSink")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteSink {
    /// Create a fresh database at `path`, removing whatever was there.
    pub fn create(path: impl AsRef<Path>) -> ConvertResult<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            std::fs::remove_dir_all(path).map_err(ConvertError::file(path))?;
        } else if path.exists() {
            std::fs::remove_file(path).map_err(ConvertError::file(path))?;
        }
        Self::configure(Connection::open(path)?)
    }

    pub fn in_memory() -> ConvertResult<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> ConvertResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        // String literals are emitted double-quoted.
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DML, true)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl StatementSink for SqliteSink {
    fn execute(&mut self, sql: &str) -> Result<(), ExecuteError> {
        self.conn.execute_batch(sql).map_err(classify)
    }
}

fn classify(e: rusqlite::Error) -> ExecuteError {
    let is_foreign_key = match &e {
        rusqlite::Error::SqliteFailure(err, msg) => {
            err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                || (err.code == ErrorCode::ConstraintViolation
                    && msg.as_deref().is_some_and(|m| m.contains("FOREIGN KEY")))
        }
        _ => false,
    };
    if is_foreign_key {
        ExecuteError::ForeignKey(e.to_string())
    } else {
        ExecuteError::Other(e.to_string())
    }
}

/// Runs statement lists against a [`StatementSink`].
#[derive(Debug, Clone, Copy)]
pub struct InsertionDriver {
    max_retries: usize,
}

impl Default for InsertionDriver {
    fn default() -> Self {
        Self {
            max_retries: MAX_FOREIGN_KEY_RETRIES,
        }
    }
}

impl InsertionDriver {
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self { max_retries }
    }

    /// Execute schema statements in order. Any error aborts.
    pub fn execute_schema(
        &self,
        sink: &mut dyn StatementSink,
        statements: &[Statement],
        observer: &dyn ConversionObserver,
    ) -> ConvertResult<()> {
        for statement in statements {
            sink.execute(&statement.sql).map_err(|e| database_err(statement, e))?;
            observer.on_statement(statement);
        }
        Ok(())
    }

    /// Execute inserts, deferring foreign-key failures to later passes.
    ///
    /// Each pass re-attempts the still-failing statements in their original relative order.
    /// Returns the number of deferrals.
    pub fn execute_inserts(
        &self,
        sink: &mut dyn StatementSink,
        statements: &[Statement],
        observer: &dyn ConversionObserver,
    ) -> ConvertResult<usize> {
        let mut failures = vec![0usize; statements.len()];
        let mut pending: Vec<usize> = (0..statements.len()).collect();
        let mut deferred = 0;

        while !pending.is_empty() {
            let mut retry = Vec::new();
            for i in pending {
                let statement = &statements[i];
                match sink.execute(&statement.sql) {
                    Ok(()) => observer.on_statement(statement),
                    Err(ExecuteError::ForeignKey(message)) => {
                        failures[i] += 1;
                        if failures[i] > self.max_retries {
                            return Err(ConvertError::RetryExhausted {
                                table: statement.table.clone(),
                                attempts: failures[i],
                                message,
                            });
                        }
                        observer.on_deferred(statement, failures[i]);
                        deferred += 1;
                        retry.push(i);
                    }
                    Err(e) => return Err(database_err(statement, e)),
                }
            }
            pending = retry;
        }

        Ok(deferred)
    }
}

fn database_err(statement: &Statement, e: ExecuteError) -> ConvertError {
    ConvertError::Database {
        table: statement.table.clone(),
        statement: statement.sql.clone(),
        message: e.to_string(),
    }
}
