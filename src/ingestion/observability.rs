use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ConvertError;
use crate::types::{FileIndex, Statement};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (run failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl ConversionSeverity {
    pub fn for_error(e: &ConvertError) -> Self {
        match e {
            ConvertError::Io(_)
            | ConvertError::File { .. }
            | ConvertError::Walk { .. }
            | ConvertError::Checkout { .. } => Self::Critical,
            ConvertError::Csv { source, .. } => match source.kind() {
                ::csv::ErrorKind::Io(_) => Self::Critical,
                _ => Self::Error,
            },
            _ => Self::Error,
        }
    }
}

/// Context about one parsed source file.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub index: FileIndex,
    pub path: PathBuf,
}

/// Stats reported when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Distinct logical tables created.
    pub tables: usize,
    /// Data rows inserted across all tables.
    pub rows: usize,
    /// Statements re-submitted after a foreign-key violation.
    pub deferred: usize,
}

/// Observer interface for conversion progress.
///
/// Implementors can record metrics, logs, or trigger alerts. Every method defaults to a no-op.
pub trait ConversionObserver: Send + Sync {
    /// Called after a scan root has been walked.
    fn on_scan(&self, _root: &Path, _ext: &str, _files: usize) {}

    /// Called after a source file has been parsed.
    fn on_parsed(&self, _ctx: &SourceContext, _rows: usize) {}

    /// Called after a statement executed successfully.
    fn on_statement(&self, _statement: &Statement) {}

    /// Called when a statement failed on a foreign-key constraint and will be retried.
    fn on_deferred(&self, _statement: &Statement, _attempt: usize) {}

    /// Called when the run completes.
    fn on_success(&self, _stats: ConversionStats) {}

    /// Called when the run fails.
    fn on_failure(&self, _severity: ConversionSeverity, _error: &ConvertError) {}

    /// Called when a failure meets [`Self::alert_at_or_above`].
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, severity: ConversionSeverity, error: &ConvertError) {
        self.on_failure(severity, error)
    }

    /// Severity threshold at which `on_alert` is invoked.
    fn alert_at_or_above(&self) -> ConversionSeverity {
        ConversionSeverity::Critical
    }

    /// Classify `error` and report it through `on_failure` and, past the threshold, `on_alert`.
    fn report_failure(&self, error: &ConvertError) {
        let severity = ConversionSeverity::for_error(error);
        self.on_failure(severity, error);
        if severity >= self.alert_at_or_above() {
            self.on_alert(severity, error);
        }
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ConversionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ConversionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ConversionObserver for CompositeObserver {
    fn on_scan(&self, root: &Path, ext: &str, files: usize) {
        for o in &self.observers {
            o.on_scan(root, ext, files);
        }
    }

    fn on_parsed(&self, ctx: &SourceContext, rows: usize) {
        for o in &self.observers {
            o.on_parsed(ctx, rows);
        }
    }

    fn on_statement(&self, statement: &Statement) {
        for o in &self.observers {
            o.on_statement(statement);
        }
    }

    fn on_deferred(&self, statement: &Statement, attempt: usize) {
        for o in &self.observers {
            o.on_deferred(statement, attempt);
        }
    }

    fn on_success(&self, stats: ConversionStats) {
        for o in &self.observers {
            o.on_success(stats);
        }
    }

    fn on_failure(&self, severity: ConversionSeverity, error: &ConvertError) {
        for o in &self.observers {
            o.on_failure(severity, error);
        }
    }

    fn on_alert(&self, severity: ConversionSeverity, error: &ConvertError) {
        for o in &self.observers {
            o.on_alert(severity, error);
        }
    }

    // Each member applies its own threshold.
    fn report_failure(&self, error: &ConvertError) {
        for o in &self.observers {
            o.report_failure(error);
        }
    }
}

/// Logs conversion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ConversionObserver for StdErrObserver {
    fn on_scan(&self, root: &Path, ext: &str, files: usize) {
        eprintln!("[tabsql][scan] root={} ext={ext} files={files}", root.display());
    }

    fn on_parsed(&self, ctx: &SourceContext, rows: usize) {
        eprintln!("[tabsql][parsed] index={} path={} rows={rows}", ctx.index, ctx.path.display());
    }

    fn on_deferred(&self, statement: &Statement, attempt: usize) {
        eprintln!("[tabsql][deferred] table={} attempt={attempt}", statement.table);
    }

    fn on_success(&self, stats: ConversionStats) {
        eprintln!(
            "[tabsql][ok] tables={} rows={} deferred={}",
            stats.tables, stats.rows, stats.deferred
        );
    }

    fn on_failure(&self, severity: ConversionSeverity, error: &ConvertError) {
        eprintln!("[tabsql][{severity:?}] err={error}");
    }

    fn on_alert(&self, severity: ConversionSeverity, error: &ConvertError) {
        eprintln!("[ALERT][tabsql][{severity:?}] err={error}");
    }
}

/// Emits conversion events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ConversionObserver for TracingObserver {
    fn on_scan(&self, root: &Path, ext: &str, files: usize) {
        tracing::info!(root = %root.display(), ext, files, "scanned source tree");
    }

    fn on_parsed(&self, ctx: &SourceContext, rows: usize) {
        tracing::debug!(index = %ctx.index, path = %ctx.path.display(), rows, "parsed table file");
    }

    fn on_statement(&self, statement: &Statement) {
        tracing::trace!(table = %statement.table, sql = %statement.sql, "executed statement");
    }

    fn on_deferred(&self, statement: &Statement, attempt: usize) {
        tracing::debug!(table = %statement.table, attempt, "deferred on foreign key constraint");
    }

    fn on_success(&self, stats: ConversionStats) {
        tracing::info!(
            tables = stats.tables,
            rows = stats.rows,
            deferred = stats.deferred,
            "conversion complete"
        );
    }

    fn on_failure(&self, severity: ConversionSeverity, error: &ConvertError) {
        tracing::error!(?severity, %error, "conversion failed");
    }

    fn on_alert(&self, severity: ConversionSeverity, error: &ConvertError) {
        tracing::error!(?severity, %error, alert = true, "conversion alert");
    }
}

/// Appends conversion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ConversionObserver for FileObserver {
    fn on_parsed(&self, ctx: &SourceContext, rows: usize) {
        self.append_line(&format!(
            "{} parsed index={} path={} rows={rows}",
            unix_ts(),
            ctx.index,
            ctx.path.display()
        ));
    }

    fn on_statement(&self, statement: &Statement) {
        self.append_line(&format!("{} exec table={} sql={}", unix_ts(), statement.table, statement.sql));
    }

    fn on_deferred(&self, statement: &Statement, attempt: usize) {
        self.append_line(&format!(
            "{} deferred table={} attempt={attempt}",
            unix_ts(),
            statement.table
        ));
    }

    fn on_success(&self, stats: ConversionStats) {
        self.append_line(&format!(
            "{} ok tables={} rows={} deferred={}",
            unix_ts(),
            stats.tables,
            stats.rows,
            stats.deferred
        ));
    }

    fn on_failure(&self, severity: ConversionSeverity, error: &ConvertError) {
        self.append_line(&format!("{} fail severity={severity:?} err={error}", unix_ts()));
    }

    fn on_alert(&self, severity: ConversionSeverity, error: &ConvertError) {
        self.append_line(&format!("{} ALERT severity={severity:?} err={error}", unix_ts()));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
