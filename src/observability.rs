//! Export observers: success/failure/alert hooks around a write.
//!
//! Individual cell coercion failures are never reported here; only the aggregate
//! [`ExportStats::coerced_nulls`] count reaches observers.

use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use chrono::{SecondsFormat, Utc};

use crate::error::ExtractError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the write failed because of its input).
    Error,
    /// Critical error (I/O or other infrastructure failures).
    Critical,
}

/// Context about a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportContext {
    /// Extract path.
    pub path: PathBuf,
    /// Target table.
    pub table_name: String,
}

/// Stats reported on a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    /// Number of rows appended.
    pub rows: usize,
    /// Non-null source cells written as null because they failed to convert.
    pub coerced_nulls: usize,
    /// `true` if the write defined the table, `false` if it appended to an existing one.
    pub table_created: bool,
}

/// Observer interface for write outcomes.
pub trait ExportObserver: Send + Sync {
    /// Called when a write succeeds.
    fn on_success(&self, _ctx: &ExportContext, _stats: ExportStats) {}

    /// Called when a write fails.
    fn on_failure(&self, _ctx: &ExportContext, _severity: ExportSeverity, _error: &ExtractError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ExportContext, severity: ExportSeverity, error: &ExtractError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans callbacks out to a list of observers, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ExportObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ExportObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ExportObserver for CompositeObserver {
    fn on_success(&self, ctx: &ExportContext, stats: ExportStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &ExportContext, severity: ExportSeverity, error: &ExtractError) {
        self.observers
            .iter()
            .for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &ExportContext, severity: ExportSeverity, error: &ExtractError) {
        self.observers
            .iter()
            .for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// One-line description of a write outcome, shared by the log observers.
#[derive(Debug, Clone, Copy)]
enum Outcome<'a> {
    Written(ExportStats),
    Failed(ExportSeverity, &'a ExtractError),
    Alert(ExportSeverity, &'a ExtractError),
}

impl Outcome<'_> {
    fn line(&self, ctx: &ExportContext) -> String {
        let target = format!("table={} path={}", ctx.table_name, ctx.path.display());
        match self {
            Outcome::Written(stats) => format!(
                "ok {target} rows={} coerced_nulls={} {}",
                stats.rows,
                stats.coerced_nulls,
                if stats.table_created { "created" } else { "appended" }
            ),
            Outcome::Failed(severity, error) => {
                format!("fail severity={severity:?} {target} err={error}")
            }
            Outcome::Alert(severity, error) => {
                format!("ALERT severity={severity:?} {target} err={error}")
            }
        }
    }
}

/// Prints write outcomes to stderr, prefixed with `[extract]`.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl StdErrObserver {
    fn emit(&self, ctx: &ExportContext, outcome: Outcome<'_>) {
        eprintln!("[extract] {}", outcome.line(ctx));
    }
}

impl ExportObserver for StdErrObserver {
    fn on_success(&self, ctx: &ExportContext, stats: ExportStats) {
        self.emit(ctx, Outcome::Written(stats));
    }

    fn on_failure(&self, ctx: &ExportContext, severity: ExportSeverity, error: &ExtractError) {
        self.emit(ctx, Outcome::Failed(severity, error));
    }

    fn on_alert(&self, ctx: &ExportContext, severity: ExportSeverity, error: &ExtractError) {
        self.emit(ctx, Outcome::Alert(severity, error));
    }
}

/// Appends write outcomes to a log file, one RFC 3339-stamped line each.
///
/// Best effort: a log file that cannot be opened or written is skipped silently.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn emit(&self, ctx: &ExportContext, outcome: Outcome<'_>) {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{stamp} {}", outcome.line(ctx));
        }
    }
}

impl ExportObserver for FileObserver {
    fn on_success(&self, ctx: &ExportContext, stats: ExportStats) {
        self.emit(ctx, Outcome::Written(stats));
    }

    fn on_failure(&self, ctx: &ExportContext, severity: ExportSeverity, error: &ExtractError) {
        self.emit(ctx, Outcome::Failed(severity, error));
    }

    fn on_alert(&self, ctx: &ExportContext, severity: ExportSeverity, error: &ExtractError) {
        self.emit(ctx, Outcome::Alert(severity, error));
    }
}

/// Severity of a failed write.
///
/// Anything that reached the file system is Critical; input problems are Error.
pub(crate) fn severity_for_error(e: &ExtractError) -> ExportSeverity {
    match e {
        ExtractError::Io(_) | ExtractError::FileSystem { .. } => ExportSeverity::Critical,
        ExtractError::Json(err) if err.is_io() => ExportSeverity::Critical,
        ExtractError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => ExportSeverity::Critical,
            _ => ExportSeverity::Error,
        },
        ExtractError::Parquet(err) if error_chain_contains_io(err) => ExportSeverity::Critical,
        _ => ExportSeverity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{severity_for_error, ExportContext, ExportSeverity, ExportStats, Outcome};
    use crate::error::ExtractError;
    use crate::inference::DynamicKind;

    #[test]
    fn outcome_lines_name_the_table_and_path() {
        let ctx = ExportContext {
            path: PathBuf::from("out.json"),
            table_name: "people".to_string(),
        };
        let written = Outcome::Written(ExportStats {
            rows: 3,
            coerced_nulls: 1,
            table_created: false,
        });
        assert_eq!(
            written.line(&ctx),
            "ok table=people path=out.json rows=3 coerced_nulls=1 appended"
        );

        let err = ExtractError::SchemaMismatch {
            message: "width".to_string(),
        };
        let line = Outcome::Alert(ExportSeverity::Critical, &err).line(&ctx);
        assert!(line.starts_with("ALERT severity=Critical table=people path=out.json err="));
    }

    #[test]
    fn file_system_failures_are_critical() {
        let err = ExtractError::FileSystem {
            path: PathBuf::from("out.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(severity_for_error(&err), ExportSeverity::Critical);
    }

    #[test]
    fn input_failures_are_errors() {
        let err = ExtractError::UnrecognizedType {
            column: "c".to_string(),
            kind: DynamicKind::Empty,
        };
        assert_eq!(severity_for_error(&err), ExportSeverity::Error);
        assert!(ExportSeverity::Error < ExportSeverity::Critical);
    }
}
