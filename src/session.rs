//! Conversion sessions: the entry point from a table source to an extract.
//!
//! A [`ConversionSession`] owns a [`TableSource`] and the [`ColumnSet`] inferred from it when the
//! session was built. [`ConversionSession::write`] runs the export pipeline:
//!
//! - open the extract at the target path
//! - define the table, or append to it if a table of that name already exists
//! - coerce every row against the column static types and insert it
//! - close the extract
//!
//! Only opening, table definition and closing can fail; a cell that does not convert is written
//! as null.
//!
//! # Examples
//!
//! ```no_run
//! use rust_dataframe_extract::session::{ConversionSession, WriteOptions};
//! use rust_dataframe_extract::types::{DataSet, DataType, Field, Schema, Value};
//!
//! # fn main() -> Result<(), rust_dataframe_extract::ExtractError> {
//! let schema = Schema::new(vec![
//!     Field::new("id", DataType::Int64),
//!     Field::new("shape", DataType::Utf8),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![vec![Value::Int64(1), Value::Utf8("POINT (0 0)".to_string())]],
//! );
//!
//! let mut session = ConversionSession::new(ds)?;
//! session.set_spatial("shape", true)?;
//!
//! let opts = WriteOptions {
//!     add_index: true,
//!     ..Default::default()
//! };
//! let stats = session.write("shapes.extract.json", &opts)?;
//! println!("rows={}", stats.rows);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::coercion::RowCoercer;
use crate::columns::{ColumnRef, ColumnSet};
use crate::error::{ExtractError, ExtractResult};
use crate::inference::StaticType;
use crate::observability::{severity_for_error, ExportContext, ExportObserver, ExportSeverity};
use crate::sink::{ColumnDefinition, ExtractHandle, ExtractSink, FileExtractSink};
use crate::source::TableSource;
use crate::types::DataSet;

pub use crate::observability::ExportStats;

/// Table name used when [`WriteOptions::table_name`] is left at its default.
pub const DEFAULT_TABLE_NAME: &str = "Extract";

/// Preferred name of the synthetic index column.
pub const INDEX_COLUMN: &str = "index";

/// Options controlling a write.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct WriteOptions {
    /// Target table inside the extract.
    pub table_name: String,
    /// Prepend a sequential integer column named [`INDEX_COLUMN`] (or the first free
    /// `index_N`).
    pub add_index: bool,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ExportObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ExportSeverity,
}

impl fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOptions")
            .field("table_name", &self.table_name)
            .field("add_index", &self.add_index)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            add_index: false,
            observer: None,
            alert_at_or_above: ExportSeverity::Critical,
        }
    }
}

/// A table source together with its inferred column descriptors.
#[derive(Debug, Clone)]
pub struct ConversionSession<S = DataSet> {
    source: S,
    columns: ColumnSet,
}

impl<S: TableSource> ConversionSession<S> {
    /// Validate `source` and infer a static type for every column.
    ///
    /// Fails with [`ExtractError::InvalidInput`] if column names repeat or a row's width differs
    /// from the column count, and with [`ExtractError::UnrecognizedType`] if a column's dynamic
    /// kind has no static type.
    pub fn new(source: S) -> ExtractResult<Self> {
        validate_source(&source)?;
        let columns = ColumnSet::infer(&source)?;
        Ok(Self { source, columns })
    }

    /// Force a column to [`StaticType::Spatial`], or clear the override.
    ///
    /// Clearing re-infers the column from the source's current values. The descriptor set is
    /// rebuilt and swapped in; on error the session is unchanged.
    pub fn set_spatial(&mut self, column: impl Into<ColumnRef>, enabled: bool) -> ExtractResult<()> {
        self.columns = self
            .columns
            .with_spatial(&self.source, &column.into(), enabled)?;
        Ok(())
    }

    /// The owned table source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the table source.
    ///
    /// Column types are not re-inferred on mutation, only when a spatial override is cleared.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the session and return its source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// The current column descriptors.
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// Write every row to the extract file at `path`.
    ///
    /// Repeated writes to the same path and table append rows.
    pub fn write(&self, path: impl AsRef<Path>, options: &WriteOptions) -> ExtractResult<ExportStats> {
        self.write_to(&FileExtractSink, path, options)
    }

    /// Write every row to the extract at `path` opened through `sink`.
    ///
    /// When an observer is configured, this reports:
    ///
    /// - `on_success` on success, with row and coercion stats
    /// - `on_failure` on failure, with a computed severity
    /// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
    pub fn write_to<K: ExtractSink>(
        &self,
        sink: &K,
        path: impl AsRef<Path>,
        options: &WriteOptions,
    ) -> ExtractResult<ExportStats> {
        let path = path.as_ref();
        let result = self.export(sink, path, options);

        if let Some(obs) = options.observer.as_ref() {
            let ctx = ExportContext {
                path: path.to_path_buf(),
                table_name: options.table_name.clone(),
            };
            match &result {
                Ok(stats) => obs.on_success(&ctx, *stats),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= options.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result
    }

    fn export<K: ExtractSink>(
        &self,
        sink: &K,
        path: &Path,
        options: &WriteOptions,
    ) -> ExtractResult<ExportStats> {
        let table = options.table_name.as_str();
        let definitions = self.column_definitions(options.add_index);

        let mut handle = sink.open(path)?;
        let table_created = if handle.table_exists(table) {
            let existing = handle.table_columns(table)?;
            if existing.len() != definitions.len() {
                return Err(ExtractError::SchemaMismatch {
                    message: format!(
                        "table '{table}' has {} columns but {} would be written",
                        existing.len(),
                        definitions.len()
                    ),
                });
            }
            false
        } else {
            handle.define_table(table, &definitions)?;
            true
        };

        let mut coercer = RowCoercer::new(&self.columns.static_types(), options.add_index);
        let mut rows = 0;
        for row in self.source.rows() {
            let cells = coercer.coerce_row(row, |v| self.source.is_null(v));
            handle.insert_row(table, &cells)?;
            rows += 1;
        }
        handle.close()?;

        Ok(ExportStats {
            rows,
            coerced_nulls: coercer.coerced_nulls(),
            table_created,
        })
    }

    fn column_definitions(&self, add_index: bool) -> Vec<ColumnDefinition> {
        let mut definitions = Vec::with_capacity(self.columns.len() + usize::from(add_index));
        if add_index {
            let name = index_column_name(self.columns.iter().map(|c| c.name.as_str()));
            definitions.push(ColumnDefinition::new(name, StaticType::Integer));
        }
        definitions.extend(
            self.columns
                .iter()
                .map(|c| ColumnDefinition::new(c.name.clone(), c.static_type)),
        );
        definitions
    }
}

#[cfg(feature = "polars")]
impl ConversionSession<DataSet> {
    /// Build a session from a polars `DataFrame`.
    ///
    /// See [`crate::dataframe::dataset_from_dataframe`] for the dtype mapping.
    pub fn from_dataframe(df: &polars::prelude::DataFrame) -> ExtractResult<Self> {
        Self::new(crate::dataframe::dataset_from_dataframe(df)?)
    }
}

/// Name for the synthetic index column: `index`, or the first free `index_N` (N = 1, 2, ...).
pub fn index_column_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: HashSet<&str> = existing.into_iter().collect();
    if !taken.contains(INDEX_COLUMN) {
        return INDEX_COLUMN.to_string();
    }
    (1..)
        .map(|n| format!("{INDEX_COLUMN}_{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| INDEX_COLUMN.to_string())
}

fn validate_source<S: TableSource + ?Sized>(source: &S) -> ExtractResult<()> {
    let names = source.column_names();
    let mut seen = HashSet::with_capacity(names.len());
    for name in &names {
        if !seen.insert(*name) {
            return Err(ExtractError::InvalidInput {
                message: format!("duplicate column name '{name}'"),
            });
        }
    }

    for (i, row) in source.rows().enumerate() {
        if row.len() != names.len() {
            return Err(ExtractError::InvalidInput {
                message: format!(
                    "row {} has {} values but the table has {} columns",
                    i + 1,
                    row.len(),
                    names.len()
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{index_column_name, ConversionSession, WriteOptions};
    use crate::coercion::CellValue;
    use crate::error::ExtractError;
    use crate::inference::StaticType;
    use crate::sink::MemoryExtractStore;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn dataset(rows: Vec<Vec<Value>>) -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Object),
            Field::new("score", DataType::Float64),
        ]);
        DataSet::new(schema, rows)
    }

    #[test]
    fn index_name_skips_taken_suffixes() {
        assert_eq!(index_column_name(["a", "b"]), "index");
        assert_eq!(index_column_name(["index"]), "index_1");
        assert_eq!(index_column_name(["index", "index_1", "index_3"]), "index_2");
    }

    #[test]
    fn ragged_rows_and_duplicate_names_are_invalid_input() {
        let ragged = dataset(vec![vec![Value::Int64(1)]]);
        assert!(matches!(
            ConversionSession::new(ragged),
            Err(ExtractError::InvalidInput { .. })
        ));

        let schema = Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("a", DataType::Int64),
        ]);
        assert!(matches!(
            ConversionSession::new(DataSet::new(schema, vec![])),
            Err(ExtractError::InvalidInput { .. })
        ));
    }

    #[test]
    fn failed_override_leaves_session_unchanged() {
        let mut session =
            ConversionSession::new(dataset(vec![vec![Value::Int64(1), Value::Float64(0.5)]]))
                .unwrap();
        let before = session.columns().clone();
        assert!(session.set_spatial("missing", true).is_err());
        assert_eq!(session.columns(), &before);
    }

    #[test]
    fn null_cells_are_written_as_null() {
        let session = ConversionSession::new(dataset(vec![
            vec![Value::Int64(1), Value::Float64(0.5)],
            vec![Value::Int64(2), Value::Null],
        ]))
        .unwrap();
        assert_eq!(
            session.columns().static_types(),
            vec![StaticType::Integer, StaticType::Double]
        );

        let store = MemoryExtractStore::new();
        let stats = session
            .write_to(&store, "t.extract", &WriteOptions::default())
            .unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.coerced_nulls, 0);

        let table = store.table("t.extract", "Extract").unwrap();
        assert_eq!(table.rows[1], vec![CellValue::Integer(2), CellValue::Null]);
    }

    #[test]
    fn append_into_table_of_different_width_fails_before_writing() {
        let store = MemoryExtractStore::new();
        let session =
            ConversionSession::new(dataset(vec![vec![Value::Int64(1), Value::Float64(0.5)]]))
                .unwrap();
        session
            .write_to(&store, "w.extract", &WriteOptions::default())
            .unwrap();

        let indexed = WriteOptions {
            add_index: true,
            ..Default::default()
        };
        let err = session.write_to(&store, "w.extract", &indexed).unwrap_err();
        assert!(matches!(err, ExtractError::SchemaMismatch { .. }));
        assert_eq!(store.table("w.extract", "Extract").unwrap().row_count(), 1);
    }
}
