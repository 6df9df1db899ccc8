use std::path::PathBuf;

use thiserror::Error;

use crate::inference::DynamicKind;

/// Convenience result type for extract operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Error type returned by the crate.
///
/// Every variant is fatal for the operation that returned it. Failures while coercing a single
/// cell never surface here; they degrade that cell to a null (see [`crate::coercion`]).
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Underlying I/O error while reading an input file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The extract file could not be opened, created, or written.
    #[error("cannot access extract at '{}': {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV input error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet input error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON input error, or a corrupt extract document.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "polars")]
    /// polars error while reading a `DataFrame` (feature-gated behind `polars`).
    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// The table source is not a well-formed table.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A column's inferred dynamic kind has no static type mapping.
    #[error("column '{column}': no static type mapping for dynamic kind '{kind}'")]
    UnrecognizedType { column: String, kind: DynamicKind },

    /// A column reference did not resolve to a column of the table.
    #[error("could not find column {column} (table has {available} columns)")]
    ColumnResolution { column: String, available: usize },

    /// The input or an existing extract table does not match the expected shape.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the declared [`crate::types::DataType`] while loading.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}
