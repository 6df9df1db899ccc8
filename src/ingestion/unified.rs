//! Unified loading entrypoint.
//!
//! Most callers should use [`load_from_path`], which loads a file into an in-memory
//! [`crate::types::DataSet`] using a provided [`crate::types::Schema`]. If
//! [`LoadOptions::format`] is `None`, the format is inferred from the file extension.

use std::path::Path;

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DataSet, Schema};

use super::{csv, json, parquet};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Comma-separated values.
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
}

impl SourceFormat {
    /// Parse a source format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }
}

/// Options controlling [`load_from_path`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<SourceFormat>,
}

/// Load a file into a [`DataSet`].
///
/// # Examples
///
/// ```no_run
/// use rust_dataframe_extract::ingestion::{load_from_path, LoadOptions, SourceFormat};
/// use rust_dataframe_extract::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), rust_dataframe_extract::ExtractError> {
/// let schema = Schema::new(vec![
///     Field::new("id", DataType::Int64),
///     // Untyped: cells are sniffed and the column kind is inferred later.
///     Field::new("value", DataType::Object),
/// ]);
///
/// // Uses `.csv` to select CSV loading.
/// let ds = load_from_path("measurements.csv", &schema, &LoadOptions::default())?;
/// println!("rows={}", ds.row_count());
///
/// // Force a format when the extension does not say.
/// let opts = LoadOptions {
///     format: Some(SourceFormat::Json),
/// };
/// let ds = load_from_path("export_without_extension", &schema, &opts)?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn load_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &LoadOptions,
) -> ExtractResult<DataSet> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    match fmt {
        SourceFormat::Csv => csv::load_csv_from_path(path, schema),
        SourceFormat::Json => json::load_json_from_path(path, schema),
        SourceFormat::Parquet => parquet::load_parquet_from_path(path, schema),
    }
}

fn infer_format_from_path(path: &Path) -> ExtractResult<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ExtractError::InvalidInput {
            message: format!("cannot infer format: path has no extension ({})", path.display()),
        })?;

    SourceFormat::from_extension(ext).ok_or_else(|| ExtractError::InvalidInput {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}
