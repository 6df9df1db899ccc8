//! Extract sinks: where coerced rows are written.
//!
//! An [`ExtractSink`] opens an extract at a path and hands out an [`ExtractHandle`]. The handle
//! stages table definitions and rows; nothing is committed until [`ExtractHandle::close`].
//!
//! Implementations:
//! - [`memory::MemoryExtractStore`]: in-process store keyed by path
//! - [`file::FileExtractSink`]: an extract file holding a JSON document of tables

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coercion::CellValue;
use crate::error::{ExtractError, ExtractResult};
use crate::inference::StaticType;

pub mod file;
pub mod memory;

pub use file::FileExtractSink;
pub use memory::MemoryExtractStore;

/// One output column: name and static type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub static_type: StaticType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, static_type: StaticType) -> Self {
        Self {
            name: name.into(),
            static_type,
        }
    }
}

/// A table as stored in an extract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredTable {
    /// Column definitions in order.
    pub columns: Vec<ColumnDefinition>,
    /// Rows of cell instructions, each as wide as `columns`.
    pub rows: Vec<Vec<CellValue>>,
}

impl StoredTable {
    /// Number of stored rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Opens extracts.
pub trait ExtractSink {
    type Handle: ExtractHandle;

    /// Open (creating if absent) the extract at `path`.
    ///
    /// I/O failures are reported as [`ExtractError::FileSystem`] naming the path.
    fn open(&self, path: &Path) -> ExtractResult<Self::Handle>;
}

/// An open extract.
pub trait ExtractHandle {
    /// Whether a table called `name` exists.
    fn table_exists(&self, name: &str) -> bool;

    /// Define a new, empty table.
    fn define_table(&mut self, name: &str, columns: &[ColumnDefinition]) -> ExtractResult<()>;

    /// Column definitions of an existing table.
    fn table_columns(&self, name: &str) -> ExtractResult<Vec<ColumnDefinition>>;

    /// Append one row of cell instructions to table `name`.
    fn insert_row(&mut self, name: &str, row: &[CellValue]) -> ExtractResult<()>;

    /// Commit staged changes and release the extract.
    fn close(self) -> ExtractResult<()>;
}

/// The tables of one extract, keyed by name.
///
/// Both built-in sinks stage changes in a document and commit it on close.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ExtractDocument {
    pub(crate) tables: BTreeMap<String, StoredTable>,
}

impl ExtractDocument {
    pub(crate) fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub(crate) fn define_table(
        &mut self,
        name: &str,
        columns: &[ColumnDefinition],
    ) -> ExtractResult<()> {
        if name.is_empty() {
            return Err(ExtractError::InvalidInput {
                message: "table name must not be empty".to_string(),
            });
        }
        if self.tables.contains_key(name) {
            return Err(ExtractError::SchemaMismatch {
                message: format!("table '{name}' already exists"),
            });
        }
        self.tables.insert(
            name.to_string(),
            StoredTable {
                columns: columns.to_vec(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    pub(crate) fn table_columns(&self, name: &str) -> ExtractResult<Vec<ColumnDefinition>> {
        Ok(self.table(name)?.columns.clone())
    }

    pub(crate) fn insert_row(&mut self, name: &str, row: &[CellValue]) -> ExtractResult<()> {
        let table = self
            .tables
            .get_mut(name)
            .ok_or_else(|| missing_table(name))?;
        if row.len() != table.columns.len() {
            return Err(ExtractError::SchemaMismatch {
                message: format!(
                    "row has {} cells but table '{name}' has {} columns",
                    row.len(),
                    table.columns.len()
                ),
            });
        }
        table.rows.push(row.to_vec());
        Ok(())
    }

    fn table(&self, name: &str) -> ExtractResult<&StoredTable> {
        self.tables.get(name).ok_or_else(|| missing_table(name))
    }
}

fn missing_table(name: &str) -> ExtractError {
    ExtractError::SchemaMismatch {
        message: format!("table '{name}' does not exist"),
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnDefinition, ExtractDocument};
    use crate::coercion::CellValue;
    use crate::error::ExtractError;
    use crate::inference::StaticType;

    #[test]
    fn document_rejects_rows_of_the_wrong_width() {
        let mut doc = ExtractDocument::default();
        doc.define_table("Extract", &[ColumnDefinition::new("id", StaticType::Integer)])
            .unwrap();
        doc.insert_row("Extract", &[CellValue::Integer(1)]).unwrap();

        let err = doc
            .insert_row("Extract", &[CellValue::Integer(2), CellValue::Null])
            .unwrap_err();
        assert!(matches!(err, ExtractError::SchemaMismatch { .. }));
        assert_eq!(doc.tables["Extract"].row_count(), 1);
    }

    #[test]
    fn document_refuses_to_redefine_or_write_unknown_tables() {
        let mut doc = ExtractDocument::default();
        doc.define_table("t", &[]).unwrap();
        assert!(doc.table_exists("t"));
        assert!(doc.define_table("t", &[]).is_err());
        assert!(doc.insert_row("other", &[]).is_err());
        assert!(doc.table_columns("other").is_err());
        assert!(matches!(
            doc.define_table("", &[]),
            Err(ExtractError::InvalidInput { .. })
        ));
    }
}
