//! In-process extract store.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ColumnDefinition, ExtractDocument, ExtractHandle, ExtractSink, StoredTable};
use crate::coercion::CellValue;
use crate::error::ExtractResult;

/// Extracts held in memory, keyed by path.
///
/// Clones share the same storage, so a store can be handed to a session and inspected
/// afterwards. Handles work on a private copy and publish it on [`ExtractHandle::close`]; a
/// handle dropped without closing leaves the store unchanged.
#[derive(Clone, Default)]
pub struct MemoryExtractStore {
    extracts: Arc<Mutex<HashMap<PathBuf, ExtractDocument>>>,
}

impl fmt::Debug for MemoryExtractStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryExtractStore")
            .field("extracts_len", &self.lock().len())
            .finish()
    }
}

impl MemoryExtractStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, ExtractDocument>> {
        self.extracts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an extract has been committed at `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.lock().contains_key(path.as_ref())
    }

    /// Snapshot of a committed table.
    pub fn table(&self, path: impl AsRef<Path>, name: &str) -> Option<StoredTable> {
        self.lock()
            .get(path.as_ref())
            .and_then(|doc| doc.tables.get(name))
            .cloned()
    }

    /// Names of the committed tables at `path`, sorted.
    pub fn table_names(&self, path: impl AsRef<Path>) -> Vec<String> {
        self.lock()
            .get(path.as_ref())
            .map(|doc| doc.tables.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ExtractSink for MemoryExtractStore {
    type Handle = MemoryExtractHandle;

    fn open(&self, path: &Path) -> ExtractResult<Self::Handle> {
        let staged = self.lock().get(path).cloned().unwrap_or_default();
        Ok(MemoryExtractHandle {
            store: self.clone(),
            path: path.to_path_buf(),
            staged,
        })
    }
}

/// Open extract in a [`MemoryExtractStore`].
#[derive(Debug)]
pub struct MemoryExtractHandle {
    store: MemoryExtractStore,
    path: PathBuf,
    staged: ExtractDocument,
}

impl ExtractHandle for MemoryExtractHandle {
    fn table_exists(&self, name: &str) -> bool {
        self.staged.table_exists(name)
    }

    fn define_table(&mut self, name: &str, columns: &[ColumnDefinition]) -> ExtractResult<()> {
        self.staged.define_table(name, columns)
    }

    fn table_columns(&self, name: &str) -> ExtractResult<Vec<ColumnDefinition>> {
        self.staged.table_columns(name)
    }

    fn insert_row(&mut self, name: &str, row: &[CellValue]) -> ExtractResult<()> {
        self.staged.insert_row(name, row)
    }

    fn close(self) -> ExtractResult<()> {
        self.store.lock().insert(self.path, self.staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::MemoryExtractStore;
    use crate::coercion::CellValue;
    use crate::inference::StaticType;
    use crate::sink::{ColumnDefinition, ExtractHandle, ExtractSink};

    #[test]
    fn changes_are_visible_only_after_close() {
        let store = MemoryExtractStore::new();
        let path = Path::new("people.hyper");

        let mut handle = store.open(path).unwrap();
        handle
            .define_table("Extract", &[ColumnDefinition::new("id", StaticType::Integer)])
            .unwrap();
        handle.insert_row("Extract", &[CellValue::Integer(7)]).unwrap();
        assert!(!store.contains(path));

        handle.close().unwrap();
        let table = store.table(path, "Extract").unwrap();
        assert_eq!(table.rows, vec![vec![CellValue::Integer(7)]]);
        assert_eq!(store.table_names(path), vec!["Extract".to_string()]);
    }

    #[test]
    fn dropped_handle_discards_staged_rows() {
        let store = MemoryExtractStore::new();
        let path = Path::new("dropped.hyper");
        {
            let mut handle = store.open(path).unwrap();
            handle.define_table("Extract", &[]).unwrap();
        }
        assert!(!store.contains(path));
    }
}
