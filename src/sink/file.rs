//! File-backed extracts.
//!
//! An extract file is a JSON document mapping table names to their column definitions and rows.
//! Opening only reads: a missing or empty file is a new extract, and nothing touches the disk
//! until close. Close writes the whole document to a sibling `.tmp` file and renames it over the
//! extract, so a failed write leaves the previous contents in place.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{ColumnDefinition, ExtractDocument, ExtractHandle, ExtractSink, StoredTable};
use crate::coercion::CellValue;
use crate::error::{ExtractError, ExtractResult};

/// Writes extracts as JSON documents on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractSink;

impl FileExtractSink {
    /// Read the extract at `path` without opening it for writing.
    pub fn read(path: impl AsRef<Path>) -> ExtractResult<ExtractFile> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| fs_error(path, source))?;
        Ok(ExtractFile {
            document: parse_document(&text)?,
        })
    }
}

/// A loaded extract file.
#[derive(Debug, Clone)]
pub struct ExtractFile {
    document: ExtractDocument,
}

impl ExtractFile {
    /// Table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        self.document.tables.keys().map(String::as_str).collect()
    }

    /// The table called `name`.
    pub fn table(&self, name: &str) -> Option<&StoredTable> {
        self.document.tables.get(name)
    }
}

impl ExtractSink for FileExtractSink {
    type Handle = FileExtractHandle;

    fn open(&self, path: &Path) -> ExtractResult<Self::Handle> {
        let staged = match fs::read_to_string(path) {
            Ok(text) => parse_document(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // New extract; its directory must already exist.
                let parent = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                match fs::metadata(parent) {
                    Ok(meta) if meta.is_dir() => ExtractDocument::default(),
                    Ok(_) => return Err(fs_error(path, e)),
                    Err(source) => return Err(fs_error(path, source)),
                }
            }
            Err(source) => return Err(fs_error(path, source)),
        };

        Ok(FileExtractHandle {
            path: path.to_path_buf(),
            staged,
        })
    }
}

/// Open extract file.
#[derive(Debug)]
pub struct FileExtractHandle {
    path: PathBuf,
    staged: ExtractDocument,
}

impl ExtractHandle for FileExtractHandle {
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
        let tmp = temp_path(&self.path);
        let written = write_document(&tmp, &self.staged)
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(|source| fs_error(&self.path, source)));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }
}

/// `<path>.tmp`, next to the extract so the rename stays on one file system.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_document(path: &Path, document: &ExtractDocument) -> ExtractResult<()> {
    let file = File::create(path).map_err(|source| fs_error(path, source))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, document)?;
    writer.flush().map_err(|source| fs_error(path, source))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|source| fs_error(path, source))
}

fn parse_document(text: &str) -> ExtractResult<ExtractDocument> {
    if text.trim().is_empty() {
        return Ok(ExtractDocument::default());
    }
    Ok(serde_json::from_str(text)?)
}

fn fs_error(path: &Path, source: std::io::Error) -> ExtractError {
    ExtractError::FileSystem {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{temp_path, FileExtractSink};
    use crate::coercion::CellValue;
    use crate::error::ExtractError;
    use crate::inference::StaticType;
    use crate::sink::{ColumnDefinition, ExtractHandle, ExtractSink};

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("rust_dataframe_extract_{name}_{nanos}.json"))
    }

    #[test]
    fn reopening_a_file_sees_committed_tables() {
        let path = tmp_path("reopen");
        let columns = [ColumnDefinition::new("score", StaticType::Double)];

        let mut handle = FileExtractSink.open(&path).unwrap();
        assert!(!handle.table_exists("Extract"));
        handle.define_table("Extract", &columns).unwrap();
        handle.insert_row("Extract", &[CellValue::Double(1.5)]).unwrap();
        handle.close().unwrap();

        let handle = FileExtractSink.open(&path).unwrap();
        assert!(handle.table_exists("Extract"));
        assert_eq!(handle.table_columns("Extract").unwrap(), columns.to_vec());

        let file = FileExtractSink::read(&path).unwrap();
        assert_eq!(file.table_names(), vec!["Extract"]);
        assert_eq!(file.table("Extract").unwrap().row_count(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn nothing_is_written_until_close() {
        let path = tmp_path("lazy");

        let mut handle = FileExtractSink.open(&path).unwrap();
        assert!(handle.define_table("", &[]).is_err());
        drop(handle);
        assert!(!path.exists());

        let mut handle = FileExtractSink.open(&path).unwrap();
        handle
            .define_table("Extract", &[ColumnDefinition::new("n", StaticType::Integer)])
            .unwrap();
        handle.close().unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failed_close_keeps_previous_contents() {
        let path = tmp_path("keep");
        let mut handle = FileExtractSink.open(&path).unwrap();
        handle
            .define_table("Extract", &[ColumnDefinition::new("n", StaticType::Integer)])
            .unwrap();
        handle.insert_row("Extract", &[CellValue::Integer(7)]).unwrap();
        handle.close().unwrap();

        // A directory squatting on the temp name makes the next write fail.
        let tmp = temp_path(&path);
        std::fs::create_dir(&tmp).unwrap();
        let mut handle = FileExtractSink.open(&path).unwrap();
        handle.insert_row("Extract", &[CellValue::Integer(8)]).unwrap();
        assert!(matches!(
            handle.close().unwrap_err(),
            ExtractError::FileSystem { .. }
        ));

        let file = FileExtractSink::read(&path).unwrap();
        assert_eq!(
            file.table("Extract").unwrap().rows,
            vec![vec![CellValue::Integer(7)]]
        );

        let _ = std::fs::remove_dir(&tmp);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unwritable_path_is_a_file_system_error() {
        let path = std::env::temp_dir()
            .join("rust_dataframe_extract_missing_dir")
            .join("nested")
            .join("out.json");
        let err = FileExtractSink.open(&path).unwrap_err();
        match err {
            ExtractError::FileSystem { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected FileSystem, got {other:?}"),
        }
    }
}
