//! The table source a conversion reads from.
//!
//! A [`TableSource`] exposes ordered column names, a per-column value accessor, row iteration in
//! column order, and a null test. [`DataSet`] is the built-in implementation; other table
//! abstractions can implement the trait directly.

use crate::types::{DataSet, DataType, Value};

/// Read access to a table of dynamically typed values.
pub trait TableSource {
    /// Column names in table order.
    fn column_names(&self) -> Vec<&str>;

    /// Declared type of the column at `index`, or `None` if out of range.
    ///
    /// Sources without declared types should report [`DataType::Object`].
    fn column_type(&self, index: usize) -> Option<&DataType>;

    /// Values of the column at `index`, in row order.
    fn column_values(&self, index: usize) -> Box<dyn Iterator<Item = &Value> + '_>;

    /// Rows in table order, each aligned to [`Self::column_names`].
    fn rows(&self) -> Box<dyn Iterator<Item = &[Value]> + '_>;

    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Number of columns.
    fn column_count(&self) -> usize {
        self.column_names().len()
    }

    /// Whether `value` counts as missing.
    fn is_null(&self, value: &Value) -> bool {
        value.is_null()
    }
}

impl TableSource for DataSet {
    fn column_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    fn column_type(&self, index: usize) -> Option<&DataType> {
        self.schema.fields.get(index).map(|f| &f.data_type)
    }

    fn column_values(&self, index: usize) -> Box<dyn Iterator<Item = &Value> + '_> {
        Box::new(self.column(index))
    }

    fn rows(&self) -> Box<dyn Iterator<Item = &[Value]> + '_> {
        Box::new(self.rows.iter().map(Vec::as_slice))
    }

    fn row_count(&self) -> usize {
        DataSet::row_count(self)
    }

    fn column_count(&self) -> usize {
        self.schema.fields.len()
    }
}
