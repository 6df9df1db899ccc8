//! Column descriptors: the per-column inference results a conversion works from.
//!
//! A [`ColumnSet`] is built once from a [`TableSource`] and is immutable afterwards. Changing a
//! column's spatial override goes through [`ColumnSet::with_spatial`], which returns a rebuilt
//! set and leaves the original untouched.

use std::fmt;

use crate::error::{ExtractError, ExtractResult};
use crate::inference::{infer_kind, DynamicKind, StaticType};
use crate::source::TableSource;
use crate::types::DataType;

/// Reference to a column by position or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "at index {i}"),
            ColumnRef::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Inference result for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name, unique within the table.
    pub name: String,
    /// Dynamic kind observed in the column's values.
    pub inferred_kind: DynamicKind,
    /// Output type of the column.
    pub static_type: StaticType,
    /// Whether the column is forced to [`StaticType::Spatial`].
    pub spatial_override: bool,
}

impl ColumnDescriptor {
    /// Infer the descriptor of the column at `index` from the source's current data.
    pub fn infer<S: TableSource + ?Sized>(source: &S, index: usize) -> ExtractResult<Self> {
        let names = source.column_names();
        let name = names.get(index).copied().ok_or_else(|| ExtractError::ColumnResolution {
            column: ColumnRef::Index(index).to_string(),
            available: names.len(),
        })?;
        let declared = source.column_type(index).cloned().unwrap_or(DataType::Object);

        let inferred_kind = infer_kind(&declared, source.column_values(index), |v| source.is_null(v));
        let static_type =
            StaticType::from_kind(inferred_kind).ok_or_else(|| ExtractError::UnrecognizedType {
                column: name.to_string(),
                kind: inferred_kind,
            })?;

        Ok(Self {
            name: name.to_string(),
            inferred_kind,
            static_type,
            spatial_override: false,
        })
    }
}

/// The descriptors of every column of a table, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    /// Infer descriptors for all columns of `source`.
    ///
    /// Fails on the first column whose dynamic kind has no static type.
    pub fn infer<S: TableSource + ?Sized>(source: &S) -> ExtractResult<Self> {
        let columns = (0..source.column_count())
            .map(|index| ColumnDescriptor::infer(source, index))
            .collect::<ExtractResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the set has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Descriptor at `index`.
    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    /// Iterate descriptors in column order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    /// Static types aligned to column position.
    pub fn static_types(&self) -> Vec<StaticType> {
        self.columns.iter().map(|c| c.static_type).collect()
    }

    /// Resolve a column reference to a position.
    pub fn resolve(&self, column: &ColumnRef) -> ExtractResult<usize> {
        let found = match column {
            ColumnRef::Index(i) => (*i < self.columns.len()).then_some(*i),
            ColumnRef::Name(name) => self.columns.iter().position(|c| &c.name == name),
        };
        found.ok_or_else(|| ExtractError::ColumnResolution {
            column: column.to_string(),
            available: self.columns.len(),
        })
    }

    /// Return a new set with the spatial override of `column` set to `enabled`.
    ///
    /// Enabling forces [`StaticType::Spatial`] regardless of content. Disabling re-runs
    /// inference over the column's *current* values in `source`, so the restored type reflects
    /// any data changes made since the set was built.
    pub fn with_spatial<S: TableSource + ?Sized>(
        &self,
        source: &S,
        column: &ColumnRef,
        enabled: bool,
    ) -> ExtractResult<Self> {
        let index = self.resolve(column)?;
        let replacement = if enabled {
            ColumnDescriptor {
                static_type: StaticType::Spatial,
                spatial_override: true,
                ..self.columns[index].clone()
            }
        } else {
            ColumnDescriptor::infer(source, index)?
        };

        let mut columns = self.columns.clone();
        columns[index] = replacement;
        Ok(Self { columns })
    }
}
