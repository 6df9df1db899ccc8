//! Core data model for the table being converted.
//!
//! A [`DataSet`] is an in-memory table: a [`Schema`] of named fields, each with a declared
//! [`DataType`], and row-major storage of dynamically typed [`Value`]s. Cells are not required
//! to match their field's declared type; reconciling the two is the job of
//! [`crate::inference`] and [`crate::coercion`].

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;

/// Declared data type of a column.
///
/// A typed column keeps its declared kind unless a cell contradicts it; [`DataType::Object`]
/// columns are inferred from their values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Raw byte strings.
    Bytes,
    /// Calendar date.
    Date,
    /// Timestamp.
    DateTime,
    /// Elapsed time.
    Duration,
    /// Strings drawn from a fixed set of categories.
    Categorical,
    /// No declared type; values may be anything.
    Object,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the shape of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Granularity of a [`Period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodFreq {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

/// A span of time identified by its start and frequency, e.g. the month `2024-02`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    /// First instant of the period.
    pub start: NaiveDateTime,
    /// Length of the period.
    pub freq: PeriodFreq,
}

impl Period {
    pub fn new(start: NaiveDateTime, freq: PeriodFreq) -> Self {
        Self { start, freq }
    }

    /// First instant after the period, or `None` if it falls outside the representable range.
    pub fn end(&self) -> Option<NaiveDateTime> {
        match self.freq {
            PeriodFreq::Year => self.start.checked_add_months(Months::new(12)),
            PeriodFreq::Quarter => self.start.checked_add_months(Months::new(3)),
            PeriodFreq::Month => self.start.checked_add_months(Months::new(1)),
            PeriodFreq::Week => self.start.checked_add_signed(TimeDelta::weeks(1)),
            PeriodFreq::Day => self.start.checked_add_signed(TimeDelta::days(1)),
            PeriodFreq::Hour => self.start.checked_add_signed(TimeDelta::hours(1)),
            PeriodFreq::Minute => self.start.checked_add_signed(TimeDelta::minutes(1)),
            PeriodFreq::Second => self.start.checked_add_signed(TimeDelta::seconds(1)),
        }
    }

    /// Calendar length of the period (a February month is 28 or 29 days).
    pub fn span(&self) -> Option<TimeDelta> {
        self.end().map(|end| end - self.start)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.start;
        match self.freq {
            PeriodFreq::Year => write!(f, "{}", s.format("%Y")),
            PeriodFreq::Quarter => write!(f, "{}Q{}", s.year(), s.month0() / 3 + 1),
            PeriodFreq::Month => write!(f, "{}", s.format("%Y-%m")),
            PeriodFreq::Week | PeriodFreq::Day => write!(f, "{}", s.format("%Y-%m-%d")),
            PeriodFreq::Hour => write!(f, "{}", s.format("%Y-%m-%d %H:00")),
            PeriodFreq::Minute => write!(f, "{}", s.format("%Y-%m-%d %H:%M")),
            PeriodFreq::Second => write!(f, "{}", s.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A single dynamically typed cell in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float. `NaN` counts as missing.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Raw bytes, not necessarily UTF-8.
    Bytes(Vec<u8>),
    /// Exact decimal number.
    Decimal(Decimal),
    /// Complex number.
    Complex { re: f64, im: f64 },
    /// Calendar date.
    Date(NaiveDate),
    /// Timestamp without a zone.
    DateTime(NaiveDateTime),
    /// Timestamp with a fixed UTC offset.
    DateTimeTz(DateTime<FixedOffset>),
    /// Time of day.
    Time(NaiveTime),
    /// Elapsed time.
    Duration(TimeDelta),
    /// Calendar period.
    Period(Period),
}

impl Value {
    /// Whether the value counts as missing: `Null`, or a float/complex holding `NaN`.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float64(v) => v.is_nan(),
            Value::Complex { re, im } => re.is_nan() || im.is_nan(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Complex { re, im } => {
                if im.is_sign_negative() {
                    write!(f, "{re}-{}i", -im)
                } else {
                    write!(f, "{re}+{im}i")
                }
            }
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::DateTimeTz(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::Duration(d) => fmt_duration(f, d),
            Value::Period(p) => write!(f, "{p}"),
        }
    }
}

pub(crate) const MICROS_PER_SECOND: i64 = 1_000_000;
pub(crate) const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Formats as `[N days ]HH:MM:SS[.ffffff]`, with the day count carrying the sign.
fn fmt_duration(f: &mut fmt::Formatter<'_>, d: &TimeDelta) -> fmt::Result {
    let Some(micros) = d.num_microseconds() else {
        return write!(f, "{} days", d.num_days());
    };
    let days = micros.div_euclid(MICROS_PER_DAY);
    let rem = micros.rem_euclid(MICROS_PER_DAY);
    let secs = rem / MICROS_PER_SECOND;
    let frac = rem % MICROS_PER_SECOND;
    if days != 0 {
        write!(f, "{days} days ")?;
    }
    write!(f, "{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)?;
    if frac != 0 {
        write!(f, ".{frac:06}")?;
    }
    Ok(())
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the values of column `index` in row order.
    ///
    /// Rows shorter than `index + 1` yield [`Value::Null`].
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&Value::Null))
    }
}
