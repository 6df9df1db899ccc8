//! Column type inference.
//!
//! Inference runs in two steps:
//!
//! 1. [`infer_kind`] classifies a column into a [`DynamicKind`]. A declared [`DataType`] other
//!    than [`DataType::Object`] decides the kind as long as every non-null value belongs to it.
//!    Otherwise the kind is derived from the *set* of value classes present among the non-null
//!    values, so the result does not depend on row order.
//! 2. [`StaticType::from_kind`] maps the kind through a fixed table. Kinds outside the table
//!    (currently only [`DynamicKind::Empty`], an untyped column with no non-null values) have no
//!    static type and make inference fail.
//!
//! | dynamic kind | static type |
//! |---|---|
//! | string, unicode, mixed, complex | [`StaticType::UnicodeString`] |
//! | bytes, boolean | [`StaticType::Boolean`] |
//! | floating, mixed-integer, mixed-integer-float, decimal | [`StaticType::Double`] |
//! | integer | [`StaticType::Integer`] |
//! | categorical | [`StaticType::CharString`] |
//! | datetime64, datetime, timedelta64, timedelta, time | [`StaticType::DateTime`] |
//! | date | [`StaticType::Date`] |
//! | period | [`StaticType::Duration`] |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DataType, Value};

/// Runtime category of the values observed in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicKind {
    String,
    Unicode,
    Bytes,
    Floating,
    Integer,
    /// Integers mixed with non-numeric values.
    MixedInteger,
    /// Integers and floats only.
    MixedIntegerFloat,
    Decimal,
    Complex,
    Categorical,
    Boolean,
    /// Declared timestamp columns and timezone-aware timestamps.
    DateTime64,
    DateTime,
    Date,
    /// Declared duration columns.
    TimeDelta64,
    TimeDelta,
    Time,
    Period,
    /// Heterogeneous values.
    Mixed,
    /// No non-null values to inspect.
    Empty,
}

impl DynamicKind {
    /// Stable lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DynamicKind::String => "string",
            DynamicKind::Unicode => "unicode",
            DynamicKind::Bytes => "bytes",
            DynamicKind::Floating => "floating",
            DynamicKind::Integer => "integer",
            DynamicKind::MixedInteger => "mixed-integer",
            DynamicKind::MixedIntegerFloat => "mixed-integer-float",
            DynamicKind::Decimal => "decimal",
            DynamicKind::Complex => "complex",
            DynamicKind::Categorical => "categorical",
            DynamicKind::Boolean => "boolean",
            DynamicKind::DateTime64 => "datetime64",
            DynamicKind::DateTime => "datetime",
            DynamicKind::Date => "date",
            DynamicKind::TimeDelta64 => "timedelta64",
            DynamicKind::TimeDelta => "timedelta",
            DynamicKind::Time => "time",
            DynamicKind::Period => "period",
            DynamicKind::Mixed => "mixed",
            DynamicKind::Empty => "empty",
        }
    }

    const ALL: [DynamicKind; 20] = [
        DynamicKind::String,
        DynamicKind::Unicode,
        DynamicKind::Bytes,
        DynamicKind::Floating,
        DynamicKind::Integer,
        DynamicKind::MixedInteger,
        DynamicKind::MixedIntegerFloat,
        DynamicKind::Decimal,
        DynamicKind::Complex,
        DynamicKind::Categorical,
        DynamicKind::Boolean,
        DynamicKind::DateTime64,
        DynamicKind::DateTime,
        DynamicKind::Date,
        DynamicKind::TimeDelta64,
        DynamicKind::TimeDelta,
        DynamicKind::Time,
        DynamicKind::Period,
        DynamicKind::Mixed,
        DynamicKind::Empty,
    ];
}

impl fmt::Display for DynamicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DynamicKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DynamicKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown dynamic kind '{s}'"))
    }
}

/// Output type of an extract column.
///
/// Each variant has exactly one wire representation and one conversion rule (see
/// [`crate::coercion`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaticType {
    UnicodeString,
    Boolean,
    Double,
    Integer,
    CharString,
    #[serde(rename = "DATETIME")]
    DateTime,
    Date,
    Duration,
    Spatial,
}

impl StaticType {
    /// The fixed mapping table. Returns `None` for kinds without a static type.
    pub fn from_kind(kind: DynamicKind) -> Option<Self> {
        let ty = match kind {
            DynamicKind::String | DynamicKind::Unicode | DynamicKind::Mixed | DynamicKind::Complex => {
                StaticType::UnicodeString
            }
            DynamicKind::Bytes | DynamicKind::Boolean => StaticType::Boolean,
            DynamicKind::Floating
            | DynamicKind::MixedInteger
            | DynamicKind::MixedIntegerFloat
            | DynamicKind::Decimal => StaticType::Double,
            DynamicKind::Integer => StaticType::Integer,
            DynamicKind::Categorical => StaticType::CharString,
            DynamicKind::DateTime64
            | DynamicKind::DateTime
            | DynamicKind::TimeDelta64
            | DynamicKind::TimeDelta
            | DynamicKind::Time => StaticType::DateTime,
            DynamicKind::Date => StaticType::Date,
            DynamicKind::Period => StaticType::Duration,
            DynamicKind::Empty => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StaticType::UnicodeString => "UNICODE_STRING",
            StaticType::Boolean => "BOOLEAN",
            StaticType::Double => "DOUBLE",
            StaticType::Integer => "INTEGER",
            StaticType::CharString => "CHAR_STRING",
            StaticType::DateTime => "DATETIME",
            StaticType::Date => "DATE",
            StaticType::Duration => "DURATION",
            StaticType::Spatial => "SPATIAL",
        };
        f.write_str(s)
    }
}

/// Class of a single non-null value. Bit flags so a column's classes fit in one set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
enum ValueClass {
    Int = 1 << 0,
    Float = 1 << 1,
    Bool = 1 << 2,
    Str = 1 << 3,
    Bytes = 1 << 4,
    Decimal = 1 << 5,
    Complex = 1 << 6,
    Date = 1 << 7,
    NaiveDateTime = 1 << 8,
    ZonedDateTime = 1 << 9,
    Time = 1 << 10,
    Duration = 1 << 11,
    Period = 1 << 12,
}

fn classify(value: &Value) -> Option<ValueClass> {
    let class = match value {
        Value::Null => return None,
        Value::Int64(_) => ValueClass::Int,
        Value::Float64(_) => ValueClass::Float,
        Value::Bool(_) => ValueClass::Bool,
        Value::Utf8(_) => ValueClass::Str,
        Value::Bytes(_) => ValueClass::Bytes,
        Value::Decimal(_) => ValueClass::Decimal,
        Value::Complex { .. } => ValueClass::Complex,
        Value::Date(_) => ValueClass::Date,
        Value::DateTime(_) => ValueClass::NaiveDateTime,
        Value::DateTimeTz(_) => ValueClass::ZonedDateTime,
        Value::Time(_) => ValueClass::Time,
        Value::Duration(_) => ValueClass::Duration,
        Value::Period(_) => ValueClass::Period,
    };
    Some(class)
}

const INT: u16 = ValueClass::Int as u16;
const FLOAT: u16 = ValueClass::Float as u16;
const DATETIMES: u16 = ValueClass::NaiveDateTime as u16 | ValueClass::ZonedDateTime as u16;

fn kind_for_single_class(class: ValueClass) -> DynamicKind {
    match class {
        ValueClass::Int => DynamicKind::Integer,
        ValueClass::Float => DynamicKind::Floating,
        ValueClass::Bool => DynamicKind::Boolean,
        ValueClass::Str => DynamicKind::String,
        ValueClass::Bytes => DynamicKind::Bytes,
        ValueClass::Decimal => DynamicKind::Decimal,
        ValueClass::Complex => DynamicKind::Complex,
        ValueClass::Date => DynamicKind::Date,
        ValueClass::NaiveDateTime => DynamicKind::DateTime,
        ValueClass::ZonedDateTime => DynamicKind::DateTime64,
        ValueClass::Time => DynamicKind::Time,
        ValueClass::Duration => DynamicKind::TimeDelta,
        ValueClass::Period => DynamicKind::Period,
    }
}

/// Classes a declared dtype admits, with the kind it declares. `None` for [`DataType::Object`].
fn declared_kind(declared: &DataType) -> Option<(u16, DynamicKind)> {
    let admitted = match declared {
        DataType::Int64 => (INT, DynamicKind::Integer),
        DataType::Float64 => (FLOAT, DynamicKind::Floating),
        DataType::Bool => (ValueClass::Bool as u16, DynamicKind::Boolean),
        DataType::Utf8 => (ValueClass::Str as u16, DynamicKind::String),
        DataType::Bytes => (ValueClass::Bytes as u16, DynamicKind::Bytes),
        DataType::Date => (ValueClass::Date as u16, DynamicKind::Date),
        DataType::DateTime => (DATETIMES, DynamicKind::DateTime64),
        DataType::Duration => (ValueClass::Duration as u16, DynamicKind::TimeDelta64),
        DataType::Categorical => (ValueClass::Str as u16, DynamicKind::Categorical),
        DataType::Object => return None,
    };
    Some(admitted)
}

/// Classify a column into a [`DynamicKind`].
///
/// `is_null` decides which values are skipped. A declared dtype decides the kind when every
/// remaining value belongs to it (including when none remain); otherwise, and for
/// [`DataType::Object`], the kind follows from the set of value classes present.
pub fn infer_kind<'a, I, F>(declared: &DataType, values: I, is_null: F) -> DynamicKind
where
    I: IntoIterator<Item = &'a Value>,
    F: Fn(&Value) -> bool,
{
    let mut seen: u16 = 0;
    let mut single: Option<ValueClass> = None;
    for value in values {
        if is_null(value) {
            continue;
        }
        if let Some(class) = classify(value) {
            seen |= class as u16;
            single = Some(class);
        }
    }

    if let Some((admitted, kind)) = declared_kind(declared) {
        if seen & !admitted == 0 {
            return kind;
        }
    }

    match single {
        None => DynamicKind::Empty,
        Some(class) if seen == class as u16 => kind_for_single_class(class),
        Some(_) if seen == INT | FLOAT => DynamicKind::MixedIntegerFloat,
        Some(_) if seen & INT != 0 => DynamicKind::MixedInteger,
        Some(_) if seen == DATETIMES => DynamicKind::DateTime,
        Some(_) => DynamicKind::Mixed,
    }
}

/// Infer the static type of an untyped column of values.
///
/// Null and `NaN` values are skipped. Fails with [`ExtractError::UnrecognizedType`] (naming
/// `column`) when the values yield a kind outside the mapping table.
pub fn infer<'a, I>(column: &str, values: I) -> ExtractResult<StaticType>
where
    I: IntoIterator<Item = &'a Value>,
{
    let kind = infer_kind(&DataType::Object, values, Value::is_null);
    StaticType::from_kind(kind).ok_or_else(|| ExtractError::UnrecognizedType {
        column: column.to_string(),
        kind,
    })
}
