//! polars `DataFrame` adapter.
//!
//! [`dataset_from_dataframe`] copies a polars frame into a [`DataSet`]. Column dtypes become
//! declared [`DataType`]s, so typed polars columns keep their kind during inference:
//!
//! | polars dtype | declared type | cells |
//! |---|---|---|
//! | `Boolean` | `Bool` | `Bool` |
//! | any integer | `Int64` | `Int64` (`UInt64` above `i64::MAX` as `Float64`) |
//! | `Float32`, `Float64` | `Float64` | `Float64` |
//! | `String` | `Utf8` | `Utf8` |
//! | `Categorical`, `Enum` | `Categorical` | `Utf8` category label |
//! | `Decimal` | `Object` | `Decimal` |
//! | `Binary` | `Bytes` | `Bytes` |
//! | `Date` | `Date` | `Date` |
//! | `Datetime` without time zone | `DateTime` | `DateTime` |
//! | `Datetime` with time zone | `DateTime` | `DateTimeTz` in that zone |
//! | `Duration` | `Duration` | `Duration` |
//! | anything else | `Object` | text form |
//!
//! Zones are carried as fixed offsets: `UTC` and `±HH[:MM]` keep their offset, other zone
//! names fall back to UTC.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use polars::prelude::{AnyValue, Column, DataFrame, DataType as PlDataType, TimeUnit};
use rust_decimal::Decimal;

use crate::error::ExtractResult;
use crate::ingestion::date_from_epoch_days;
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Copy `df` into a [`DataSet`].
pub fn dataset_from_dataframe(df: &DataFrame) -> ExtractResult<DataSet> {
    let height = df.height();
    let mut fields = Vec::with_capacity(df.width());
    let mut columns = Vec::with_capacity(df.width());
    for name in df.get_column_names() {
        let column = df.column(name.as_str())?;
        fields.push(Field::new(name.as_str(), declared_type(column.dtype())));
        columns.push(column_values(column)?.into_iter());
    }

    let rows = (0..height)
        .map(|_| {
            columns
                .iter_mut()
                .map(|cells| cells.next().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn declared_type(dtype: &PlDataType) -> DataType {
    match dtype {
        PlDataType::Boolean => DataType::Bool,
        PlDataType::String => DataType::Utf8,
        PlDataType::Categorical(..) | PlDataType::Enum(..) => DataType::Categorical,
        PlDataType::Binary => DataType::Bytes,
        PlDataType::Date => DataType::Date,
        PlDataType::Datetime(..) => DataType::DateTime,
        PlDataType::Duration(_) => DataType::Duration,
        d if d.is_integer() => DataType::Int64,
        d if d.is_float() => DataType::Float64,
        _ => DataType::Object,
    }
}

fn column_values(column: &Column) -> ExtractResult<Vec<Value>> {
    match column.dtype() {
        PlDataType::Categorical(..) | PlDataType::Enum(..) => {
            cells(&column.cast(&PlDataType::String)?, label_value)
        }
        PlDataType::Decimal(..) => cells(&column.cast(&PlDataType::String)?, |av| {
            match text_of(&av) {
                Some(s) => decimal_value(s),
                None => Value::Null,
            }
        }),
        PlDataType::Datetime(_, Some(tz)) => {
            let tz = tz.as_str().to_string();
            cells(column, |av| value_from_any(av, Some(&tz)))
        }
        _ => cells(column, |av| value_from_any(av, None)),
    }
}

fn cells(column: &Column, convert: impl Fn(AnyValue<'_>) -> Value) -> ExtractResult<Vec<Value>> {
    (0..column.len())
        .map(|i| Ok(convert(column.get(i)?)))
        .collect()
}

fn text_of<'a>(av: &'a AnyValue<'_>) -> Option<&'a str> {
    match av {
        AnyValue::String(s) => Some(*s),
        AnyValue::StringOwned(s) => Some(s.as_str()),
        _ => None,
    }
}

fn label_value(av: AnyValue<'_>) -> Value {
    text_of(&av)
        .map(|s| Value::Utf8(s.to_string()))
        .unwrap_or(Value::Null)
}

fn decimal_value(text: &str) -> Value {
    text.trim()
        .parse::<Decimal>()
        .map(Value::Decimal)
        .unwrap_or(Value::Null)
}

fn value_from_any(av: AnyValue<'_>, tz: Option<&str>) -> Value {
    match av {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int32(v) => Value::Int64(i64::from(v)),
        AnyValue::Int64(v) => Value::Int64(v),
        AnyValue::UInt32(v) => Value::Int64(i64::from(v)),
        AnyValue::UInt64(v) => i64::try_from(v)
            .map(Value::Int64)
            .unwrap_or(Value::Float64(v as f64)),
        AnyValue::Float32(v) => Value::Float64(f64::from(v)),
        AnyValue::Float64(v) => Value::Float64(v),
        AnyValue::String(s) => Value::Utf8(s.to_string()),
        AnyValue::StringOwned(s) => Value::Utf8(s.to_string()),
        AnyValue::Binary(b) => Value::Bytes(b.to_vec()),
        AnyValue::BinaryOwned(b) => Value::Bytes(b),
        AnyValue::Date(days) => date_from_epoch_days(days)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        AnyValue::Datetime(v, tu, _) => timestamp_value(v, tu, tz),
        AnyValue::DatetimeOwned(v, tu, _) => timestamp_value(v, tu, tz),
        AnyValue::Duration(v, tu) => duration_value(v, tu),
        other => {
            let dtype = other.dtype();
            if dtype.is_integer() {
                other.extract::<i64>().map(Value::Int64).unwrap_or(Value::Null)
            } else if dtype.is_float() {
                other.extract::<f64>().map(Value::Float64).unwrap_or(Value::Null)
            } else {
                Value::Utf8(other.to_string())
            }
        }
    }
}

fn timestamp_value(v: i64, tu: TimeUnit, tz: Option<&str>) -> Value {
    let utc: Option<DateTime<Utc>> = match tu {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(v)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(v),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(v),
    };
    let Some(utc) = utc else {
        return Value::Null;
    };
    let Some(tz) = tz else {
        return Value::DateTime(utc.naive_utc());
    };
    match zone_offset(tz).or_else(|| FixedOffset::east_opt(0)) {
        Some(offset) => Value::DateTimeTz(utc.with_timezone(&offset)),
        None => Value::Null,
    }
}

/// `UTC`, `Z` or `±HH[[:]MM]` as a fixed offset.
fn zone_offset(tz: &str) -> Option<FixedOffset> {
    if matches!(tz, "UTC" | "Etc/UTC" | "Z") {
        return FixedOffset::east_opt(0);
    }
    let sign = match tz.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let rest = &tz[1..];
    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None => (rest.get(..2)?, rest.get(2..)?),
    };
    if hours.len() != 2 || !(minutes.is_empty() || minutes.len() == 2) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = if minutes.is_empty() { 0 } else { minutes.parse().ok()? };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn duration_value(v: i64, tu: TimeUnit) -> Value {
    let d = match tu {
        TimeUnit::Nanoseconds => Some(TimeDelta::nanoseconds(v)),
        TimeUnit::Microseconds => Some(TimeDelta::microseconds(v)),
        TimeUnit::Milliseconds => TimeDelta::try_milliseconds(v),
    };
    d.map(Value::Duration).unwrap_or(Value::Null)
}
