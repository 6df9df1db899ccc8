//! Per-cell coercion into extract write instructions.
//!
//! Every [`StaticType`] has one converter, a plain function from a raw [`Value`] to a
//! [`CellValue`]. Converters are fallible; [`coerce_cell`] runs the null test first and turns any
//! conversion failure into [`CellValue::Null`], so one malformed value only ever costs its own
//! cell.
//!
//! [`RowCoercer`] resolves the converter for each column position once, before the row loop.

use std::fmt;

use chrono::{Datelike, Timelike};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::inference::StaticType;
use crate::types::{Value, MICROS_PER_DAY, MICROS_PER_SECOND};

/// `(year, month, day, hour, minute, second, microsecond)` of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

/// `(year, month, day)` of a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// `(days, hours, minutes, seconds, microseconds)` of an elapsed time.
///
/// Normalized so only `days` carries a sign: `-1µs` is `-1 days 23:59:59.999999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationParts {
    pub days: i64,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub microseconds: u32,
}

/// Write instruction for one extract cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Null,
    Spatial(Vec<u8>),
    UnicodeString(String),
    Boolean(bool),
    Double(#[serde(with = "float_repr")] f64),
    Integer(i64),
    CharString(String),
    DateTime(DateTimeParts),
    Date(DateParts),
    Duration(DurationParts),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// JSON has no non-finite numbers; write them as the text `f64::from_str` reads back.
mod float_repr {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            s.serialize_f64(*v)
        } else if v.is_nan() {
            s.serialize_str("NaN")
        } else if *v > 0.0 {
            s.serialize_str("inf")
        } else {
            s.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(t) => t.parse().map_err(D::Error::custom),
        }
    }
}

/// Why a single cell could not be converted. Never escapes the crate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CoercionError {
    /// The value has no representation under the target type.
    Unsupported { target: StaticType, value: &'static str },
    /// Bytes that are not valid UTF-8 where text is required.
    Encoding,
    /// The value does not fit the target representation.
    OutOfRange,
    /// Text that does not parse as the target type.
    Parse,
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionError::Unsupported { target, value } => {
                write!(f, "{value} value has no {target} representation")
            }
            CoercionError::Encoding => f.write_str("bytes are not valid utf-8"),
            CoercionError::OutOfRange => f.write_str("value out of range"),
            CoercionError::Parse => f.write_str("text does not parse"),
        }
    }
}

type Converter = fn(&Value) -> Result<CellValue, CoercionError>;

impl StaticType {
    fn converter(self) -> Converter {
        match self {
            StaticType::Spatial => to_spatial,
            StaticType::UnicodeString => to_unicode_string,
            StaticType::Boolean => to_boolean,
            StaticType::Double => to_double,
            StaticType::Integer => to_integer,
            StaticType::CharString => to_char_string,
            StaticType::DateTime => to_datetime,
            StaticType::Date => to_date,
            StaticType::Duration => to_duration,
        }
    }
}

fn value_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Int64(_) => "integer",
        Value::Float64(_) => "float",
        Value::Bool(_) => "bool",
        Value::Utf8(_) => "string",
        Value::Bytes(_) => "bytes",
        Value::Decimal(_) => "decimal",
        Value::Complex { .. } => "complex",
        Value::Date(_) => "date",
        Value::DateTime(_) | Value::DateTimeTz(_) => "datetime",
        Value::Time(_) => "time",
        Value::Duration(_) => "duration",
        Value::Period(_) => "period",
    }
}

fn unsupported(target: StaticType, value: &Value) -> CoercionError {
    CoercionError::Unsupported {
        target,
        value: value_name(value),
    }
}

fn stringify(value: &Value) -> Result<String, CoercionError> {
    match value {
        Value::Bytes(b) => String::from_utf8(b.clone()).map_err(|_| CoercionError::Encoding),
        other => Ok(other.to_string()),
    }
}

fn to_spatial(value: &Value) -> Result<CellValue, CoercionError> {
    stringify(value).map(|s| CellValue::Spatial(s.into_bytes()))
}

fn to_unicode_string(value: &Value) -> Result<CellValue, CoercionError> {
    stringify(value).map(CellValue::UnicodeString)
}

fn to_char_string(value: &Value) -> Result<CellValue, CoercionError> {
    stringify(value).map(CellValue::CharString)
}

fn to_boolean(value: &Value) -> Result<CellValue, CoercionError> {
    let b = match value {
        Value::Bool(b) => *b,
        Value::Int64(v) => *v != 0,
        Value::Float64(v) => *v != 0.0,
        Value::Decimal(d) => !d.is_zero(),
        Value::Bytes(b) => !b.is_empty(),
        other => return Err(unsupported(StaticType::Boolean, other)),
    };
    Ok(CellValue::Boolean(b))
}

fn to_double(value: &Value) -> Result<CellValue, CoercionError> {
    let v = match value {
        Value::Float64(v) => *v,
        Value::Int64(v) => *v as f64,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Decimal(d) => d.to_f64().ok_or(CoercionError::OutOfRange)?,
        other => return Err(unsupported(StaticType::Double, other)),
    };
    Ok(CellValue::Double(v))
}

// i64::MAX is not representable as f64; 2^63 is the first float past the range.
const I64_UPPER_BOUND_F64: f64 = 9_223_372_036_854_775_808.0;

fn to_integer(value: &Value) -> Result<CellValue, CoercionError> {
    let v = match value {
        Value::Int64(v) => *v,
        Value::Bool(b) => i64::from(*b),
        Value::Float64(v) => {
            let t = v.trunc();
            if !t.is_finite() || t < -I64_UPPER_BOUND_F64 || t >= I64_UPPER_BOUND_F64 {
                return Err(CoercionError::OutOfRange);
            }
            t as i64
        }
        Value::Decimal(d) => d.trunc().to_i64().ok_or(CoercionError::OutOfRange)?,
        Value::Utf8(s) => s.trim().parse::<i64>().map_err(|_| CoercionError::Parse)?,
        Value::Bytes(b) => std::str::from_utf8(b)
            .map_err(|_| CoercionError::Encoding)?
            .trim()
            .parse::<i64>()
            .map_err(|_| CoercionError::Parse)?,
        other => return Err(unsupported(StaticType::Integer, other)),
    };
    Ok(CellValue::Integer(v))
}

fn datetime_parts<T: Datelike + Timelike>(dt: &T) -> DateTimeParts {
    DateTimeParts {
        year: dt.year(),
        month: dt.month(),
        day: dt.day(),
        hour: dt.hour(),
        minute: dt.minute(),
        second: dt.second(),
        // Leap seconds report nanosecond >= 1e9; clamp into the last microsecond.
        microsecond: (dt.nanosecond() / 1_000).min(999_999),
    }
}

fn date_parts<T: Datelike>(d: &T) -> DateParts {
    DateParts {
        year: d.year(),
        month: d.month(),
        day: d.day(),
    }
}

fn to_datetime(value: &Value) -> Result<CellValue, CoercionError> {
    let parts = match value {
        Value::DateTime(dt) => datetime_parts(dt),
        Value::DateTimeTz(dt) => datetime_parts(dt),
        other => return Err(unsupported(StaticType::DateTime, other)),
    };
    Ok(CellValue::DateTime(parts))
}

fn to_date(value: &Value) -> Result<CellValue, CoercionError> {
    let parts = match value {
        Value::Date(d) => date_parts(d),
        Value::DateTime(dt) => date_parts(dt),
        Value::DateTimeTz(dt) => date_parts(dt),
        Value::Period(p) => date_parts(&p.start),
        other => return Err(unsupported(StaticType::Date, other)),
    };
    Ok(CellValue::Date(parts))
}

fn duration_parts(d: &chrono::TimeDelta) -> Result<DurationParts, CoercionError> {
    let micros = d.num_microseconds().ok_or(CoercionError::OutOfRange)?;
    let days = micros.div_euclid(MICROS_PER_DAY);
    let rem = micros.rem_euclid(MICROS_PER_DAY);
    let secs = rem / MICROS_PER_SECOND;
    // All remaining parts are bounded by one day and fit in u32.
    Ok(DurationParts {
        days,
        hours: (secs / 3600) as u32,
        minutes: (secs / 60 % 60) as u32,
        seconds: (secs % 60) as u32,
        microseconds: (rem % MICROS_PER_SECOND) as u32,
    })
}

fn to_duration(value: &Value) -> Result<CellValue, CoercionError> {
    let parts = match value {
        Value::Duration(d) => duration_parts(d)?,
        Value::Period(p) => duration_parts(&p.span().ok_or(CoercionError::OutOfRange)?)?,
        other => return Err(unsupported(StaticType::Duration, other)),
    };
    Ok(CellValue::Duration(parts))
}

/// Convert `value` under `static_type`, without the null test or failure fallback.
pub(crate) fn try_coerce(static_type: StaticType, value: &Value) -> Result<CellValue, CoercionError> {
    (static_type.converter())(value)
}

/// Convert one cell: null for missing values and for any conversion failure.
pub fn coerce_cell(static_type: StaticType, value: &Value) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }
    try_coerce(static_type, value).unwrap_or(CellValue::Null)
}

/// Coerces whole rows against a fixed list of column types.
///
/// Converters are resolved per column position at construction, so coercing a row is a
/// positional walk with no type dispatch.
pub struct RowCoercer {
    converters: Vec<Converter>,
    add_index: bool,
    next_index: i64,
    coerced_nulls: usize,
}

impl fmt::Debug for RowCoercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCoercer")
            .field("columns", &self.converters.len())
            .field("add_index", &self.add_index)
            .field("next_index", &self.next_index)
            .field("coerced_nulls", &self.coerced_nulls)
            .finish()
    }
}

impl RowCoercer {
    /// Build a coercer for columns of the given static types.
    ///
    /// With `add_index`, every output row starts with a sequential integer (0, 1, 2, ...) and the
    /// real columns shift one position right.
    pub fn new(static_types: &[StaticType], add_index: bool) -> Self {
        Self {
            converters: static_types.iter().map(|t| t.converter()).collect(),
            add_index,
            next_index: 0,
            coerced_nulls: 0,
        }
    }

    /// Width of the rows this coercer produces.
    pub fn output_width(&self) -> usize {
        self.converters.len() + usize::from(self.add_index)
    }

    /// Number of non-null source cells that degraded to null so far.
    pub fn coerced_nulls(&self) -> usize {
        self.coerced_nulls
    }

    /// Coerce one row, using `is_null` as the missing-value test.
    ///
    /// Cells beyond the end of `row` are written as null.
    pub fn coerce_row<F>(&mut self, row: &[Value], is_null: F) -> Vec<CellValue>
    where
        F: Fn(&Value) -> bool,
    {
        let mut out = Vec::with_capacity(self.output_width());
        if self.add_index {
            out.push(CellValue::Integer(self.next_index));
            self.next_index += 1;
        }
        for (position, convert) in self.converters.iter().enumerate() {
            let cell = match row.get(position) {
                None => CellValue::Null,
                Some(value) if is_null(value) => CellValue::Null,
                Some(value) => match convert(value) {
                    Ok(cell) => cell,
                    Err(_) => {
                        self.coerced_nulls += 1;
                        CellValue::Null
                    }
                },
            };
            out.push(cell);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeDelta, TimeZone};
    use rust_decimal::Decimal;

    use super::{
        coerce_cell, try_coerce, CellValue, CoercionError, DateParts, DateTimeParts, DurationParts,
        RowCoercer,
    };
    use crate::inference::StaticType;
    use crate::types::{Period, PeriodFreq, Value};

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32, us: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_micro_opt(h, mi, s, us)
            .unwrap()
    }

    #[test]
    fn null_and_nan_short_circuit_for_every_type() {
        for ty in [
            StaticType::Spatial,
            StaticType::UnicodeString,
            StaticType::Boolean,
            StaticType::Double,
            StaticType::Integer,
            StaticType::CharString,
            StaticType::DateTime,
            StaticType::Date,
            StaticType::Duration,
        ] {
            assert_eq!(coerce_cell(ty, &Value::Null), CellValue::Null);
            assert_eq!(coerce_cell(ty, &Value::Float64(f64::NAN)), CellValue::Null);
        }
    }

    #[test]
    fn string_types_stringify() {
        assert_eq!(
            coerce_cell(StaticType::UnicodeString, &Value::Int64(42)),
            CellValue::UnicodeString("42".to_string())
        );
        assert_eq!(
            coerce_cell(StaticType::CharString, &Value::Utf8("red".to_string())),
            CellValue::CharString("red".to_string())
        );
        assert_eq!(
            coerce_cell(StaticType::UnicodeString, &Value::Bytes(vec![0xff, 0xfe])),
            CellValue::Null
        );
    }

    #[test]
    fn spatial_encodes_text_as_utf8() {
        assert_eq!(
            coerce_cell(StaticType::Spatial, &Value::Utf8("POINT (1 2)".to_string())),
            CellValue::Spatial(b"POINT (1 2)".to_vec())
        );
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(coerce_cell(StaticType::Double, &Value::Int64(3)), CellValue::Double(3.0));
        assert_eq!(coerce_cell(StaticType::Double, &Value::Bool(true)), CellValue::Double(1.0));
        assert_eq!(
            coerce_cell(StaticType::Double, &Value::Decimal(Decimal::new(125, 2))),
            CellValue::Double(1.25)
        );
        assert_eq!(
            coerce_cell(StaticType::Double, &Value::Utf8("1.5".to_string())),
            CellValue::Null
        );

        assert_eq!(coerce_cell(StaticType::Integer, &Value::Float64(-2.9)), CellValue::Integer(-2));
        assert_eq!(
            coerce_cell(StaticType::Integer, &Value::Utf8(" 17 ".to_string())),
            CellValue::Integer(17)
        );
        assert_eq!(
            coerce_cell(StaticType::Integer, &Value::Utf8("abc".to_string())),
            CellValue::Null
        );
        assert_eq!(coerce_cell(StaticType::Integer, &Value::Float64(f64::INFINITY)), CellValue::Null);
        assert_eq!(coerce_cell(StaticType::Integer, &Value::Float64(1e20)), CellValue::Null);
    }

    #[test]
    fn boolean_uses_truthiness_of_numbers_and_bytes() {
        assert_eq!(coerce_cell(StaticType::Boolean, &Value::Int64(0)), CellValue::Boolean(false));
        assert_eq!(coerce_cell(StaticType::Boolean, &Value::Bytes(b"x".to_vec())), CellValue::Boolean(true));
        assert_eq!(
            try_coerce(StaticType::Boolean, &Value::Utf8("yes".to_string())),
            Err(CoercionError::Unsupported {
                target: StaticType::Boolean,
                value: "string"
            })
        );
    }

    #[test]
    fn datetime_decomposes_wall_clock_components() {
        let naive = ts(2024, 3, 9, 14, 5, 6, 789);
        assert_eq!(
            coerce_cell(StaticType::DateTime, &Value::DateTime(naive)),
            CellValue::DateTime(DateTimeParts {
                year: 2024,
                month: 3,
                day: 9,
                hour: 14,
                minute: 5,
                second: 6,
                microsecond: 789,
            })
        );

        let zoned = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .from_local_datetime(&naive)
            .unwrap();
        assert!(matches!(
            coerce_cell(StaticType::DateTime, &Value::DateTimeTz(zoned)),
            CellValue::DateTime(DateTimeParts { hour: 14, .. })
        ));
    }

    #[test]
    fn datetime_without_full_components_degrades_to_null() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(coerce_cell(StaticType::DateTime, &Value::Date(d)), CellValue::Null);
        assert_eq!(
            coerce_cell(StaticType::DateTime, &Value::Duration(TimeDelta::seconds(3))),
            CellValue::Null
        );
    }

    #[test]
    fn date_accepts_dates_timestamps_and_periods() {
        let naive = ts(2024, 3, 9, 14, 5, 6, 0);
        let expected = CellValue::Date(DateParts {
            year: 2024,
            month: 3,
            day: 9,
        });
        assert_eq!(coerce_cell(StaticType::Date, &Value::DateTime(naive)), expected);
        assert_eq!(
            coerce_cell(StaticType::Date, &Value::Date(naive.date())),
            expected
        );
        assert_eq!(coerce_cell(StaticType::Date, &Value::Int64(20240309)), CellValue::Null);
    }

    #[test]
    fn duration_normalizes_sign_into_days() {
        let d = TimeDelta::days(-1) + TimeDelta::hours(2);
        assert_eq!(
            coerce_cell(StaticType::Duration, &Value::Duration(d)),
            CellValue::Duration(DurationParts {
                days: -1,
                hours: 2,
                minutes: 0,
                seconds: 0,
                microseconds: 0,
            })
        );
    }

    #[test]
    fn period_duration_is_its_calendar_span() {
        let p = Period::new(ts(2023, 2, 1, 0, 0, 0, 0), PeriodFreq::Month);
        assert!(matches!(
            coerce_cell(StaticType::Duration, &Value::Period(p)),
            CellValue::Duration(DurationParts { days: 28, hours: 0, .. })
        ));
    }

    #[test]
    fn row_coercer_isolates_failures_to_one_cell() {
        let mut coercer = RowCoercer::new(&[StaticType::Integer, StaticType::Double], false);
        let row = vec![Value::Utf8("abc".to_string()), Value::Float64(2.5)];
        let out = coercer.coerce_row(&row, Value::is_null);
        assert_eq!(out, vec![CellValue::Null, CellValue::Double(2.5)]);
        assert_eq!(coercer.coerced_nulls(), 1);

        let out = coercer.coerce_row(&[Value::Int64(1), Value::Null], Value::is_null);
        assert_eq!(out, vec![CellValue::Integer(1), CellValue::Null]);
        assert_eq!(coercer.coerced_nulls(), 1);
    }

    #[test]
    fn row_coercer_prepends_sequential_index() {
        let mut coercer = RowCoercer::new(&[StaticType::UnicodeString], true);
        assert_eq!(coercer.output_width(), 2);
        let a = coercer.coerce_row(&[Value::Utf8("a".to_string())], Value::is_null);
        let b = coercer.coerce_row(&[Value::Utf8("b".to_string())], Value::is_null);
        assert_eq!(a[0], CellValue::Integer(0));
        assert_eq!(b[0], CellValue::Integer(1));
        assert_eq!(b[1], CellValue::UnicodeString("b".to_string()));
    }

    #[test]
    fn non_finite_doubles_survive_json() {
        let cells = vec![CellValue::Double(f64::INFINITY), CellValue::Double(-0.5)];
        let json = serde_json::to_string(&cells).unwrap();
        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cells);
    }
}
