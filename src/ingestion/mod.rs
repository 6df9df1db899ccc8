//! Table-source loaders.
//!
//! Most callers should use [`load_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`LoadOptions`])
//! - loads the file into an in-memory [`crate::types::DataSet`] under a declared schema
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//!
//! Text cells are read the same way by every loader. [`DataType::Object`] fields sniff the text
//! (integer, then float, then `true`/`false`, otherwise string). Temporal fields accept:
//!
//! - dates as `%Y-%m-%d`
//! - timestamps as `%Y-%m-%d %H:%M:%S%.f` (or with a `T` separator), with an optional UTC
//!   offset (RFC 3339 style)
//! - durations as `[N days ]HH:MM:SS[.ffffff]`

pub mod csv;
pub mod json;
pub mod parquet;
pub mod unified;

pub use unified::{load_from_path, LoadOptions, SourceFormat};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DataType, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const ZONED_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"];

/// Parse a text cell under a declared type. Empty text is null.
pub(crate) fn parse_text(
    row: usize,
    column: &str,
    data_type: &DataType,
    raw: &str,
) -> ExtractResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| ExtractError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 | DataType::Categorical => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Bytes => Ok(Value::Bytes(raw.as_bytes().to_vec())),
        DataType::Object => Ok(sniff_text(trimmed)),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
        DataType::Date => parse_date(trimmed)
            .map(Value::Date)
            .ok_or_else(|| parse_error(format!("expected date ({DATE_FORMAT})"))),
        DataType::DateTime => parse_datetime(trimmed)
            .ok_or_else(|| parse_error("expected timestamp".to_string())),
        DataType::Duration => parse_duration(trimmed)
            .map(Value::Duration)
            .ok_or_else(|| parse_error("expected duration ([N days ]HH:MM:SS[.ffffff])".to_string())),
    }
}

/// Best-effort value for untyped text: integer, float, boolean, else string.
pub(crate) fn sniff_text(s: &str) -> Value {
    if let Ok(v) = s.parse::<i64>() {
        return Value::Int64(v);
    }
    if let Ok(v) = s.parse::<f64>() {
        return Value::Float64(v);
    }
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::Utf8(s.to_owned())
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Naive timestamps become [`Value::DateTime`], ones with an offset [`Value::DateTimeTz`].
pub(crate) fn parse_datetime(s: &str) -> Option<Value> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Value::DateTimeTz(dt));
    }
    for fmt in ZONED_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(s, fmt) {
            return Some(Value::DateTimeTz(dt));
        }
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(Value::DateTime)
}

/// Parse `[N days ]HH:MM:SS[.ffffff]`. The day count may be negative; the clock part may not.
pub(crate) fn parse_duration(s: &str) -> Option<TimeDelta> {
    let s = s.trim();
    let (days, clock) = match s.split_once(" day") {
        Some((d, rest)) => {
            let rest = rest.strip_prefix('s').unwrap_or(rest).trim_start();
            (d.trim().parse::<i64>().ok()?, rest)
        }
        None => (0, s),
    };
    let total = TimeDelta::try_days(days)?;
    if clock.is_empty() {
        return Some(total);
    }

    let mut parts = clock.splitn(3, ':');
    let hours = parse_clock_part(parts.next()?)?;
    let minutes = parse_clock_part(parts.next()?)?;
    let sec_part = parts.next()?;
    let (secs, frac) = sec_part.split_once('.').unwrap_or((sec_part, ""));
    let secs = parse_clock_part(secs)?;
    if minutes >= 60 || secs >= 60 {
        return None;
    }
    let micros = parse_fraction_micros(frac)?;
    let clock_secs = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60)?
        .checked_add(secs)?;

    total
        .checked_add(&TimeDelta::try_seconds(clock_secs)?)?
        .checked_add(&TimeDelta::microseconds(micros))
}

fn parse_clock_part(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_fraction_micros(frac: &str) -> Option<i64> {
    if frac.is_empty() {
        return Some(0);
    }
    if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: i64 = frac.parse().ok()?;
    Some(digits * 10_i64.pow(6 - frac.len() as u32))
}

/// Days since 1970-01-01, as stored by Parquet `DATE` columns.
pub(crate) fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(TimeDelta::try_days(i64::from(days))?)
}
