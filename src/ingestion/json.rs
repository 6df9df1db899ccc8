//! JSON loading.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are supported using dot paths in schema field names (e.g. `user.name`).
//! Temporal fields are read from JSON strings in the text forms accepted by every loader.

use std::fs;
use std::path::Path;

use super::{parse_date, parse_datetime, parse_duration};
use crate::error::{ExtractError, ExtractResult};
use crate::types::{DataSet, DataType, Schema, Value};

/// Load a JSON file into an in-memory `DataSet`.
pub fn load_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> ExtractResult<DataSet> {
    let text = fs::read_to_string(path)?;
    load_json_from_str(&text, schema)
}

/// Load JSON from an in-memory string into a [`DataSet`].
pub fn load_json_from_str(input: &str, schema: &Schema) -> ExtractResult<DataSet> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match v {
            serde_json::Value::Array(items) => load_json_values(&items, schema),
            serde_json::Value::Object(_) => load_json_values(std::slice::from_ref(&v), schema),
            _ => Err(ExtractError::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        }
    } else {
        // Fall back to NDJSON.
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
                ExtractError::SchemaMismatch {
                    message: format!("invalid ndjson at line {}: {}", i + 1, e),
                }
            })?;
            values.push(v);
        }
        load_json_values(&values, schema)
    }
}

fn load_json_values(values: &[serde_json::Value], schema: &Schema) -> ExtractResult<DataSet> {
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        let obj = v.as_object().ok_or_else(|| ExtractError::SchemaMismatch {
            message: format!("row {row_num} is not a json object"),
        })?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let jv = get_by_dot_path(obj, &field.name).ok_or_else(|| ExtractError::SchemaMismatch {
                message: format!("row {row_num} missing required field '{}'", field.name),
            })?;
            row.push(convert_json_value(row_num, &field.name, &field.data_type, jv)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn get_by_dot_path<'a>(
    root: &'a serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Option<&'a serde_json::Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        match current {
            serde_json::Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn convert_json_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    v: &serde_json::Value,
) -> ExtractResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }

    let parse_error = |message: &str| ExtractError::ParseError {
        row,
        column: column.to_string(),
        raw: v.to_string(),
        message: message.to_string(),
    };

    match data_type {
        DataType::Object => Ok(untyped_json_value(v)),
        DataType::Utf8 | DataType::Categorical => v
            .as_str()
            .map(|s| Value::Utf8(s.to_string()))
            .ok_or_else(|| parse_error("expected string")),
        DataType::Bytes => v
            .as_str()
            .map(|s| Value::Bytes(s.as_bytes().to_vec()))
            .ok_or_else(|| parse_error("expected string")),
        DataType::Bool => v.as_bool().map(Value::Bool).ok_or_else(|| parse_error("expected bool")),
        DataType::Int64 => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else if let Some(n) = v.as_u64() {
                i64::try_from(n)
                    .map(Value::Int64)
                    .map_err(|_| parse_error("u64 out of range for i64"))
            } else {
                Err(parse_error("expected integer number"))
            }
        }
        DataType::Float64 => v.as_f64().map(Value::Float64).ok_or_else(|| parse_error("expected number")),
        DataType::Date => v
            .as_str()
            .and_then(parse_date)
            .map(Value::Date)
            .ok_or_else(|| parse_error("expected date string")),
        DataType::DateTime => v
            .as_str()
            .and_then(parse_datetime)
            .ok_or_else(|| parse_error("expected timestamp string")),
        DataType::Duration => v
            .as_str()
            .and_then(parse_duration)
            .map(Value::Duration)
            .ok_or_else(|| parse_error("expected duration string")),
    }
}

/// Untyped fields keep JSON's own types; nested arrays/objects are kept as JSON text.
fn untyped_json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map(Value::Float64).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Utf8(s.clone()),
        other => Value::Utf8(other.to_string()),
    }
}
