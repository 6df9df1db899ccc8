//! Parquet loading.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::DateTime;
use parquet::data_type::Decimal as ParquetDecimal;
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;
use rust_decimal::Decimal;

use super::{date_from_epoch_days, parse_text};
use crate::error::{ExtractError, ExtractResult};
use crate::types::{DataSet, DataType, Schema, Value};

/// Load a Parquet file into an in-memory `DataSet`.
///
/// Notes:
/// - Validates that all schema fields exist as Parquet leaf columns (by column path string)
/// - Uses the Parquet record API (`RowIter`)
/// - String cells under temporal fields are parsed like CSV text
pub fn load_parquet_from_path(path: impl AsRef<Path>, schema: &Schema) -> ExtractResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let available_columns = parquet_leaf_column_paths(&reader);
    for field in &schema.fields {
        if !available_columns.contains(field.name.as_str()) {
            return Err(ExtractError::SchemaMismatch {
                message: format!("missing required column '{}'", field.name),
            });
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let mut map: HashMap<&str, &Field> = HashMap::new();
        for (name, field) in row.get_column_iter() {
            map.insert(name.as_str(), field);
        }

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for f in &schema.fields {
            let v = map.get(f.name.as_str()).ok_or_else(|| ExtractError::SchemaMismatch {
                message: format!("row {row_num} missing required column '{}'", f.name),
            })?;
            out_row.push(convert_parquet_field(row_num, &f.name, &f.data_type, v)?);
        }
        rows.push(out_row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn parquet_leaf_column_paths<R: ChunkReader + 'static>(
    reader: &SerializedFileReader<R>,
) -> HashSet<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect()
}

fn convert_parquet_field(
    row: usize,
    column: &str,
    data_type: &DataType,
    f: &Field,
) -> ExtractResult<Value> {
    if matches!(f, Field::Null) {
        return Ok(Value::Null);
    }
    if let Field::Str(s) = f {
        if !matches!(data_type, DataType::Object) {
            return parse_text(row, column, data_type, s);
        }
    }

    let mismatch = |message: &str| ExtractError::ParseError {
        row,
        column: column.to_string(),
        raw: f.to_string(),
        message: message.to_string(),
    };

    match data_type {
        DataType::Object => Ok(untyped_field(f)),
        DataType::Utf8 | DataType::Categorical => Err(mismatch("expected string")),
        DataType::Bytes => match f {
            Field::Bytes(b) => Ok(Value::Bytes(b.data().to_vec())),
            _ => Err(mismatch("expected bytes")),
        },
        DataType::Bool => match f {
            Field::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(mismatch("expected bool")),
        },
        DataType::Int64 => match integer_field(f) {
            Some(Ok(v)) => Ok(Value::Int64(v)),
            Some(Err(())) => Err(mismatch("u64 out of range for i64")),
            None => Err(mismatch("expected integer")),
        },
        DataType::Float64 => match f {
            Field::Float(v) => Ok(Value::Float64(f64::from(*v))),
            Field::Double(v) => Ok(Value::Float64(*v)),
            _ => Err(mismatch("expected number")),
        },
        DataType::Date => match f {
            Field::Date(days) => date_from_epoch_days(*days)
                .map(Value::Date)
                .ok_or_else(|| mismatch("date out of range")),
            _ => Err(mismatch("expected date")),
        },
        DataType::DateTime => timestamp_field(f).ok_or_else(|| mismatch("expected timestamp")),
        DataType::Duration => Err(mismatch("expected duration string")),
    }
}

fn integer_field(f: &Field) -> Option<Result<i64, ()>> {
    let v = match f {
        Field::Byte(v) => i64::from(*v),
        Field::Short(v) => i64::from(*v),
        Field::Int(v) => i64::from(*v),
        Field::Long(v) => *v,
        Field::UByte(v) => i64::from(*v),
        Field::UShort(v) => i64::from(*v),
        Field::UInt(v) => i64::from(*v),
        Field::ULong(v) => return Some(i64::try_from(*v).map_err(|_| ())),
        _ => return None,
    };
    Some(Ok(v))
}

fn timestamp_field(f: &Field) -> Option<Value> {
    let dt = match f {
        Field::TimestampMillis(v) => DateTime::from_timestamp_millis(*v)?,
        Field::TimestampMicros(v) => DateTime::from_timestamp_micros(*v)?,
        _ => return None,
    };
    Some(Value::DateTime(dt.naive_utc()))
}

/// Untyped columns keep the Parquet physical/logical value.
fn untyped_field(f: &Field) -> Value {
    if let Some(v) = integer_field(f) {
        return match (v, f) {
            (Ok(v), _) => Value::Int64(v),
            (Err(()), Field::ULong(u)) => Value::Float64(*u as f64),
            (Err(()), _) => Value::Utf8(f.to_string()),
        };
    }
    if let Some(v) = timestamp_field(f) {
        return v;
    }
    match f {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Bool(*b),
        Field::Float(v) => Value::Float64(f64::from(*v)),
        Field::Double(v) => Value::Float64(*v),
        Field::Str(s) => Value::Utf8(s.clone()),
        Field::Bytes(b) => Value::Bytes(b.data().to_vec()),
        Field::Date(days) => date_from_epoch_days(*days)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        Field::Decimal(d) => decimal_value(d).unwrap_or_else(|| Value::Utf8(f.to_string())),
        other => Value::Utf8(other.to_string()),
    }
}

/// Parquet decimals are big-endian two's complement unscaled integers.
fn decimal_value(d: &ParquetDecimal) -> Option<Value> {
    let bytes = d.data();
    if bytes.is_empty() || bytes.len() > 16 {
        return None;
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    let unscaled = i128::from_be_bytes(buf);
    let scale = u32::try_from(d.scale()).ok()?;
    Decimal::try_from_i128_with_scale(unscaled, scale)
        .ok()
        .map(Value::Decimal)
}

#[cfg(test)]
mod tests {
    use parquet::record::Field;

    use super::convert_parquet_field;
    use crate::types::{DataType, Value};

    #[test]
    fn untyped_fields_keep_physical_types() {
        let v = convert_parquet_field(1, "c", &DataType::Object, &Field::Int(7)).unwrap();
        assert_eq!(v, Value::Int64(7));
        let v = convert_parquet_field(1, "c", &DataType::Object, &Field::ULong(u64::MAX)).unwrap();
        assert_eq!(v, Value::Float64(u64::MAX as f64));
        let v = convert_parquet_field(1, "c", &DataType::Object, &Field::Date(1)).unwrap();
        assert!(matches!(v, Value::Date(_)));
    }

    #[test]
    fn strings_under_temporal_fields_are_parsed() {
        let v = convert_parquet_field(
            1,
            "c",
            &DataType::Duration,
            &Field::Str("00:00:05".to_string()),
        )
        .unwrap();
        assert_eq!(v, Value::Duration(chrono::TimeDelta::seconds(5)));
    }
}
