use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use rust_dataframe_extract::coercion::{CellValue, DateParts};
use rust_dataframe_extract::ingestion::parquet::load_parquet_from_path;
use rust_dataframe_extract::session::{ConversionSession, WriteOptions};
use rust_dataframe_extract::sink::MemoryExtractStore;
use rust_dataframe_extract::types::{DataType, Field, Schema, Value};
use rust_dataframe_extract::StaticType;

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("rust-dataframe-extract-{name}-{nanos}.parquet"))
}

// 2024-01-15 is day 19737 since the Unix epoch.
const BORN_DAYS: [i32; 2] = [19_737, 0];

fn write_people_parquet(path: &PathBuf) {
    let schema_str = r#"
    message schema {
      REQUIRED INT64 id;
      REQUIRED BINARY name (UTF8);
      OPTIONAL DOUBLE score;
      REQUIRED INT32 born (DATE);
    }
    "#;

    let schema = Arc::new(parse_message_type(schema_str).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut rg = writer.next_row_group().unwrap();
    while let Some(mut col) = rg.next_column().unwrap() {
        match col.untyped() {
            ColumnWriter::Int64ColumnWriter(w) => {
                w.write_batch(&[1_i64, 2_i64], None, None).unwrap();
            }
            ColumnWriter::ByteArrayColumnWriter(w) => {
                let names = [ByteArray::from("Ada"), ByteArray::from("Grace")];
                w.write_batch(&names, None, None).unwrap();
            }
            ColumnWriter::DoubleColumnWriter(w) => {
                // Second row is null.
                w.write_batch(&[98.5_f64], Some(&[1, 0]), None).unwrap();
            }
            ColumnWriter::Int32ColumnWriter(w) => {
                w.write_batch(&BORN_DAYS, None, None).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        }
        col.close().unwrap();
    }
    rg.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn load_parquet_reads_logical_types_and_nulls() {
    let path = tmp_file("people");
    write_people_parquet(&path);

    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("name", DataType::Utf8),
        Field::new("score", DataType::Object),
        Field::new("born", DataType::Date),
    ]);
    let ds = load_parquet_from_path(&path, &schema).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[0][1], Value::Utf8("Ada".to_string()));
    assert_eq!(ds.rows[0][2], Value::Float64(98.5));
    assert_eq!(ds.rows[1][2], Value::Null);
    assert!(matches!(ds.rows[1][3], Value::Date(_)));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn parquet_dates_reach_the_extract_as_date_parts() {
    let path = tmp_file("dates");
    write_people_parquet(&path);

    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("born", DataType::Object),
    ]);
    let session = ConversionSession::new(load_parquet_from_path(&path, &schema).unwrap()).unwrap();
    assert_eq!(
        session.columns().static_types(),
        vec![StaticType::Integer, StaticType::Date]
    );

    let store = MemoryExtractStore::new();
    session
        .write_to(&store, "people.extract", &WriteOptions::default())
        .unwrap();
    let table = store.table("people.extract", "Extract").unwrap();
    assert_eq!(
        table.rows[0][1],
        CellValue::Date(DateParts {
            year: 2024,
            month: 1,
            day: 15,
        })
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn load_parquet_errors_on_missing_column() {
    let path = tmp_file("missing");
    write_people_parquet(&path);

    let schema = Schema::new(vec![Field::new("active", DataType::Bool)]);
    let msg = load_parquet_from_path(&path, &schema)
        .unwrap_err()
        .to_string();
    assert!(msg.contains("missing required column 'active'"));

    let _ = std::fs::remove_file(&path);
}
