use rust_dataframe_extract::ingestion::json::{load_json_from_path, load_json_from_str};
use rust_dataframe_extract::types::{DataType, Field, Schema, Value};

#[test]
fn load_json_array_with_nested_fields() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("user.name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ]);
    let ds = load_json_from_path("tests/fixtures/people.json", &schema).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[1][1], Value::Utf8("Grace".to_string()));
    assert_eq!(ds.rows[1][2], Value::Null);
}

#[test]
fn load_ndjson_with_temporal_fields() {
    let schema = Schema::new(vec![
        Field::new("at", DataType::DateTime),
        Field::new("wait", DataType::Duration),
        Field::new("tag", DataType::Object),
    ]);
    let ds = load_json_from_path("tests/fixtures/events.ndjson", &schema).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert!(matches!(ds.rows[1][0], Value::DateTime(_)));
    assert_eq!(ds.rows[0][1], Value::Duration(chrono::TimeDelta::minutes(5)));
    assert_eq!(ds.rows[1][1], Value::Null);
    assert_eq!(ds.rows[0][2], Value::Utf8("a".to_string()));
    assert_eq!(ds.rows[1][2], Value::Int64(7));
}

#[test]
fn load_json_errors_on_missing_field() {
    let schema = Schema::new(vec![Field::new("missing", DataType::Utf8)]);
    let msg = load_json_from_str(r#"[{"id": 1}]"#, &schema)
        .unwrap_err()
        .to_string();
    assert!(msg.contains("missing required field 'missing'"));
}

#[test]
fn load_json_errors_on_wrong_type() {
    let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
    let msg = load_json_from_str(r#"{"id": "one"}"#, &schema)
        .unwrap_err()
        .to_string();
    assert!(msg.contains("expected integer number"));
}
