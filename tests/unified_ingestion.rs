use rust_dataframe_extract::ingestion::{load_from_path, LoadOptions, SourceFormat};
use rust_dataframe_extract::types::{DataType, Field, Schema};
use rust_dataframe_extract::ExtractError;

fn id_schema() -> Schema {
    Schema::new(vec![Field::new("id", DataType::Int64)])
}

#[test]
fn load_detects_format_from_extension() {
    let csv = load_from_path("tests/fixtures/people.csv", &id_schema(), &LoadOptions::default()).unwrap();
    assert_eq!(csv.row_count(), 3);

    let ndjson =
        load_from_path("tests/fixtures/events.ndjson", &id_schema(), &LoadOptions::default()).unwrap();
    assert_eq!(ndjson.row_count(), 2);
}

#[test]
fn explicit_format_overrides_extension() {
    let opts = LoadOptions {
        format: Some(SourceFormat::Json),
    };
    let ds = load_from_path("tests/fixtures/events.ndjson", &id_schema(), &opts).unwrap();
    assert_eq!(ds.row_count(), 2);
}

#[test]
fn unknown_extension_is_invalid_input() {
    let err = load_from_path("tests/fixtures/people.xlsx", &id_schema(), &LoadOptions::default())
        .unwrap_err();
    assert!(matches!(err, ExtractError::InvalidInput { .. }));
}
