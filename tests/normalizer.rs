mod common;

use bytes::Bytes;
use serde_json::{json, Value};
use sheet_insights::error::IngestError;
use sheet_insights::models::ColumnKind;
use sheet_insights::services::file_processor::normalize;

use common::ingest_csv;

#[test]
fn csv_headers_are_cleaned_and_types_inferred() {
    let (table, metadata) = ingest_csv("Order ID, Customer Name ,Total ($)\n1,Alice,10.5\n2,Bob,20\n");

    assert_eq!(table.column_names(), vec!["order_id", "customer_name", "total"]);
    assert_eq!(table.column("order_id").expect("order_id").kind(), ColumnKind::Numeric);
    assert_eq!(table.column("customer_name").expect("customer_name").kind(), ColumnKind::Text);
    assert_eq!(
        table.column("total").expect("total").as_numeric().expect("numeric"),
        &[Some(10.5), Some(20.0)]
    );

    assert_eq!(metadata.row_count, 2);
    assert!(metadata.sheet_names.is_empty());
    assert_eq!(
        Value::Object(metadata.column_mapping.clone()),
        json!({"order_id": "numeric", "customer_name": "text", "total": "numeric"})
    );
    assert_eq!(
        serde_json::to_value(&metadata.data_preview).expect("preview json"),
        json!([
            {"order_id": 1.0, "customer_name": "Alice", "total": 10.5},
            {"order_id": 2.0, "customer_name": "Bob", "total": 20.0}
        ])
    );
}

#[test]
fn cp1252_bytes_fall_back_to_windows_encoding() {
    let bytes = Bytes::from_static(b"name,price\ncaf\xe9,\x805\n");
    let (table, _) = normalize(bytes, "menu.csv").expect("decode cp1252");

    let names = table.column("name").expect("name").as_text().expect("text");
    assert_eq!(names, &[Some("café".to_string())]);
    let prices = table.column("price").expect("price").as_text().expect("text");
    assert_eq!(prices, &[Some("€5".to_string())]);
}

#[test]
fn utf8_bom_is_not_part_of_first_header() {
    let (table, _) = ingest_csv("\u{feff}Region,Sales\nnorth,1\n");
    assert_eq!(table.column_names(), vec!["region", "sales"]);
}

#[test]
fn duplicate_headers_keep_first_column() {
    let (table, _) = ingest_csv("Amount,amount ,AMOUNT\n1,2,3\n4,5,6\n");

    assert_eq!(table.column_names(), vec!["amount"]);
    assert_eq!(
        table.column("amount").expect("amount").as_numeric().expect("numeric"),
        &[Some(1.0), Some(4.0)]
    );
}

#[test]
fn empty_and_duplicate_rows_are_removed() {
    let (table, metadata) = ingest_csv("city,visits\nParis,3\n,\nNA,n/a\nParis,3\nRome,4\n");

    assert_eq!(table.row_count(), 2);
    assert_eq!(metadata.row_count, 2);
    let issues: Vec<String> = metadata.data_quality_issues.iter().map(ToString::to_string).collect();
    assert_eq!(issues, vec!["Found 1 duplicate rows"]);
}

#[test]
fn padded_cells_are_not_merged_or_dropped_as_empty() {
    let (table, metadata) = ingest_csv("a,b\n x ,1\nx,1\n");
    assert_eq!(table.row_count(), 2);
    assert!(metadata.data_quality_issues.is_empty());
    assert_eq!(
        table.column("a").expect("a").as_text().expect("text"),
        &[Some("x".to_string()), Some("x".to_string())]
    );

    let (table, _) = ingest_csv("a,b\n  ,  \nx,1\n");
    assert_eq!(table.row_count(), 2);
    assert_eq!(
        table.column("b").expect("b").as_numeric().expect("numeric"),
        &[None, Some(1.0)]
    );
}

#[test]
fn one_bad_value_keeps_whole_column_as_text() {
    let (table, _) = ingest_csv("code\n10\n20\nN/A\nx30\n");

    let column = table.column("code").expect("code");
    assert_eq!(column.kind(), ColumnKind::Text);
    assert_eq!(
        column.as_text().expect("text"),
        &[Some("10".to_string()), Some("20".to_string()), None, Some("x30".to_string())]
    );
}

#[test]
fn quality_issues_are_reported_in_order() {
    let (_, metadata) = ingest_csv("id,notes,\n1,,x\n2,,y\n3,hello,z\n2,,y\n");

    let issues: Vec<String> = metadata.data_quality_issues.iter().map(ToString::to_string).collect();
    assert_eq!(
        issues,
        vec![
            "Column 'notes' has 66.7% missing values",
            "Found 1 duplicate rows",
            "Found 1 unnamed columns",
        ]
    );
}

#[test]
fn low_variety_needs_more_than_a_hundred_rows() {
    let mut csv = String::from("status,value\n");
    for i in 0..150 {
        csv.push_str(&format!("open,{}\n", i));
    }
    let (_, metadata) = ingest_csv(&csv);

    let issues: Vec<String> = metadata.data_quality_issues.iter().map(ToString::to_string).collect();
    assert_eq!(issues, vec!["Column 'status' has very low variety (0.7% unique values)"]);
}

#[test]
fn preview_is_capped_at_ten_rows() {
    let mut csv = String::from("n\n");
    for i in 0..25 {
        csv.push_str(&format!("{}\n", i));
    }
    let (table, metadata) = ingest_csv(&csv);

    assert_eq!(table.row_count(), 25);
    assert_eq!(metadata.data_preview.len(), 10);
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = normalize(Bytes::from_static(b"a,b\n1,2\n"), "notes.txt").expect_err("txt is unsupported");
    assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    assert_eq!(err.to_string(), "Unsupported file format: notes.txt");
}

#[test]
fn empty_csv_is_an_error() {
    let err = normalize(Bytes::from_static(b"  \n"), "empty.csv").expect_err("empty input");
    assert!(matches!(err, IngestError::EmptyFile));
}

#[test]
fn garbage_workbook_reports_spreadsheet_error() {
    let err = normalize(Bytes::from_static(b"not a zip archive"), "book.xlsx").expect_err("bad xlsx");
    assert!(matches!(err, IngestError::Spreadsheet(_)));
    assert!(err.to_string().starts_with("Error reading Excel file"));
}
