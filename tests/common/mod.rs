#![allow(dead_code)]

use bytes::Bytes;
use sheet_insights::models::{Column, IngestMetadata, Table};
use sheet_insights::services::file_processor::normalize;

pub fn ingest_csv(contents: &str) -> (Table, IngestMetadata) {
    normalize(Bytes::from(contents.to_string()), "upload.csv").expect("normalize csv")
}

pub fn numbers(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

pub fn labels(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

pub fn table(columns: Vec<Column>) -> Table {
    Table::new(columns).expect("valid table")
}
