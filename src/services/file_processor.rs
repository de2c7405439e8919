use std::collections::HashSet;
use std::path::Path;

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::IngestError;
use crate::models::{format_number, Column, IngestMetadata, Table};
use crate::services::csv_reader;
use crate::services::excel::{ExcelProcessor, WorkbookFormat};
use crate::services::quality;
use crate::services::raw::{is_missing_marker, CellKey, RawCell, RawSheet};

pub const UNNAMED_COLUMN: &str = "unnamed_column";
pub const PREVIEW_ROWS: usize = 10;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Workbook(WorkbookFormat),
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Result<Self, IngestError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("xlsx") => Ok(FileFormat::Workbook(WorkbookFormat::Xlsx)),
            Some("xls") => Ok(FileFormat::Workbook(WorkbookFormat::Xls)),
            _ => Err(IngestError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Turns uploaded bytes into a clean, typed [`Table`] plus metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileProcessor;

impl FileProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, file_data: Bytes, filename: &str) -> Result<(Table, IngestMetadata), IngestError> {
        let start = std::time::Instant::now();
        tracing::info!("Processing {} ({}KB)", filename, file_data.len() / 1024);

        let (raw, sheet_names) = match FileFormat::from_filename(filename)? {
            FileFormat::Csv => (csv_reader::read_csv(&file_data)?, Vec::new()),
            FileFormat::Workbook(format) => ExcelProcessor.read(file_data, format)?,
        };
        tracing::debug!("Raw sheet has {} columns, {} rows", raw.headers.len(), raw.rows.len());

        let CleanedSheet { table, duplicate_rows } = clean_sheet(raw)?;
        let issues = quality::detect_quality_issues(&table, duplicate_rows);
        let metadata = build_metadata(&table, sheet_names, issues);

        tracing::info!(
            "Normalized {} into {} rows x {} columns with {} quality issues in {:?}",
            filename,
            table.row_count(),
            table.column_count(),
            metadata.data_quality_issues.len(),
            start.elapsed()
        );
        Ok((table, metadata))
    }
}

pub fn normalize(file_data: Bytes, filename: &str) -> Result<(Table, IngestMetadata), IngestError> {
    FileProcessor::new().process(file_data, filename)
}

pub fn clean_column_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return UNNAMED_COLUMN.to_string();
    }

    let cleaned = NON_WORD.replace_all(trimmed, "_");
    let cleaned = WHITESPACE.replace_all(&cleaned, "_").to_lowercase();
    let cleaned = UNDERSCORES.replace_all(&cleaned, "_");
    let cleaned = cleaned.trim_matches('_');

    if cleaned.is_empty() {
        UNNAMED_COLUMN.to_string()
    } else {
        cleaned.to_string()
    }
}

#[derive(Debug)]
pub struct CleanedSheet {
    pub table: Table,
    /// Exact duplicate rows seen before they were removed.
    pub duplicate_rows: usize,
}

pub fn clean_sheet(raw: RawSheet) -> Result<CleanedSheet, IngestError> {
    let mut seen_names = HashSet::new();
    let kept: Vec<(usize, String)> = raw
        .headers
        .iter()
        .map(|header| clean_column_name(header))
        .enumerate()
        .filter(|(_, name)| seen_names.insert(name.clone()))
        .collect();
    if kept.len() < raw.headers.len() {
        tracing::debug!("Dropped {} duplicate columns", raw.headers.len() - kept.len());
    }

    let mut seen_rows: HashSet<Vec<CellKey>> = HashSet::new();
    let mut duplicate_rows = 0usize;
    let mut empty_rows = 0usize;
    let mut rows: Vec<Vec<RawCell>> = Vec::with_capacity(raw.rows.len());
    for row in raw.rows {
        let projected: Vec<RawCell> = kept
            .iter()
            .map(|(idx, _)| row.get(*idx).cloned().unwrap_or(RawCell::Missing))
            .collect();
        if projected.iter().all(RawCell::is_missing) {
            empty_rows += 1;
            continue;
        }
        if !seen_rows.insert(projected.iter().map(CellKey::from).collect()) {
            duplicate_rows += 1;
            continue;
        }
        rows.push(projected);
    }
    // Trimming happens after row cleaning, so padded cells still count as distinct.
    for row in &mut rows {
        for cell in row.iter_mut() {
            *cell = trim_cell(cell);
        }
    }
    tracing::debug!("Dropped {} empty and {} duplicate rows", empty_rows, duplicate_rows);

    let columns = kept
        .into_iter()
        .enumerate()
        .map(|(position, (_, name))| {
            let cells: Vec<&RawCell> = rows.iter().map(|row| &row[position]).collect();
            coerce_column(name, &cells)
        })
        .collect();

    Ok(CleanedSheet {
        table: Table::new(columns)?,
        duplicate_rows,
    })
}

fn trim_cell(cell: &RawCell) -> RawCell {
    match cell {
        RawCell::Text(s) => {
            let trimmed = s.trim();
            if is_missing_marker(trimmed) {
                RawCell::Missing
            } else {
                RawCell::Text(trimmed.to_string())
            }
        }
        other => other.clone(),
    }
}

/// A column becomes numeric only if every non-missing cell is a number or
/// parses as a finite one; otherwise every cell stays text.
fn coerce_column(name: String, cells: &[&RawCell]) -> Column {
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            RawCell::Missing => Some(None),
            RawCell::Number(n) => Some(Some(*n)),
            RawCell::Text(s) => parse_number(s).map(Some),
        })
        .collect();

    match numbers {
        Some(values) => Column::numeric(name, values),
        None => Column::text(
            name,
            cells
                .iter()
                .map(|cell| match cell {
                    RawCell::Missing => None,
                    RawCell::Number(n) => Some(format_number(*n)),
                    RawCell::Text(s) => Some(s.clone()),
                })
                .collect(),
        ),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn build_metadata(
    table: &Table,
    sheet_names: Vec<String>,
    issues: Vec<crate::models::QualityIssue>,
) -> IngestMetadata {
    let column_mapping: Map<String, Value> = table
        .columns()
        .iter()
        .map(|c| (c.name.clone(), Value::String(c.kind().to_string())))
        .collect();

    let data_preview = (0..table.row_count().min(PREVIEW_ROWS))
        .map(|idx| {
            table
                .columns()
                .iter()
                .map(|c| (c.name.clone(), c.cell(idx).to_json()))
                .collect::<Map<String, Value>>()
        })
        .collect();

    IngestMetadata {
        sheet_names,
        column_mapping,
        row_count: table.row_count(),
        data_preview,
        data_quality_issues: issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKind;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn clean_column_name_examples() {
        assert_eq!(clean_column_name("  Total Sales ($) "), "total_sales");
        assert_eq!(clean_column_name("Q1 -- Revenue"), "q1_revenue");
        assert_eq!(clean_column_name("   "), UNNAMED_COLUMN);
        assert_eq!(clean_column_name("%%%"), UNNAMED_COLUMN);
        assert_eq!(clean_column_name("Straße"), "straße");
        assert_eq!(clean_column_name("__id__"), "id");
    }

    #[test]
    fn detects_file_format_from_extension() {
        assert_eq!(FileFormat::from_filename("a.CSV").unwrap(), FileFormat::Csv);
        assert_eq!(
            FileFormat::from_filename("report.xlsx").unwrap(),
            FileFormat::Workbook(WorkbookFormat::Xlsx)
        );
        assert_eq!(
            FileFormat::from_filename("old.xls").unwrap(),
            FileFormat::Workbook(WorkbookFormat::Xls)
        );
        assert!(matches!(
            FileFormat::from_filename("notes.txt"),
            Err(IngestError::UnsupportedFormat(_))
        ));
        assert!(FileFormat::from_filename("csv").is_err());
    }

    #[test]
    fn later_duplicate_columns_are_dropped() {
        let raw = RawSheet::new(
            vec!["Amount".into(), "amount ".into(), "Region".into()],
            vec![vec![text("1"), text("2"), text("n")]],
        );
        let cleaned = clean_sheet(raw).unwrap();
        assert_eq!(cleaned.table.column_names(), vec!["amount", "region"]);
        assert_eq!(
            cleaned.table.column("amount").unwrap().as_numeric().unwrap(),
            &[Some(1.0)]
        );
    }

    #[test]
    fn empty_and_duplicate_rows_are_removed() {
        let raw = RawSheet::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![text("x"), text("1")],
                vec![RawCell::Missing, RawCell::Missing],
                vec![text("x"), text("1")],
                vec![text("y")],
            ],
        );
        let cleaned = clean_sheet(raw).unwrap();
        assert_eq!(cleaned.table.row_count(), 2);
        assert_eq!(cleaned.duplicate_rows, 1);
        assert_eq!(
            cleaned.table.column("a").unwrap().as_text().unwrap(),
            &[Some("x".to_string()), Some("y".to_string())]
        );
    }

    #[test]
    fn padding_is_trimmed_only_after_row_cleaning() {
        let raw = RawSheet::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![text("x"), text("1")],
                vec![text(" x "), text("1")],
                vec![text("   "), text("  ")],
            ],
        );
        let cleaned = clean_sheet(raw).unwrap();
        assert_eq!(cleaned.duplicate_rows, 0);
        assert_eq!(cleaned.table.row_count(), 3);
        assert_eq!(
            cleaned.table.column("a").unwrap().as_text().unwrap(),
            &[Some("x".to_string()), Some("x".to_string()), None]
        );
        assert_eq!(
            cleaned.table.column("b").unwrap().as_numeric().unwrap(),
            &[Some(1.0), Some(1.0), None]
        );
    }

    #[test]
    fn coercion_is_all_or_nothing() {
        let raw = RawSheet::new(
            vec!["mixed".into(), "nums".into()],
            vec![
                vec![text("1"), text(" 2.5 ")],
                vec![text("two"), RawCell::Number(3.0)],
                vec![RawCell::Number(4.0), RawCell::Missing],
            ],
        );
        let table = clean_sheet(raw).unwrap().table;

        let mixed = table.column("mixed").unwrap();
        assert_eq!(mixed.kind(), ColumnKind::Text);
        assert_eq!(
            mixed.as_text().unwrap(),
            &[Some("1".to_string()), Some("two".to_string()), Some("4".to_string())]
        );

        let nums = table.column("nums").unwrap();
        assert_eq!(nums.as_numeric().unwrap(), &[Some(2.5), Some(3.0), None]);
    }

    #[test]
    fn infinities_do_not_count_as_numbers() {
        let raw = RawSheet::new(vec!["v".into()], vec![vec![text("inf")], vec![text("1")]]);
        let table = clean_sheet(raw).unwrap().table;
        assert_eq!(table.column("v").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn metadata_preview_is_capped() {
        let rows = (0..15).map(|i| vec![text(&i.to_string())]).collect();
        let table = clean_sheet(RawSheet::new(vec!["n".into()], rows)).unwrap().table;
        let metadata = build_metadata(&table, Vec::new(), Vec::new());
        assert_eq!(metadata.row_count, 15);
        assert_eq!(metadata.data_preview.len(), PREVIEW_ROWS);
        assert_eq!(metadata.data_preview[3]["n"], serde_json::json!(3.0));
        assert_eq!(metadata.column_mapping["n"], serde_json::json!("numeric"));
    }
}
