use std::io::Cursor;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};

use super::utils::{cell_to_raw, header_text};
use crate::error::IngestError;
use crate::services::raw::{merge_sheets, RawSheet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Xlsx,
    Xls,
}

pub struct ExcelProcessor;

impl ExcelProcessor {
    /// Reads every sheet of a workbook and returns the combined sheet plus
    /// the workbook's sheet names.
    pub fn read(&self, file_data: Bytes, format: WorkbookFormat) -> Result<(RawSheet, Vec<String>), IngestError> {
        match format {
            WorkbookFormat::Xlsx => self.read_with::<Xlsx<_>>(file_data),
            WorkbookFormat::Xls => self.read_with::<Xls<_>>(file_data),
        }
    }

    fn read_with<W>(&self, file_data: Bytes) -> Result<(RawSheet, Vec<String>), IngestError>
    where
        W: Reader<Cursor<Bytes>>,
        W::Error: std::fmt::Display,
    {
        let cursor = Cursor::new(file_data);
        let mut workbook: W = open_workbook_from_rs(cursor).map_err(|e| {
            tracing::error!("Failed to open workbook: {}", e);
            IngestError::Spreadsheet(format!("Failed to open workbook: {}", e))
        })?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

        let sheet = combine_sheets(&sheet_names, |name| {
            workbook
                .worksheet_range(name)
                .map(|range| range_to_sheet(&range))
                .map_err(|e| IngestError::Spreadsheet(format!("Failed to read worksheet {}: {}", name, e)))
        })?;

        Ok((sheet, sheet_names))
    }
}

/// Picks the sheet(s) that make up the table. A lone sheet is used as is;
/// several sheets are merged, skipping any that fail or hold no data rows.
/// When nothing survives, the first sheet is loaded on its own.
pub fn combine_sheets<F>(sheet_names: &[String], mut load: F) -> Result<RawSheet, IngestError>
where
    F: FnMut(&str) -> Result<RawSheet, IngestError>,
{
    let first = sheet_names
        .first()
        .ok_or_else(|| IngestError::Spreadsheet("Workbook contains no sheets".to_string()))?;

    if sheet_names.len() == 1 {
        return load(first);
    }

    let mut loaded = Vec::new();
    for name in sheet_names {
        match load(name) {
            Ok(sheet) if sheet.is_empty() => {
                tracing::warn!("Sheet {} is empty, skipping", name);
            }
            Ok(sheet) => loaded.push((name.clone(), sheet)),
            Err(e) => {
                tracing::warn!("Skipping sheet {}: {}", name, e);
            }
        }
    }

    if loaded.is_empty() {
        tracing::warn!("No sheet could be merged, falling back to {}", first);
        return load(first);
    }

    tracing::info!("Merging {} of {} sheets", loaded.len(), sheet_names.len());
    Ok(merge_sheets(loaded))
}

/// First row is the header, remaining rows are data.
pub fn range_to_sheet(range: &Range<Data>) -> RawSheet {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(header_text).collect(),
        None => return RawSheet::default(),
    };
    let rows = rows.map(|row| row.iter().map(cell_to_raw).collect()).collect();
    RawSheet::new(headers, rows)
}
