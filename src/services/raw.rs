//! Untyped sheet contents as they come out of a decoder, before cleaning.

use std::collections::HashMap;

pub const SOURCE_SHEET_COLUMN: &str = "_source_sheet";

const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Cell texts that stand for a missing value.
pub fn is_missing_marker(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Missing,
    Number(f64),
    Text(String),
}

impl RawCell {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawCell::Missing)
    }
}

/// Hashable identity of a cell, used for exact-duplicate row detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Missing,
    Number(u64),
    Text(String),
}

impl From<&RawCell> for CellKey {
    fn from(cell: &RawCell) -> Self {
        match cell {
            RawCell::Missing => CellKey::Missing,
            // normalise -0.0 so it compares equal to 0.0
            RawCell::Number(n) => CellKey::Number((n + 0.0).to_bits()),
            RawCell::Text(s) => CellKey::Text(s.clone()),
        }
    }
}

/// A header row plus data rows. Rows may be narrower than the header;
/// absent trailing cells are treated as missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawSheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.headers.is_empty()
    }
}

/// Concatenates sheets row-wise, aligning columns by header text and adding
/// a `_source_sheet` column. Repeated headers within one sheet align by
/// occurrence, so the second `total` of one sheet lines up with the second
/// `total` of another.
pub fn merge_sheets(sheets: Vec<(String, RawSheet)>) -> RawSheet {
    let mut union: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<(String, usize), usize> = HashMap::new();

    let mut layouts = Vec::with_capacity(sheets.len());
    for (name, sheet) in &sheets {
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let headers = sheet
            .headers
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(SOURCE_SHEET_COLUMN));
        let layout: Vec<usize> = headers
            .map(|header| {
                let seen = occurrences.entry(header).or_insert(0);
                let key = (header.to_string(), *seen);
                *seen += 1;
                *positions.entry(key.clone()).or_insert_with(|| {
                    union.push(key);
                    union.len() - 1
                })
            })
            .collect();
        layouts.push((name.clone(), layout));
    }

    let mut rows = Vec::new();
    for ((_, sheet), (name, layout)) in sheets.into_iter().zip(layouts) {
        let source = layout[layout.len() - 1];
        for row in sheet.rows {
            let mut merged = vec![RawCell::Missing; union.len()];
            for (cell, &target) in row.into_iter().zip(&layout[..layout.len() - 1]) {
                merged[target] = cell;
            }
            merged[source] = RawCell::Text(name.clone());
            rows.push(merged);
        }
    }

    RawSheet {
        headers: union.into_iter().map(|(header, _)| header).collect(),
        rows,
    }
}
