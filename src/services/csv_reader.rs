//! CSV decoding with encoding fall-through.
//!
//! Bytes are decoded with each candidate encoding in turn; the first encoding
//! that both decodes cleanly and yields well-formed records wins.

use encoding_rs::Encoding;
use tracing::{debug, warn};

use super::raw::{is_missing_marker, RawCell, RawSheet};
use crate::error::IngestError;

/// Candidate encodings, in priority order. Several labels resolve to the
/// same WHATWG encoding; duplicates are only attempted once.
pub const CANDIDATE_ENCODINGS: [&str; 4] = ["utf-8", "latin1", "iso-8859-1", "cp1252"];

pub fn read_csv(bytes: &[u8]) -> Result<RawSheet, IngestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestError::EmptyFile);
    }

    let mut tried: Vec<&'static Encoding> = Vec::new();
    for label in CANDIDATE_ENCODINGS {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            continue;
        };
        if tried.contains(&encoding) {
            continue;
        }
        tried.push(encoding);

        let text = match decode_bytes(bytes, encoding) {
            Some(text) => text,
            None => {
                warn!("CSV bytes are not valid {}, trying next encoding", encoding.name());
                continue;
            }
        };

        match parse_records(&text) {
            Ok(sheet) => {
                debug!(
                    "Decoded CSV as {} ({} columns, {} rows)",
                    encoding.name(),
                    sheet.headers.len(),
                    sheet.rows.len()
                );
                if sheet.headers.is_empty() {
                    return Err(IngestError::EmptyFile);
                }
                return Ok(sheet);
            }
            Err(e) => {
                warn!("CSV parse failed with {}: {}", encoding.name(), e);
            }
        }
    }

    Err(IngestError::Decode)
}

fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

fn parse_records(text: &str) -> Result<RawSheet, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .double_quote(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            return Err(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "expected {} fields on line {}, saw {}",
                    headers.len(),
                    line,
                    record.len()
                ),
            )));
        }
        rows.push(record.iter().map(to_raw_cell).collect());
    }

    Ok(RawSheet::new(headers, rows))
}

fn to_raw_cell(field: &str) -> RawCell {
    if is_missing_marker(field) {
        RawCell::Missing
    } else {
        RawCell::Text(field.to_string())
    }
}
