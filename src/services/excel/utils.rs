use calamine::Data;

use crate::models::format_number;
use crate::services::raw::RawCell;

pub fn cell_to_raw(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Missing,
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Bool(b) => RawCell::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => RawCell::Text(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => RawCell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}

/// Header text for a cell in the header row. Blank cells become `""` and
/// are renamed later by column-name normalization.
pub fn header_text(cell: &Data) -> String {
    match cell_to_raw(cell) {
        RawCell::Missing => String::new(),
        RawCell::Number(n) => format_number(n),
        RawCell::Text(s) => s,
    }
}
