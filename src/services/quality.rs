use std::collections::HashSet;

use crate::models::{QualityIssue, Table};

const MAX_MISSING_PERCENT: f64 = 50.0;
const MIN_UNIQUE_RATIO: f64 = 0.01;
const MIN_ROWS_FOR_VARIETY: usize = 100;

/// Findings about a freshly normalized table. `duplicate_rows` is the count
/// observed before deduplication.
pub fn detect_quality_issues(table: &Table, duplicate_rows: usize) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    let rows = table.row_count();

    if rows > 0 {
        for column in table.columns() {
            let percent = column.missing_count() as f64 / rows as f64 * 100.0;
            if percent > MAX_MISSING_PERCENT {
                issues.push(QualityIssue::HighMissingRate {
                    column: column.name.clone(),
                    percent,
                });
            }
        }
    }

    if duplicate_rows > 0 {
        issues.push(QualityIssue::DuplicateRows {
            count: duplicate_rows,
        });
    }

    let unnamed = table
        .columns()
        .iter()
        .filter(|c| c.name.to_lowercase().contains("unnamed"))
        .count();
    if unnamed > 0 {
        issues.push(QualityIssue::UnnamedColumns { count: unnamed });
    }

    if rows > MIN_ROWS_FOR_VARIETY {
        for column in table.columns() {
            let Some(values) = column.as_text() else {
                continue;
            };
            let distinct: HashSet<&str> = values.iter().flatten().map(String::as_str).collect();
            let ratio = distinct.len() as f64 / rows as f64;
            if ratio < MIN_UNIQUE_RATIO {
                issues.push(QualityIssue::LowVariety {
                    column: column.name.clone(),
                    percent: ratio * 100.0,
                });
            }
        }
    }

    issues
}
