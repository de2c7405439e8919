use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::intent::{wants_bottom, Intent};
use super::stats::{self, fmt2};
use crate::models::{AnalysisResult, ChartPoint, Column, ColumnSummary, Table, TableRow, Visualization};

pub const POINT_ROW_LIMIT: usize = 20;
pub const TREND_BINS: usize = 10;
pub const STATISTICS_COLUMN_LIMIT: usize = 5;
pub const GENERAL_COLUMN_LIMIT: usize = 5;
pub const TOP_N: usize = 10;

fn metadata(intent: Intent, extras: &[(&str, &str)]) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("query_type".into(), Value::from(intent.query_type()));
    for (key, value) in extras {
        map.insert((*key).to_string(), Value::from(*value));
    }
    map
}

fn fallback(intent: Intent, answer: &str) -> AnalysisResult {
    AnalysisResult {
        answer: answer.to_string(),
        visualization: Visualization::None,
        metadata: metadata(intent, &[]),
    }
}

fn numeric_values<'a>(table: &'a Table, name: &str) -> &'a [Option<f64>] {
    table.column(name).and_then(Column::as_numeric).unwrap_or(&[])
}

pub fn trend(table: &Table, summary: &ColumnSummary) -> AnalysisResult {
    let Some(column) = summary.numeric_columns.first() else {
        return fallback(
            Intent::Trend,
            "I couldn't find any numeric columns to analyze trends. Your data appears to be primarily categorical.",
        );
    };
    let values = numeric_values(table, column);

    let points: Vec<ChartPoint> = if values.len() <= POINT_ROW_LIMIT {
        values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| value.map(|v| ChartPoint::new(format!("Point {}", idx + 1), v)))
            .collect()
    } else {
        let sorted = stats::sorted_missing_last(values);
        stats::bin_ranges(sorted.len(), TREND_BINS)
            .into_iter()
            .enumerate()
            .map(|(idx, range)| {
                ChartPoint::new(format!("Segment {}", idx + 1), stats::mean(&sorted[range]))
            })
            .collect()
    };

    let answer = format!(
        "Based on the data analysis:\n\n\
         The column '{}' shows the following trend:\n\
         - Average value: {}\n\
         - Range: {} to {}\n\
         - Standard deviation: {}\n\n\
         The data has been visualized to show the distribution pattern across the dataset.",
        column,
        fmt2(stats::mean(values)),
        fmt2(stats::min(values)),
        fmt2(stats::max(values)),
        fmt2(stats::std_dev(values)),
    );

    AnalysisResult {
        answer,
        visualization: Visualization::Line(points),
        metadata: metadata(Intent::Trend, &[("column", column.as_str())]),
    }
}

pub fn statistics(table: &Table, summary: &ColumnSummary) -> AnalysisResult {
    let rows = summary
        .numeric_columns
        .iter()
        .take(STATISTICS_COLUMN_LIMIT)
        .map(|column| {
            let values = numeric_values(table, column);
            TableRow::new()
                .with("Column", column.as_str())
                .with("Mean", fmt2(stats::mean(values)))
                .with("Median", fmt2(stats::median(values)))
                .with("Std Dev", fmt2(stats::std_dev(values)))
                .with("Min", fmt2(stats::min(values)))
                .with("Max", fmt2(stats::max(values)))
        })
        .collect();

    let answer = format!(
        "Here's a statistical summary of your data:\n\n\
         Total rows: {}\n\
         Total columns: {}\n\
         Numeric columns: {}\n\
         Categorical columns: {}\n\n\
         Key statistics are shown in the table below for the main numeric columns.",
        summary.row_count,
        summary.column_count,
        summary.numeric_columns.len(),
        summary.categorical_columns.len(),
    );

    AnalysisResult {
        answer,
        visualization: Visualization::Table(rows),
        metadata: metadata(Intent::Statistics, &[]),
    }
}

pub fn comparison(table: &Table, summary: &ColumnSummary) -> AnalysisResult {
    let (Some(group_col), Some(value_col)) = (
        summary.categorical_columns.first(),
        summary.numeric_columns.first(),
    ) else {
        return fallback(
            Intent::Comparison,
            "I need both categorical and numeric columns to make comparisons. Please check your data structure.",
        );
    };

    let keys = table.column(group_col).and_then(Column::as_text).unwrap_or(&[]);
    let values = numeric_values(table, value_col);

    // Group keys come out in ascending order; missing keys are not a group.
    let mut groups: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
    for (key, value) in keys.iter().zip(values) {
        if let Some(key) = key {
            groups.entry(key.as_str()).or_default().push(*value);
        }
    }

    let mut means: Vec<(&str, f64)> = groups
        .iter()
        .map(|(key, group)| (*key, stats::mean(group)))
        .collect();
    means.sort_by(|a, b| stats::cmp_desc_nan_last(a.1, b.1));
    means.truncate(TOP_N);

    let top: Vec<Option<f64>> = means.iter().map(|(_, mean)| Some(*mean).filter(|m| !m.is_nan())).collect();
    let points = means
        .iter()
        .map(|(key, mean)| ChartPoint::new(*key, *mean))
        .collect();

    let answer = format!(
        "Comparison analysis of '{}' across different '{}':\n\n\
         The top performing categories are shown in the chart. The highest average value is {} and the lowest among the top 10 is {}.",
        value_col,
        group_col,
        fmt2(stats::max(&top)),
        fmt2(stats::min(&top)),
    );

    AnalysisResult {
        answer,
        visualization: Visualization::Bar(points),
        metadata: metadata(
            Intent::Comparison,
            &[("group_by", group_col.as_str()), ("metric", value_col.as_str())],
        ),
    }
}

/// Row indices of the `TOP_N` largest (or smallest) present values. Ties keep
/// their original row order.
pub fn extreme_rows(values: &[Option<f64>], bottom: bool) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_some()).collect();
    indices.sort_by(|&a, &b| {
        let (a, b) = (values[a].unwrap_or(f64::NAN), values[b].unwrap_or(f64::NAN));
        if bottom {
            a.total_cmp(&b)
        } else {
            b.total_cmp(&a)
        }
    });
    indices.truncate(TOP_N);
    indices
}

pub fn extremes(table: &Table, summary: &ColumnSummary, query: &str) -> AnalysisResult {
    let Some(target) = summary.numeric_columns.first() else {
        return fallback(
            Intent::Extremes,
            "I couldn't find numeric columns to identify top or bottom values.",
        );
    };
    let values = numeric_values(table, target);

    let bottom = wants_bottom(query);
    let direction = if bottom { "lowest" } else { "highest" };
    let selected = extreme_rows(values, bottom);

    let columns = table.columns();
    let label_column = match columns {
        [] | [_] => None,
        [first, second, ..] => Some(if &first.name != target { first } else { second }),
    };

    let points: Vec<ChartPoint> = selected
        .iter()
        .enumerate()
        .map(|(position, &row)| {
            let label = match label_column {
                Some(column) => column.cell(row).to_string(),
                None => format!("Row {}", position + 1),
            };
            ChartPoint::new(label, values[row].unwrap_or(f64::NAN))
        })
        .collect();

    let chosen: Vec<Option<f64>> = selected.iter().map(|&row| values[row]).collect();
    let answer = format!(
        "Here are the {} values in '{}':\n\n\
         Found {} entries with values ranging from {} to {}.",
        direction,
        target,
        points.len(),
        fmt2(stats::min(&chosen)),
        fmt2(stats::max(&chosen)),
    );

    AnalysisResult {
        answer,
        visualization: Visualization::Bar(points),
        metadata: metadata(
            Intent::Extremes,
            &[("column", target.as_str()), ("direction", direction)],
        ),
    }
}

pub fn aggregates(table: &Table, summary: &ColumnSummary) -> AnalysisResult {
    if summary.numeric_columns.is_empty() {
        return fallback(
            Intent::Aggregates,
            "No numeric columns found for aggregate calculations.",
        );
    }

    let rows = summary
        .numeric_columns
        .iter()
        .map(|column| {
            let values = numeric_values(table, column);
            TableRow::new()
                .with("Column", column.as_str())
                .with("Sum", fmt2(stats::sum(values)))
                .with("Average", fmt2(stats::mean(values)))
                .with("Median", fmt2(stats::median(values)))
                .with("Count", stats::count(values).to_string())
        })
        .collect();

    AnalysisResult {
        answer: "Aggregate calculations for your numeric columns:\n\n\
                 I've calculated sum, average, median, and count for each numeric column in your dataset."
            .to_string(),
        visualization: Visualization::Table(rows),
        metadata: metadata(Intent::Aggregates, &[]),
    }
}

pub fn strength_label(r: f64) -> &'static str {
    let r = r.abs();
    if r >= 0.7 {
        "Strong"
    } else if r >= 0.4 {
        "Moderate"
    } else if r >= 0.2 {
        "Weak"
    } else {
        "Very Weak"
    }
}

pub fn correlation(table: &Table, summary: &ColumnSummary) -> AnalysisResult {
    let numeric = &summary.numeric_columns;
    if numeric.len() < 2 {
        return fallback(
            Intent::Correlation,
            "I need at least two numeric columns to analyze correlations.",
        );
    }

    let mut pairs: Vec<(f64, TableRow)> = Vec::new();
    for (i, first) in numeric.iter().enumerate() {
        for second in &numeric[i + 1..] {
            let r = stats::pearson(numeric_values(table, first), numeric_values(table, second));
            let formatted = format!("{:.3}", r);
            // ranked by the value as displayed
            let rank = formatted.parse::<f64>().map_or(f64::NAN, f64::abs);
            let row = TableRow::new()
                .with("Column 1", first.as_str())
                .with("Column 2", second.as_str())
                .with("Correlation", formatted)
                .with("Strength", strength_label(r));
            pairs.push((rank, row));
        }
    }
    let total = pairs.len();

    pairs.sort_by(|a, b| stats::cmp_desc_nan_last(a.0, b.0));
    let rows = pairs.into_iter().take(TOP_N).map(|(_, row)| row).collect();

    let answer = format!(
        "Correlation analysis between numeric columns:\n\n\
         Found {} column pairs. The correlations range from -1 (perfect negative) to +1 (perfect positive).\n\n\
         Strong correlations indicate that columns tend to change together.",
        total
    );

    AnalysisResult {
        answer,
        visualization: Visualization::Table(rows),
        metadata: metadata(Intent::Correlation, &[]),
    }
}

pub fn general(table: &Table, summary: &ColumnSummary) -> AnalysisResult {
    let mut insights = vec![format!(
        "Your dataset contains {} rows and {} columns.",
        summary.row_count, summary.column_count
    )];
    if !summary.numeric_columns.is_empty() {
        insights.push(format!(
            "There are {} numeric columns for quantitative analysis.",
            summary.numeric_columns.len()
        ));
    }
    if !summary.categorical_columns.is_empty() {
        insights.push(format!(
            "There are {} categorical columns for grouping and segmentation.",
            summary.categorical_columns.len()
        ));
    }

    if summary.numeric_columns.is_empty() {
        return AnalysisResult {
            answer: insights.join("\n"),
            visualization: Visualization::None,
            metadata: metadata(Intent::General, &[]),
        };
    }

    let points = summary
        .numeric_columns
        .iter()
        .take(GENERAL_COLUMN_LIMIT)
        .map(|column| ChartPoint::new(column.as_str(), stats::mean(numeric_values(table, column))))
        .collect();

    AnalysisResult {
        answer: format!(
            "{}\n\nThe chart shows average values for your main numeric columns.",
            insights.join("\n")
        ),
        visualization: Visualization::Bar(points),
        metadata: metadata(Intent::General, &[]),
    }
}
