//! Keyword-routed analysis over a normalized [`Table`].
//!
//! A query is classified into an [`Intent`] by ordered keyword rules and the
//! matching analysis runs against a read-only view of the table. Every path
//! returns an [`AnalysisResult`]; tables that lack the columns an analysis
//! needs get an explanatory answer with no visualization instead of an error.

pub mod analyses;
pub mod intent;
pub mod stats;

pub use intent::{classify, Intent};

use crate::models::{AnalysisResult, Table};

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryEngine;

impl QueryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn answer(&self, table: &Table, query: &str) -> AnalysisResult {
        let start = std::time::Instant::now();
        let intent = classify(query);
        let summary = table.summary();
        tracing::info!(
            "Routing query to {} ({} rows, {} numeric / {} categorical columns)",
            intent,
            summary.row_count,
            summary.numeric_columns.len(),
            summary.categorical_columns.len()
        );

        let result = match intent {
            Intent::Trend => analyses::trend(table, &summary),
            Intent::Statistics => analyses::statistics(table, &summary),
            Intent::Comparison => analyses::comparison(table, &summary),
            Intent::Extremes => analyses::extremes(table, &summary, query),
            Intent::Aggregates => analyses::aggregates(table, &summary),
            Intent::Correlation => analyses::correlation(table, &summary),
            Intent::General => analyses::general(table, &summary),
        };

        tracing::debug!(
            "{} produced a {} visualization in {:?}",
            intent,
            result.visualization.kind(),
            start.elapsed()
        );
        result
    }
}

pub fn answer(table: &Table, query: &str) -> AnalysisResult {
    QueryEngine::new().answer(table, query)
}
