use std::fmt;

/// Analysis a query is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Trend,
    Statistics,
    Comparison,
    Extremes,
    Aggregates,
    Correlation,
    General,
}

impl Intent {
    /// Value reported under `query_type` in result metadata.
    pub fn query_type(self) -> &'static str {
        match self {
            Intent::Trend => "trend_analysis",
            Intent::Statistics => "statistics",
            Intent::Comparison => "comparison",
            Intent::Extremes => "extremes",
            Intent::Aggregates => "aggregates",
            Intent::Correlation => "correlation",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_type())
    }
}

// Order is significant: the first matching rule wins.
const RULES: [(&[&str], Intent); 6] = [
    (&["trend", "over time", "timeline", "change"], Intent::Trend),
    (&["statistics", "stats", "summary", "describe"], Intent::Statistics),
    (&["compare", "comparison", "vs", "versus", "difference"], Intent::Comparison),
    (&["top", "bottom", "highest", "lowest", "best", "worst"], Intent::Extremes),
    (&["average", "mean", "median", "total", "sum", "count"], Intent::Aggregates),
    (&["correlation", "relationship", "relate", "connected"], Intent::Correlation),
];

const BOTTOM_KEYWORDS: [&str; 4] = ["bottom", "lowest", "worst", "minimum"];

/// Case-insensitive substring match against each rule in priority order.
pub fn classify(query: &str) -> Intent {
    let query = query.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| query.contains(k)))
        .map_or(Intent::General, |(_, intent)| *intent)
}

pub fn wants_bottom(query: &str) -> bool {
    let query = query.to_lowercase();
    BOTTOM_KEYWORDS.iter().any(|k| query.contains(k))
}
