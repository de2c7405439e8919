use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TableError;

/// Semantic type of a column after ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// Cell storage for one column. `None` is the missing marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// Borrowed view of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellRef<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl CellRef<'_> {
    /// JSON value used for previews: missing becomes null, numbers are floats.
    pub fn to_json(&self) -> Value {
        match self {
            CellRef::Missing => Value::Null,
            CellRef::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellRef::Text(s) => Value::String((*s).to_string()),
        }
    }
}

impl fmt::Display for CellRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellRef::Missing => write!(f, "nan"),
            CellRef::Number(n) => write!(f, "{}", format_number(*n)),
            CellRef::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Renders integral floats without a fractional part (`3` instead of `3.0`).
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell(&self, row: usize) -> CellRef<'_> {
        match &self.data {
            ColumnData::Numeric(values) => match values.get(row) {
                Some(Some(v)) => CellRef::Number(*v),
                _ => CellRef::Missing,
            },
            ColumnData::Text(values) => match values.get(row) {
                Some(Some(s)) => CellRef::Text(s),
                _ => CellRef::Missing,
            },
        }
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Text(values) => Some(values),
            ColumnData::Numeric(_) => None,
        }
    }

    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(values) => values.iter().filter(|v| v.is_none()).count(),
            ColumnData::Text(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }
}

/// Ordered, rectangular collection of uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TableError::RaggedColumn {
                    column: bad.name.clone(),
                    expected,
                    found: bad.len(),
                });
            }
        }
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn summary(&self) -> ColumnSummary {
        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();
        for column in &self.columns {
            match column.kind() {
                ColumnKind::Numeric => numeric_columns.push(column.name.clone()),
                ColumnKind::Text => categorical_columns.push(column.name.clone()),
            }
        }
        ColumnSummary {
            numeric_columns,
            categorical_columns,
            row_count: self.row_count(),
            column_count: self.column_count(),
        }
    }
}

impl TryFrom<Vec<Column>> for Table {
    type Error = TableError;

    fn try_from(columns: Vec<Column>) -> Result<Self, Self::Error> {
        Table::new(columns)
    }
}

impl From<Table> for Vec<Column> {
    fn from(table: Table) -> Self {
        table.columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
}

/// A data-quality finding recorded at ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityIssue {
    HighMissingRate { column: String, percent: f64 },
    DuplicateRows { count: usize },
    UnnamedColumns { count: usize },
    LowVariety { column: String, percent: f64 },
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::HighMissingRate { column, percent } => {
                write!(f, "Column '{}' has {:.1}% missing values", column, percent)
            }
            QualityIssue::DuplicateRows { count } => write!(f, "Found {} duplicate rows", count),
            QualityIssue::UnnamedColumns { count } => write!(f, "Found {} unnamed columns", count),
            QualityIssue::LowVariety { column, percent } => write!(
                f,
                "Column '{}' has very low variety ({:.1}% unique values)",
                column, percent
            ),
        }
    }
}

impl Serialize for QualityIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Everything the normalizer learned about an upload besides the table itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestMetadata {
    pub sheet_names: Vec<String>,
    pub column_mapping: Map<String, Value>,
    pub row_count: usize,
    pub data_preview: Vec<Map<String, Value>>,
    pub data_quality_issues: Vec<QualityIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// One row of a tabular visualization. Keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow(Vec<(String, String)>);

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visualization {
    None,
    Line(Vec<ChartPoint>),
    Bar(Vec<ChartPoint>),
    Table(Vec<TableRow>),
}

impl Visualization {
    pub fn kind(&self) -> &'static str {
        match self {
            Visualization::None => "none",
            Visualization::Line(_) => "line",
            Visualization::Bar(_) => "bar",
            Visualization::Table(_) => "table",
        }
    }

    pub fn points(&self) -> &[ChartPoint] {
        match self {
            Visualization::Line(points) | Visualization::Bar(points) => points,
            _ => &[],
        }
    }

    pub fn rows(&self) -> &[TableRow] {
        match self {
            Visualization::Table(rows) => rows,
            _ => &[],
        }
    }
}

// `None` renders as `{}`; charts as `{type, data}`; tables as `{type, table}`.
impl Serialize for Visualization {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Visualization::None => serializer.serialize_map(Some(0))?.end(),
            Visualization::Line(points) | Visualization::Bar(points) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", self.kind())?;
                map.serialize_entry("data", points)?;
                map.end()
            }
            Visualization::Table(rows) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", self.kind())?;
                map.serialize_entry("table", rows)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub answer: String,
    pub visualization: Visualization,
    pub metadata: Map<String, Value>,
}
