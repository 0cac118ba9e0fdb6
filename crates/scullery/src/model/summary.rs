//! Dataset and column summaries produced by ingestion.

use serde::{Deserialize, Serialize};

/// Longest sample value kept for display before truncation.
const MAX_SAMPLE_LEN: usize = 15;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Whole numbers (no decimal point).
    Integer,
    /// Floating-point numbers.
    Float,
    /// Boolean values (true/false).
    Bool,
    /// Date values.
    Date,
    /// Text/string values.
    Text,
    /// Unable to determine type.
    Unknown,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl Default for ColumnType {
    fn default() -> Self {
        ColumnType::Unknown
    }
}

/// Statistics for numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
}

impl NumericSummary {
    /// Interquartile range.
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Lower and upper outlier fences (`q1 - mult*iqr`, `q3 + mult*iqr`).
    pub fn fences(&self, multiplier: f64) -> (f64, f64) {
        let iqr = self.iqr();
        (self.q1 - multiplier * iqr, self.q3 + multiplier * iqr)
    }

    /// Check if a value falls outside the IQR fences.
    pub fn is_outlier(&self, value: f64, multiplier: f64) -> bool {
        let (lower, upper) = self.fences(multiplier);
        value < lower || value > upper
    }
}

/// Summary of a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub dtype: ColumnType,
    /// Number of missing values.
    pub missing_count: usize,
    /// Missing values as a percentage of total rows.
    pub missing_percentage: f64,
    /// Number of unique non-missing values.
    pub unique_count: usize,
    /// Bounded sample of raw values for display.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_values: Vec<String>,
    /// Numeric statistics (for numeric columns).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
}

impl ColumnSummary {
    /// Create a summary; the missing percentage is derived from the counts,
    /// never supplied.
    pub fn new(
        name: impl Into<String>,
        dtype: ColumnType,
        missing_count: usize,
        total_rows: usize,
        unique_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            dtype,
            missing_count,
            missing_percentage: percentage(missing_count, total_rows),
            unique_count,
            sample_values: Vec::new(),
            numeric: None,
        }
    }

    /// Attach display samples, truncated for presentation.
    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.sample_values = samples.into_iter().map(|s| truncate_sample(&s)).collect();
        self
    }

    /// Attach numeric statistics.
    pub fn with_numeric(mut self, numeric: NumericSummary) -> Self {
        self.numeric = Some(numeric);
        self
    }
}

/// Summary of an ingested dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Total number of data rows.
    pub total_rows: usize,
    /// Total number of columns; always `columns.len()`.
    pub total_columns: usize,
    /// One summary per column, in source order.
    pub columns: Vec<ColumnSummary>,
}

impl DatasetSummary {
    /// Create a summary; the column count is derived from the column list.
    pub fn new(total_rows: usize, columns: Vec<ColumnSummary>) -> Self {
        Self {
            total_rows,
            total_columns: columns.len(),
            columns,
        }
    }

    /// Look up a column summary by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Total missing values across all columns.
    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing_count).sum()
    }
}

/// Percentage of `count` over `total`, 0 when `total` is 0.
pub(crate) fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Truncate a raw value for display.
fn truncate_sample(value: &str) -> String {
    if value.chars().count() <= MAX_SAMPLE_LEN {
        value.to_string()
    } else {
        let mut truncated: String = value.chars().take(MAX_SAMPLE_LEN).collect();
        truncated.push_str("...");
        truncated
    }
}
