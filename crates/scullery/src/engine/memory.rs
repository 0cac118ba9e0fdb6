//! Self-contained cleaning engine that keeps datasets in memory.
//!
//! This engine makes the workflow executable end-to-end without any external
//! service: it parses CSV bytes, detects the four issue categories with
//! simple deterministic rules, offers the standard fix menus, and applies
//! chosen fixes to a working copy. It is not a statistics library — outlier
//! detection is plain IQR fencing and imputation is mean/median/mode.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use chrono::{NaiveDate, Utc};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::model::{
    AppliedFix, ColumnSummary, ColumnType, DUPLICATE_ROWS_KEY, DatasetHandle, DatasetSummary,
    FixOption, FixOptionSet, Issue, IssueCategory, IssueSet, NumericSummary, ReportReference,
};
use crate::provenance;
use crate::selection::{Selection, SelectionExport};

use super::contract::{CleaningEngine, EngineError, EngineResult};

/// IQR multiplier for outlier fences.
const IQR_MULTIPLIER: f64 = 1.5;

/// Maximum example values carried on an issue or summary.
const MAX_EXAMPLES: usize = 5;

/// Tokens treated as missing values (beyond the empty string).
const NULL_TOKENS: &[&str] = &["na", "n/a", "null", "none", "nil", ".", "-"];

/// Recognized date-format families, paired with their chrono format strings.
static DATE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"), "%Y-%m-%d"),
        (Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid regex"), "%m/%d/%Y"),
        (Regex::new(r"^\d{2}-\d{2}-\d{4}$").expect("valid regex"), "%d-%m-%Y"),
    ]
});

/// Parsed tabular data held by the engine.
#[derive(Debug, Clone)]
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Check if a value represents a missing/null value.
    fn is_null(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || NULL_TOKENS
                .iter()
                .any(|token| trimmed.eq_ignore_ascii_case(token))
    }

    /// Rows minus distinct rows.
    fn duplicate_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| !seen.insert(row.join("\u{1f}")))
            .count()
    }

    fn missing_total(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| Self::is_null(cell))
            .count()
    }
}

/// Engine implementing all five contracts against in-memory tables.
///
/// Datasets are stored under content-derived handles; a cleaned dataset gets
/// a fresh handle and the original stays available.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    datasets: HashMap<String, Table>,
    reports: HashMap<String, String>,
    sequence: u64,
}

impl InMemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored content of a generated report, for the presentation shell.
    pub fn report_content(&self, report: &ReportReference) -> Option<&str> {
        self.reports.get(report.as_str()).map(String::as_str)
    }

    fn table(&self, handle: &DatasetHandle) -> EngineResult<&Table> {
        self.datasets
            .get(handle.as_str())
            .ok_or_else(|| EngineError::new(format!("unknown dataset handle '{handle}'")))
    }

    fn store(&mut self, table: Table, tag: &str) -> DatasetHandle {
        self.sequence += 1;
        let mut hasher = Sha256::new();
        for header in &table.headers {
            hasher.update(header.as_bytes());
            hasher.update([0x1f]);
        }
        for row in &table.rows {
            for cell in row {
                hasher.update(cell.as_bytes());
                hasher.update([0x1f]);
            }
        }
        let digest = hasher.finalize();
        let prefix: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
        let id = format!("ds-{tag}-{prefix}-{:03}", self.sequence);
        self.datasets.insert(id.clone(), table);
        DatasetHandle::new(id)
    }
}

impl CleaningEngine for InMemoryEngine {
    fn ingest(&mut self, file: &[u8]) -> EngineResult<(DatasetHandle, DatasetSummary)> {
        let table = parse_csv(file)?;
        let summary = summarize(&table);
        let handle = self.store(table, "orig");
        Ok((handle, summary))
    }

    fn detect(&mut self, dataset: &DatasetHandle) -> EngineResult<IssueSet> {
        let table = self.table(dataset)?;
        let total = table.rows.len();
        let mut issues = IssueSet::new();

        // Missing values per column. Zero-count findings are dropped by the
        // set itself.
        for (idx, name) in table.headers.iter().enumerate() {
            let missing = table
                .column_values(idx)
                .filter(|v| Table::is_null(v))
                .count();
            issues.insert(Issue::new(IssueCategory::MissingValues, name, missing, total));
        }

        // Exact duplicate rows, dataset-wide.
        issues.insert(Issue::new(
            IssueCategory::Duplicates,
            DUPLICATE_ROWS_KEY,
            table.duplicate_count(),
            total,
        ));

        // IQR-fence outliers on numeric columns.
        for (idx, name) in table.headers.iter().enumerate() {
            if !infer_type(table, idx).is_numeric() {
                continue;
            }
            let values = numeric_values(table, idx);
            let Some(numeric) = numeric_summary(&values) else {
                continue;
            };
            let outliers: Vec<f64> = values
                .iter()
                .copied()
                .filter(|v| numeric.is_outlier(*v, IQR_MULTIPLIER))
                .collect();
            let examples = outliers
                .iter()
                .take(MAX_EXAMPLES)
                .map(|v| format_number(*v))
                .collect();
            issues.insert(
                Issue::new(IssueCategory::Outliers, name, outliers.len(), total)
                    .with_examples(examples),
            );
        }

        // Mixed date formats within a column.
        for (idx, name) in table.headers.iter().enumerate() {
            let mut by_family: IndexMap<&'static str, usize> = IndexMap::new();
            for value in table.column_values(idx) {
                if let Some(family) = date_family(value.trim()) {
                    *by_family.entry(family).or_insert(0) += 1;
                }
            }
            if by_family.len() < 2 {
                continue;
            }
            let dominant = by_family
                .iter()
                .max_by_key(|(_, count)| **count)
                .map(|(family, _)| *family);
            let affected = by_family
                .iter()
                .filter(|(family, _)| Some(**family) != dominant)
                .map(|(_, count)| *count)
                .sum::<usize>();
            let examples = table
                .column_values(idx)
                .filter_map(|v| {
                    let trimmed = v.trim();
                    let family = date_family(trimmed)?;
                    (Some(family) != dominant).then(|| trimmed.to_string())
                })
                .take(MAX_EXAMPLES)
                .collect();
            issues.insert(
                Issue::new(IssueCategory::InconsistentFormats, name, affected, total)
                    .with_examples(examples)
                    .with_format_family("date"),
            );
        }

        Ok(issues)
    }

    fn suggest(&mut self, dataset: &DatasetHandle, issues: &IssueSet) -> EngineResult<FixOptionSet> {
        let table = self.table(dataset)?;
        let mut options = FixOptionSet::new();
        for issue in issues.iter() {
            let offered = match issue.category {
                IssueCategory::MissingValues => missing_value_options(table, &issue.key),
                IssueCategory::Duplicates => duplicate_options(),
                IssueCategory::Outliers => outlier_options(),
                IssueCategory::InconsistentFormats => format_options(),
            };
            options.insert(issue.category, issue.key.clone(), offered);
        }
        Ok(options)
    }

    fn apply(
        &mut self,
        dataset: &DatasetHandle,
        selections: &SelectionExport,
    ) -> EngineResult<(DatasetHandle, Vec<AppliedFix>)> {
        // All-or-nothing: work on a copy, store only if every fix succeeds.
        let mut table = self.table(dataset)?.clone();
        let mut fixes = Vec::with_capacity(selections.len());
        for selection in selections.iter() {
            fixes.push(apply_selection(&mut table, selection)?);
        }
        let cleaned = self.store(table, "cleaned");
        Ok((cleaned, fixes))
    }

    fn report(
        &mut self,
        original: &DatasetHandle,
        cleaned: &DatasetHandle,
        fixes: &[AppliedFix],
    ) -> EngineResult<ReportReference> {
        let (orig_rows, orig_missing, orig_dups) = {
            let table = self.table(original)?;
            (table.rows.len(), table.missing_total(), table.duplicate_count())
        };
        let (clean_rows, clean_missing, clean_dups) = {
            let table = self.table(cleaned)?;
            (table.rows.len(), table.missing_total(), table.duplicate_count())
        };

        let mut text = String::new();
        let _ = writeln!(text, "Data Quality Report");
        let _ = writeln!(text, "Generated on {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(text, "Original dataset: {original}");
        let _ = writeln!(text, "Cleaned dataset: {cleaned}");
        let _ = writeln!(text);
        let _ = writeln!(text, "Rows: {orig_rows} -> {clean_rows}");
        let _ = writeln!(text, "Missing values: {orig_missing} -> {clean_missing}");
        let _ = writeln!(text, "Duplicate rows: {orig_dups} -> {clean_dups}");
        let _ = writeln!(text);
        let _ = writeln!(text, "Applied Fixes");
        if fixes.is_empty() {
            let _ = writeln!(text, "No fixes were applied to the dataset.");
        } else {
            for line in provenance::assemble(fixes) {
                let _ = writeln!(text, "- {line}");
            }
        }

        self.sequence += 1;
        let id = format!("report-{:03}", self.sequence);
        self.reports.insert(id.clone(), text);
        Ok(ReportReference::new(id))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

// -----------------------------------------------------------------------
// Ingestion
// -----------------------------------------------------------------------

fn parse_csv(bytes: &[u8]) -> EngineResult<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::new(format!("failed to read CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(EngineError::new("empty dataset: no columns found"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::new(format!("failed to parse CSV row: {e}")))?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

fn summarize(table: &Table) -> DatasetSummary {
    let total_rows = table.rows.len();
    let columns = table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let mut missing = 0;
            let mut distinct: IndexSet<&str> = IndexSet::new();
            for value in table.column_values(idx) {
                if Table::is_null(value) {
                    missing += 1;
                } else {
                    distinct.insert(value.trim());
                }
            }
            let dtype = infer_type(table, idx);
            let samples: Vec<String> = distinct
                .iter()
                .take(MAX_EXAMPLES)
                .map(|s| s.to_string())
                .collect();

            let mut column = ColumnSummary::new(name, dtype, missing, total_rows, distinct.len())
                .with_samples(samples);
            if dtype.is_numeric() {
                if let Some(numeric) = numeric_summary(&numeric_values(table, idx)) {
                    column = column.with_numeric(numeric);
                }
            }
            column
        })
        .collect();

    DatasetSummary::new(total_rows, columns)
}

fn infer_type(table: &Table, index: usize) -> ColumnType {
    let mut saw_value = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;
    let mut all_date = true;

    for value in table.column_values(index) {
        let trimmed = value.trim();
        if Table::is_null(trimmed) {
            continue;
        }
        saw_value = true;
        if trimmed.parse::<i64>().is_err() {
            all_int = false;
        }
        if trimmed.parse::<f64>().is_err() {
            all_float = false;
        }
        if !trimmed.eq_ignore_ascii_case("true") && !trimmed.eq_ignore_ascii_case("false") {
            all_bool = false;
        }
        if date_family(trimmed).is_none() {
            all_date = false;
        }
    }

    if !saw_value {
        ColumnType::Unknown
    } else if all_bool {
        ColumnType::Bool
    } else if all_int {
        ColumnType::Integer
    } else if all_float {
        ColumnType::Float
    } else if all_date {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

fn numeric_values(table: &Table, index: usize) -> Vec<f64> {
    table
        .column_values(index)
        .filter(|v| !Table::is_null(v))
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .collect()
}

fn numeric_summary(values: &[f64]) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    let std = if sorted.len() > 1 {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (sorted.len() - 1) as f64).sqrt()
    } else {
        0.0
    };

    Some(NumericSummary {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        median: quantile(&sorted, 0.5),
        std,
        q1: quantile(&sorted, 0.25),
        q3: quantile(&sorted, 0.75),
    })
}

/// Linear-interpolation quantile over a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (position - lower as f64) * (sorted[upper] - sorted[lower])
    }
}

fn date_family(value: &str) -> Option<&'static str> {
    DATE_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(value))
        .map(|(_, format)| *format)
}

/// Render a float without a trailing `.0` for whole numbers.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn mode_of(table: &Table, index: usize) -> Option<String> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for value in table.column_values(index) {
        let trimmed = value.trim();
        if Table::is_null(trimmed) {
            continue;
        }
        *counts.entry(trimmed).or_insert(0) += 1;
    }
    // Strictly-greater keeps the first-seen value on ties.
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

// -----------------------------------------------------------------------
// Suggestion menus
// -----------------------------------------------------------------------

fn missing_value_options(table: &Table, column: &str) -> Vec<FixOption> {
    let drop = FixOption::new("drop", "Drop rows with missing values");
    let Some(idx) = table.column_index(column) else {
        return vec![drop];
    };

    if infer_type(table, idx).is_numeric() {
        let summary = numeric_summary(&numeric_values(table, idx));
        let mean_desc = match &summary {
            Some(s) => format!("Replace with mean value ({:.2})", s.mean),
            None => "Replace with mean value".to_string(),
        };
        let median_desc = match &summary {
            Some(s) => format!("Replace with median value ({:.2})", s.median),
            None => "Replace with median value".to_string(),
        };
        vec![
            FixOption::new("mean", mean_desc),
            FixOption::new("median", median_desc),
            drop,
        ]
    } else {
        let mode_desc = match mode_of(table, idx) {
            Some(mode) => format!("Replace with most common value (\"{mode}\")"),
            None => "Replace with most common value".to_string(),
        };
        vec![
            FixOption::new("mode", mode_desc),
            FixOption::new("constant", "Replace with \"Unknown\"")
                .with_params(json!({"value": "Unknown"})),
            drop,
        ]
    }
}

fn duplicate_options() -> Vec<FixOption> {
    vec![
        FixOption::new("drop_first", "Keep first occurrence, drop later duplicates"),
        FixOption::new("drop_last", "Keep last occurrence, drop earlier duplicates"),
        FixOption::new("none", "Keep all duplicates (no action)"),
    ]
}

fn outlier_options() -> Vec<FixOption> {
    vec![
        FixOption::new("cap", "Cap outliers at the IQR fences"),
        FixOption::new("remove", "Remove rows with outlier values"),
        FixOption::new("none", "Keep outliers (no action)"),
    ]
}

fn format_options() -> Vec<FixOption> {
    vec![
        FixOption::new("iso_date", "Standardize to YYYY-MM-DD format")
            .with_params(json!({"format": "%Y-%m-%d"})),
        FixOption::new("us_date", "Standardize to MM/DD/YYYY format")
            .with_params(json!({"format": "%m/%d/%Y"})),
        FixOption::new("none", "Keep as is (no action)"),
    ]
}

// -----------------------------------------------------------------------
// Fix application
// -----------------------------------------------------------------------

fn apply_selection(table: &mut Table, selection: &Selection) -> EngineResult<AppliedFix> {
    let method = selection.option.method.as_str();
    match selection.category {
        IssueCategory::MissingValues => {
            apply_missing(table, &selection.key, method, &selection.option)
        }
        IssueCategory::Duplicates => apply_duplicates(table, method),
        IssueCategory::Outliers => apply_outliers(table, &selection.key, method),
        IssueCategory::InconsistentFormats => {
            apply_formats(table, &selection.key, method, &selection.option)
        }
    }
}

fn column_index_or_err(table: &Table, column: &str) -> EngineResult<usize> {
    table
        .column_index(column)
        .ok_or_else(|| EngineError::new(format!("unknown column '{column}'")))
}

fn fill_missing(table: &mut Table, index: usize, replacement: &str) -> usize {
    let mut count = 0;
    for row in &mut table.rows {
        if let Some(cell) = row.get_mut(index) {
            if Table::is_null(cell) {
                *cell = replacement.to_string();
                count += 1;
            }
        }
    }
    count
}

fn apply_missing(
    table: &mut Table,
    column: &str,
    method: &str,
    option: &FixOption,
) -> EngineResult<AppliedFix> {
    let idx = column_index_or_err(table, column)?;
    match method {
        "mean" | "median" => {
            let summary = numeric_summary(&numeric_values(table, idx)).ok_or_else(|| {
                EngineError::new(format!("column '{column}' has no numeric values to impute from"))
            })?;
            let replacement = if method == "mean" {
                summary.mean
            } else {
                summary.median
            };
            let count = fill_missing(table, idx, &format_number(replacement));
            Ok(AppliedFix::new(IssueCategory::MissingValues, column, method, count))
        }
        "mode" => {
            let replacement = mode_of(table, idx).ok_or_else(|| {
                EngineError::new(format!("column '{column}' has no values to take a mode from"))
            })?;
            let count = fill_missing(table, idx, &replacement);
            Ok(AppliedFix::new(IssueCategory::MissingValues, column, method, count))
        }
        "constant" => {
            let value = option.str_param("value").unwrap_or("Unknown").to_string();
            let count = fill_missing(table, idx, &value);
            Ok(AppliedFix::new(IssueCategory::MissingValues, column, method, count)
                .with_constant(value))
        }
        "drop" => {
            let before = table.rows.len();
            table
                .rows
                .retain(|row| row.get(idx).map(|v| !Table::is_null(v)).unwrap_or(false));
            Ok(AppliedFix::new(
                IssueCategory::MissingValues,
                column,
                method,
                before - table.rows.len(),
            ))
        }
        other => Err(EngineError::new(format!(
            "unsupported missing-value method '{other}'"
        ))),
    }
}

fn apply_duplicates(table: &mut Table, method: &str) -> EngineResult<AppliedFix> {
    match method {
        "drop_first" | "drop_last" => {
            let before = table.rows.len();
            if method == "drop_last" {
                table.rows.reverse();
            }
            let mut seen = HashSet::new();
            table.rows.retain(|row| seen.insert(row.join("\u{1f}")));
            if method == "drop_last" {
                table.rows.reverse();
            }
            Ok(AppliedFix::new(
                IssueCategory::Duplicates,
                DUPLICATE_ROWS_KEY,
                method,
                before - table.rows.len(),
            ))
        }
        "none" => Ok(AppliedFix::new(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, method, 0)),
        other => Err(EngineError::new(format!(
            "unsupported duplicate method '{other}'"
        ))),
    }
}

fn apply_outliers(table: &mut Table, column: &str, method: &str) -> EngineResult<AppliedFix> {
    let idx = column_index_or_err(table, column)?;
    if method == "none" {
        return Ok(AppliedFix::new(IssueCategory::Outliers, column, method, 0));
    }

    let summary = numeric_summary(&numeric_values(table, idx)).ok_or_else(|| {
        EngineError::new(format!("column '{column}' has no numeric values"))
    })?;
    let (lower, upper) = summary.fences(IQR_MULTIPLIER);

    match method {
        "cap" => {
            let mut count = 0;
            for row in &mut table.rows {
                let Some(cell) = row.get_mut(idx) else { continue };
                let Ok(value) = cell.trim().parse::<f64>() else { continue };
                if value < lower {
                    *cell = format_number(lower);
                    count += 1;
                } else if value > upper {
                    *cell = format_number(upper);
                    count += 1;
                }
            }
            Ok(AppliedFix::new(IssueCategory::Outliers, column, method, count)
                .with_bounds(lower, upper))
        }
        "remove" => {
            let before = table.rows.len();
            table.rows.retain(|row| {
                match row.get(idx).map(|cell| cell.trim().parse::<f64>()) {
                    Some(Ok(value)) => value >= lower && value <= upper,
                    _ => true,
                }
            });
            Ok(AppliedFix::new(
                IssueCategory::Outliers,
                column,
                method,
                before - table.rows.len(),
            ))
        }
        other => Err(EngineError::new(format!(
            "unsupported outlier method '{other}'"
        ))),
    }
}

fn apply_formats(
    table: &mut Table,
    column: &str,
    method: &str,
    option: &FixOption,
) -> EngineResult<AppliedFix> {
    let idx = column_index_or_err(table, column)?;
    match method {
        "iso_date" | "us_date" => {
            let target = option
                .str_param("format")
                .unwrap_or(if method == "iso_date" { "%Y-%m-%d" } else { "%m/%d/%Y" })
                .to_string();
            let mut count = 0;
            for row in &mut table.rows {
                let Some(cell) = row.get_mut(idx) else { continue };
                let trimmed = cell.trim();
                let Some(source) = date_family(trimmed) else { continue };
                let Ok(date) = NaiveDate::parse_from_str(trimmed, source) else { continue };
                let formatted = date.format(&target).to_string();
                if formatted != *cell {
                    *cell = formatted;
                    count += 1;
                }
            }
            Ok(AppliedFix::new(IssueCategory::InconsistentFormats, column, method, count)
                .with_format(target))
        }
        "none" => Ok(AppliedFix::new(IssueCategory::InconsistentFormats, column, method, 0)),
        other => Err(EngineError::new(format!(
            "unsupported format method '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionTracker;

    const MESSY_CSV: &[u8] = b"age,city,visit_date\n\
        34,Boston,2021-03-04\n\
        29,boston,03/05/2021\n\
        ,Chicago,2021-03-06\n\
        31,Boston,2021-03-07\n\
        31,Boston,2021-03-07\n\
        30,Denver,2021-03-08\n\
        28,Boston,2021-03-09\n\
        32,Chicago,2021-03-10\n\
        33,Denver,2021-03-11\n\
        900,Boston,2021-03-12\n";

    fn load(engine: &mut InMemoryEngine) -> (DatasetHandle, DatasetSummary) {
        engine.ingest(MESSY_CSV).unwrap()
    }

    #[test]
    fn test_ingest_summarizes_columns() {
        let mut engine = InMemoryEngine::new();
        let (_, summary) = load(&mut engine);

        assert_eq!(summary.total_rows, 10);
        assert_eq!(summary.total_columns, 3);

        let age = summary.column("age").unwrap();
        assert_eq!(age.dtype, ColumnType::Integer);
        assert_eq!(age.missing_count, 1);
        assert_eq!(age.missing_percentage, 10.0);
        assert!(age.numeric.is_some());

        let city = summary.column("city").unwrap();
        assert_eq!(city.dtype, ColumnType::Text);
        assert_eq!(city.missing_count, 0);
        assert!(city.sample_values.len() <= 5);
    }

    #[test]
    fn test_ingest_rejects_unparseable_input() {
        let mut engine = InMemoryEngine::new();
        let err = engine.ingest(b"a,b\n\xff\xfe,2\n").unwrap_err();
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_detect_unknown_handle() {
        let mut engine = InMemoryEngine::new();
        let err = engine.detect(&DatasetHandle::new("ds-missing")).unwrap_err();
        assert!(err.message().contains("unknown dataset handle"));
    }

    #[test]
    fn test_detect_finds_all_four_categories() {
        let mut engine = InMemoryEngine::new();
        let (handle, _) = load(&mut engine);
        let issues = engine.detect(&handle).unwrap();

        let missing = issues.get(IssueCategory::MissingValues, "age").unwrap();
        assert_eq!(missing.count, 1);
        assert_eq!(missing.percentage, 10.0);

        let dups = issues.get(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY).unwrap();
        assert_eq!(dups.count, 1);

        let outliers = issues.get(IssueCategory::Outliers, "age").unwrap();
        assert_eq!(outliers.count, 1);
        assert_eq!(outliers.examples, vec!["900".to_string()]);

        let formats = issues
            .get(IssueCategory::InconsistentFormats, "visit_date")
            .unwrap();
        assert_eq!(formats.count, 1);
        assert_eq!(formats.format_family.as_deref(), Some("date"));
        assert_eq!(formats.examples, vec!["03/05/2021".to_string()]);

        // The clean column produced nothing.
        assert!(!issues.contains(IssueCategory::MissingValues, "city"));
    }

    #[test]
    fn test_clean_dataset_has_no_issues() {
        let mut engine = InMemoryEngine::new();
        let (handle, _) = engine
            .ingest(b"id,name\n1,Alice\n2,Bob\n3,Carol\n")
            .unwrap();
        let issues = engine.detect(&handle).unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn test_suggest_menus_match_column_types() {
        let mut engine = InMemoryEngine::new();
        let (handle, _) = load(&mut engine);
        let issues = engine.detect(&handle).unwrap();
        let options = engine.suggest(&handle, &issues).unwrap();

        let age = options
            .options_for(IssueCategory::MissingValues, "age")
            .unwrap();
        let methods: Vec<&str> = age.iter().map(|o| o.method.as_str()).collect();
        assert_eq!(methods, vec!["mean", "median", "drop"]);
        assert!(age[0].description.contains("Replace with mean value"));

        let dups = options
            .options_for(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY)
            .unwrap();
        assert_eq!(dups[0].method, "drop_first");

        let dates = options
            .options_for(IssueCategory::InconsistentFormats, "visit_date")
            .unwrap();
        assert_eq!(dates[0].str_param("format"), Some("%Y-%m-%d"));
    }

    #[test]
    fn test_apply_runs_every_selected_fix() {
        let mut engine = InMemoryEngine::new();
        let (handle, _) = load(&mut engine);
        let issues = engine.detect(&handle).unwrap();
        let options = engine.suggest(&handle, &issues).unwrap();

        let mut tracker = SelectionTracker::new(options);
        tracker
            .select(IssueCategory::MissingValues, "age", "mean")
            .unwrap();
        tracker
            .select(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, "drop_first")
            .unwrap();
        tracker
            .select(IssueCategory::Outliers, "age", "cap")
            .unwrap();
        tracker
            .select(IssueCategory::InconsistentFormats, "visit_date", "iso_date")
            .unwrap();

        let (cleaned, fixes) = engine.apply(&handle, &tracker.export()).unwrap();
        assert_ne!(cleaned, handle);
        assert_eq!(fixes.len(), 4);

        let capped = fixes.iter().find(|f| f.method == "cap").unwrap();
        assert!(capped.lower_bound.is_some() && capped.upper_bound.is_some());
        let dated = fixes.iter().find(|f| f.method == "iso_date").unwrap();
        assert_eq!(dated.format.as_deref(), Some("%Y-%m-%d"));
        assert_eq!(dated.count, 1);

        // The cleaned dataset no longer shows duplicates or mixed formats;
        // the original is still stored and unchanged.
        let after = engine.detect(&cleaned).unwrap();
        assert!(!after.contains(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY));
        assert!(!after.contains(IssueCategory::InconsistentFormats, "visit_date"));
        assert!(!after.contains(IssueCategory::MissingValues, "age"));
        let original_again = engine.detect(&handle).unwrap();
        assert!(original_again.contains(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY));
    }

    #[test]
    fn test_apply_constant_and_drop() {
        let mut engine = InMemoryEngine::new();
        let (handle, _) = engine
            .ingest(b"name,status\nAlice,active\nBob,\nCarol,active\nDan,\n")
            .unwrap();
        let issues = engine.detect(&handle).unwrap();
        let options = engine.suggest(&handle, &issues).unwrap();

        let mut tracker = SelectionTracker::new(options.clone());
        tracker
            .select(IssueCategory::MissingValues, "status", "constant")
            .unwrap();
        let (_, fixes) = engine.apply(&handle, &tracker.export()).unwrap();
        assert_eq!(fixes[0].count, 2);
        assert_eq!(fixes[0].constant_value.as_deref(), Some("Unknown"));

        let mut tracker = SelectionTracker::new(options);
        tracker
            .select(IssueCategory::MissingValues, "status", "drop")
            .unwrap();
        let (cleaned, fixes) = engine.apply(&handle, &tracker.export()).unwrap();
        assert_eq!(fixes[0].count, 2);
        let summary = summarize(engine.table(&cleaned).unwrap());
        assert_eq!(summary.total_rows, 2);
    }

    #[test]
    fn test_apply_is_deterministic() {
        let mut engine = InMemoryEngine::new();
        let (handle, _) = load(&mut engine);
        let issues = engine.detect(&handle).unwrap();
        let options = engine.suggest(&handle, &issues).unwrap();

        let mut tracker = SelectionTracker::new(options);
        tracker
            .select(IssueCategory::MissingValues, "age", "median")
            .unwrap();
        tracker
            .select(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, "drop_last")
            .unwrap();
        tracker
            .select(IssueCategory::Outliers, "age", "remove")
            .unwrap();
        tracker
            .select(IssueCategory::InconsistentFormats, "visit_date", "us_date")
            .unwrap();
        let export = tracker.export();

        let (_, first) = engine.apply(&handle, &export).unwrap();
        let (_, second) = engine.apply(&handle, &export).unwrap();

        let shape =
            |fixes: &[AppliedFix]| -> Vec<(IssueCategory, String, String, usize)> {
                fixes
                    .iter()
                    .map(|f| (f.category, f.key.clone(), f.method.clone(), f.count))
                    .collect()
            };
        assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn test_report_lists_applied_fixes() {
        let mut engine = InMemoryEngine::new();
        let (handle, _) = load(&mut engine);
        let issues = engine.detect(&handle).unwrap();
        let options = engine.suggest(&handle, &issues).unwrap();

        let mut tracker = SelectionTracker::new(options);
        tracker
            .select(IssueCategory::MissingValues, "age", "mean")
            .unwrap();
        tracker
            .select(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, "drop_first")
            .unwrap();
        tracker
            .select(IssueCategory::Outliers, "age", "cap")
            .unwrap();
        tracker
            .select(IssueCategory::InconsistentFormats, "visit_date", "iso_date")
            .unwrap();
        let (cleaned, fixes) = engine.apply(&handle, &tracker.export()).unwrap();

        let reference = engine.report(&handle, &cleaned, &fixes).unwrap();
        let content = engine.report_content(&reference).unwrap();

        assert!(content.contains("Data Quality Report"));
        assert!(content.contains("missing values in column age"));
        assert!(content.contains("duplicate rows"));
        assert!(content.contains("Rows: 10 -> 9"));
    }

    #[test]
    fn test_mode_prefers_first_seen_on_ties() {
        let table = parse_csv(b"color\nred\nblue\nred\nblue\ngreen\n").unwrap();
        assert_eq!(mode_of(&table, 0).as_deref(), Some("red"));
    }

    #[test]
    fn test_quantiles_interpolate() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
    }
}
