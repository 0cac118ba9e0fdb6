//! Human-readable provenance for applied fixes.
//!
//! Provenance is informational: rendering must never fail. A record whose
//! method-specific parameters are missing degrades to a structural dump of
//! the record instead of a pretty description.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SculleryError};
use crate::model::{AppliedFix, DatasetHandle, IssueCategory};

/// Describe a single applied fix for display.
pub fn describe(fix: &AppliedFix) -> String {
    match fix.category {
        IssueCategory::MissingValues => {
            let mut text = format!(
                "Fixed {} missing values in column {} using {}",
                fix.count, fix.key, fix.method
            );
            if fix.method == "constant" {
                match &fix.constant_value {
                    Some(value) => text.push_str(&format!(" (value: {value})")),
                    None => return fallback(fix),
                }
            }
            text
        }
        IssueCategory::Duplicates => {
            format!("Removed {} duplicate rows using {}", fix.count, fix.method)
        }
        IssueCategory::Outliers => {
            if fix.method == "cap" {
                match (fix.lower_bound, fix.upper_bound) {
                    (Some(lower), Some(upper)) => format!(
                        "Capped {} outliers in column {} (range: {lower:.2} to {upper:.2})",
                        fix.count, fix.key
                    ),
                    _ => fallback(fix),
                }
            } else {
                format!(
                    "Removed {} rows with outliers in column {}",
                    fix.count, fix.key
                )
            }
        }
        IssueCategory::InconsistentFormats => match &fix.format {
            Some(format) => format!(
                "Standardized formats in column {} to {format} format",
                fix.key
            ),
            None => fallback(fix),
        },
    }
}

/// Describe every applied fix, in application order.
pub fn assemble(fixes: &[AppliedFix]) -> Vec<String> {
    fixes.iter().map(describe).collect()
}

/// Structural dump used when a record is missing its expected parameters.
fn fallback(fix: &AppliedFix) -> String {
    serde_json::to_string(fix).unwrap_or_else(|_| format!("{fix:?}"))
}

/// The assembled provenance of one completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// When the record was assembled.
    pub generated_at: DateTime<Utc>,
    /// Handle of the uploaded dataset.
    pub original: DatasetHandle,
    /// Handle of the cleaned dataset.
    pub cleaned: DatasetHandle,
    /// Provenance of every executed fix, in application order.
    pub fixes: Vec<AppliedFix>,
    /// Display description per fix.
    pub descriptions: Vec<String>,
}

impl ProvenanceRecord {
    /// Assemble a record from the apply stage's output.
    pub fn new(original: DatasetHandle, cleaned: DatasetHandle, fixes: Vec<AppliedFix>) -> Self {
        let descriptions = assemble(&fixes);
        Self {
            generated_at: Utc::now(),
            original,
            cleaned,
            fixes,
            descriptions,
        }
    }

    /// Save the record as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    SculleryError::Persistence(format!(
                        "failed to create directory '{}': {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            SculleryError::Persistence(format!("failed to create file '{}': {e}", path.display()))
        })?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| {
            SculleryError::Persistence(format!("failed to serialize provenance record: {e}"))
        })
    }

    /// Load a record from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            SculleryError::Persistence(format!("failed to open file '{}': {e}", path.display()))
        })?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| {
            SculleryError::Persistence(format!(
                "failed to parse provenance record '{}': {e}",
                path.display()
            ))
        })
    }
}
