//! Candidate fixes and applied-fix provenance records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::issue::{IssueCategory, IssueKey};

/// One candidate remediation for an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixOption {
    /// Method identifier (e.g. `mean`, `drop_first`, `cap`, `iso_date`).
    pub method: String,
    /// Human-readable description of what the method does.
    pub description: String,
    /// Method-specific parameters (e.g. a constant value, a target format).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl FixOption {
    /// Create an option with no parameters.
    pub fn new(method: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            description: description.into(),
            params: Value::Null,
        }
    }

    /// Attach method-specific parameters.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Look up a string parameter by name.
    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

/// The candidate fixes offered for one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFixes {
    pub category: IssueCategory,
    pub key: String,
    /// Candidate options; order matters only for display.
    pub options: Vec<FixOption>,
}

/// Ordered map from `(category, key)` to the fix options offered for that
/// issue. Entries without options are dropped at insertion: every listed
/// issue offers at least one remedy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixOptionSet {
    entries: Vec<IssueFixes>,
}

impl FixOptionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the options for an issue, replacing any prior entry for the
    /// same `(category, key)`. Empty option lists are ignored.
    pub fn insert(&mut self, category: IssueCategory, key: impl Into<String>, options: Vec<FixOption>) {
        let key = key.into();
        if options.is_empty() {
            tracing::debug!(key = %IssueKey::new(category, key), "dropping issue with no fix options");
            return;
        }
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.category == category && e.key == key)
        {
            existing.options = options;
        } else {
            self.entries.push(IssueFixes {
                category,
                key,
                options,
            });
        }
    }

    /// The options offered for an issue.
    pub fn options_for(&self, category: IssueCategory, key: &str) -> Option<&[FixOption]> {
        self.entries
            .iter()
            .find(|e| e.category == category && e.key == key)
            .map(|e| e.options.as_slice())
    }

    /// True if an entry exists for the given issue.
    pub fn contains(&self, category: IssueCategory, key: &str) -> bool {
        self.options_for(category, key).is_some()
    }

    /// Number of issues with offered options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no options were offered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IssueFixes> {
        self.entries.iter()
    }
}

/// Provenance record of one executed fix.
///
/// Produced only by the apply stage, one per resolved issue, append-only for
/// the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedFix {
    /// Category of the issue that was fixed.
    pub category: IssueCategory,
    /// Column name, or the duplicates sentinel.
    pub key: String,
    /// Method that was executed.
    pub method: String,
    /// Number of rows or values affected.
    pub count: usize,
    /// Constant used for `constant` imputation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant_value: Option<String>,
    /// Lower bound used for `cap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    /// Upper bound used for `cap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    /// Target format for format standardization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// When the fix was executed.
    pub applied_at: DateTime<Utc>,
}

impl AppliedFix {
    /// Create a record for an executed fix.
    pub fn new(
        category: IssueCategory,
        key: impl Into<String>,
        method: impl Into<String>,
        count: usize,
    ) -> Self {
        Self {
            category,
            key: key.into(),
            method: method.into(),
            count,
            constant_value: None,
            lower_bound: None,
            upper_bound: None,
            format: None,
            applied_at: Utc::now(),
        }
    }

    /// Record the constant used for imputation.
    pub fn with_constant(mut self, value: impl Into<String>) -> Self {
        self.constant_value = Some(value.into());
        self
    }

    /// Record the bounds used for capping.
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    /// Record the target format string.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}
