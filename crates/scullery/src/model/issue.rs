//! Detected data-quality issues, keyed by category and column.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::summary::percentage;

/// Sentinel key for dataset-wide duplicate-row issues, which are not tied to
/// a single column.
pub const DUPLICATE_ROWS_KEY: &str = "rows";

/// Category of a detected data-quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Missing values in a column.
    MissingValues,
    /// Duplicate rows across the dataset.
    Duplicates,
    /// Values outside the expected numeric range of a column.
    Outliers,
    /// Mixed value formats within a column.
    InconsistentFormats,
}

impl IssueCategory {
    /// All categories, in detection order.
    pub fn all() -> [IssueCategory; 4] {
        [
            IssueCategory::MissingValues,
            IssueCategory::Duplicates,
            IssueCategory::Outliers,
            IssueCategory::InconsistentFormats,
        ]
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::MissingValues => "Missing Values",
            IssueCategory::Duplicates => "Duplicates",
            IssueCategory::Outliers => "Outliers",
            IssueCategory::InconsistentFormats => "Inconsistent Formats",
        }
    }

    /// The wire name of the category (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::MissingValues => "missing_values",
            IssueCategory::Duplicates => "duplicates",
            IssueCategory::Outliers => "outliers",
            IssueCategory::InconsistentFormats => "inconsistent_formats",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key uniquely identifying one issue within a detection run.
///
/// The key part is a column name, except for `Duplicates` where it is the
/// [`DUPLICATE_ROWS_KEY`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueKey {
    pub category: IssueCategory,
    pub key: String,
}

impl IssueKey {
    /// Create a key for a column-scoped issue.
    pub fn new(category: IssueCategory, key: impl Into<String>) -> Self {
        Self {
            category,
            key: key.into(),
        }
    }

    /// The key for the dataset-wide duplicate-rows issue.
    pub fn duplicates() -> Self {
        Self::new(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY)
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.key)
    }
}

/// A detected data-quality problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue category.
    pub category: IssueCategory,
    /// Column name, or the duplicates sentinel.
    pub key: String,
    /// Number of affected rows or values.
    pub count: usize,
    /// Affected rows as a percentage of total rows.
    pub percentage: f64,
    /// Example affected values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Detected format family (format issues only, e.g. "date").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_family: Option<String>,
}

impl Issue {
    /// Create an issue; the percentage is derived from the counts.
    pub fn new(
        category: IssueCategory,
        key: impl Into<String>,
        count: usize,
        total_rows: usize,
    ) -> Self {
        Self {
            category,
            key: key.into(),
            count,
            percentage: percentage(count, total_rows),
            examples: Vec::new(),
            format_family: None,
        }
    }

    /// Attach example affected values.
    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }

    /// Attach the detected format family.
    pub fn with_format_family(mut self, family: impl Into<String>) -> Self {
        self.format_family = Some(family.into());
        self
    }

    /// The composite key of this issue.
    pub fn issue_key(&self) -> IssueKey {
        IssueKey::new(self.category, self.key.clone())
    }
}

/// Ordered set of issues, unique per `(category, key)`.
///
/// Zero-count issues are dropped at insertion: a category with no findings
/// must render as absent, not as an empty entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSet {
    issues: Vec<Issue>,
}

impl IssueSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an issue, replacing any prior issue with the same
    /// `(category, key)`. Issues with a zero count are ignored.
    pub fn insert(&mut self, issue: Issue) {
        if issue.count == 0 {
            tracing::debug!(key = %issue.issue_key(), "dropping zero-count issue");
            return;
        }
        if let Some(existing) = self
            .issues
            .iter_mut()
            .find(|i| i.category == issue.category && i.key == issue.key)
        {
            *existing = issue;
        } else {
            self.issues.push(issue);
        }
    }

    /// Number of distinct `(category, key)` issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// True if no issues were detected.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Look up an issue by category and key.
    pub fn get(&self, category: IssueCategory, key: &str) -> Option<&Issue> {
        self.issues
            .iter()
            .find(|i| i.category == category && i.key == key)
    }

    /// True if an issue exists for the given category and key.
    pub fn contains(&self, category: IssueCategory, key: &str) -> bool {
        self.get(category, key).is_some()
    }

    /// Iterate over all issues in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    /// Iterate over the composite keys of all issues.
    pub fn keys(&self) -> impl Iterator<Item = IssueKey> + '_ {
        self.issues.iter().map(Issue::issue_key)
    }

    /// Iterate over issues of one category.
    pub fn by_category(&self, category: IssueCategory) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.category == category)
    }
}

impl FromIterator<Issue> for IssueSet {
    fn from_iter<T: IntoIterator<Item = Issue>>(iter: T) -> Self {
        let mut set = IssueSet::new();
        for issue in iter {
            set.insert(issue);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_percentage_is_derived() {
        let issue = Issue::new(IssueCategory::MissingValues, "age", 10, 100);
        assert_eq!(issue.percentage, 10.0);

        let vacuous = Issue::new(IssueCategory::Outliers, "score", 3, 0);
        assert_eq!(vacuous.percentage, 0.0);
    }

    #[test]
    fn test_zero_count_issues_are_dropped() {
        let mut set = IssueSet::new();
        set.insert(Issue::new(IssueCategory::MissingValues, "age", 0, 100));
        assert!(set.is_empty());
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut set = IssueSet::new();
        set.insert(Issue::new(IssueCategory::MissingValues, "age", 10, 100));
        set.insert(Issue::new(IssueCategory::MissingValues, "age", 12, 100));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(IssueCategory::MissingValues, "age").unwrap().count, 12);
    }

    #[test]
    fn test_same_key_different_category_is_distinct() {
        let mut set = IssueSet::new();
        set.insert(Issue::new(IssueCategory::MissingValues, "age", 10, 100));
        set.insert(Issue::new(IssueCategory::Outliers, "age", 2, 100));
        set.insert(Issue::new(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, 4, 100));

        assert_eq!(set.len(), 3);
        assert_eq!(set.by_category(IssueCategory::Outliers).count(), 1);
    }

    #[test]
    fn test_key_display() {
        let key = IssueKey::duplicates();
        assert_eq!(key.to_string(), "duplicates:rows");
    }
}
