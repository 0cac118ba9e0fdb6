//! Selection tracking: the operator's chosen fix per detected issue.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SculleryError};
use crate::model::{FixOption, FixOptionSet, IssueCategory, IssueKey, IssueSet};

/// The operator's choice of one fix option for one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub category: IssueCategory,
    pub key: String,
    pub option: FixOption,
}

impl Selection {
    /// The composite key of the issue this selection resolves.
    pub fn issue_key(&self) -> IssueKey {
        IssueKey::new(self.category, self.key.clone())
    }
}

/// The full selection map in the shape consumed by the apply stage: one
/// entry per decided `(category, key)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionExport {
    selections: Vec<Selection>,
}

impl SelectionExport {
    /// Number of decided issues.
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    /// True if nothing was decided (the empty-issue-set path).
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Look up the chosen option for an issue.
    pub fn get(&self, category: IssueCategory, key: &str) -> Option<&FixOption> {
        self.selections
            .iter()
            .find(|s| s.category == category && s.key == key)
            .map(|s| &s.option)
    }

    /// Iterate over all selections in decision order.
    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.selections.iter()
    }
}

/// Tracks which fix option the operator has chosen for each detected issue.
///
/// The tracker owns the option set offered for the run; a selection must
/// reference an offered `(category, key)` and one of its listed methods.
/// Completion is always recomputed against the authoritative issue set
/// passed by the caller, never cached.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    offered: FixOptionSet,
    chosen: Vec<Selection>,
}

impl SelectionTracker {
    /// Create a tracker over the options offered for this run.
    pub fn new(offered: FixOptionSet) -> Self {
        Self {
            offered,
            chosen: Vec::new(),
        }
    }

    /// The options offered for this run.
    pub fn offered(&self) -> &FixOptionSet {
        &self.offered
    }

    /// Record (or overwrite) the chosen method for an issue.
    ///
    /// Referencing an unknown `(category, key)` or a method that was never
    /// offered for it is a usage error: the presentation shell only ever
    /// passes through visible options, so an unknown reference is a defect.
    pub fn select(&mut self, category: IssueCategory, key: &str, method: &str) -> Result<()> {
        let options = self.offered.options_for(category, key).ok_or_else(|| {
            SculleryError::Usage(format!(
                "no fix options were offered for issue '{}'",
                IssueKey::new(category, key)
            ))
        })?;

        let option = options.iter().find(|o| o.method == method).ok_or_else(|| {
            SculleryError::Usage(format!(
                "method '{}' was not offered for issue '{}'",
                method,
                IssueKey::new(category, key)
            ))
        })?;

        let selection = Selection {
            category,
            key: key.to_string(),
            option: option.clone(),
        };

        if let Some(existing) = self
            .chosen
            .iter_mut()
            .find(|s| s.category == category && s.key == key)
        {
            tracing::debug!(key = %existing.issue_key(), method, "replacing prior selection");
            *existing = selection;
        } else {
            self.chosen.push(selection);
        }
        Ok(())
    }

    /// The chosen option for an issue, if decided.
    pub fn selection_for(&self, category: IssueCategory, key: &str) -> Option<&FixOption> {
        self.chosen
            .iter()
            .find(|s| s.category == category && s.key == key)
            .map(|s| &s.option)
    }

    /// Number of decided issues (including decisions for keys that have
    /// since left the issue set; completion metrics ignore those).
    pub fn selected_count(&self) -> usize {
        self.chosen.len()
    }

    /// Fraction of the given issues that have a selection, in `[0, 1]`.
    ///
    /// Recomputed from the authoritative issue set on every call: selections
    /// whose key is absent from `issues` do not count. Returns 0 for an
    /// empty issue set; callers must treat "nothing to decide" as a separate
    /// case from "0% selected" (see [`Self::is_complete`]).
    pub fn completion_ratio(&self, issues: &IssueSet) -> f64 {
        if issues.is_empty() {
            return 0.0;
        }
        let decided = issues
            .keys()
            .filter(|k| self.selection_for(k.category, &k.key).is_some())
            .count();
        decided as f64 / issues.len() as f64
    }

    /// True if every issue has a selection. An empty issue set counts as
    /// complete: there is nothing to decide, and apply must be permitted to
    /// proceed trivially.
    pub fn is_complete(&self, issues: &IssueSet) -> bool {
        issues.is_empty() || self.completion_ratio(issues) >= 1.0
    }

    /// Export the selection map for the apply stage.
    pub fn export(&self) -> SelectionExport {
        SelectionExport {
            selections: self.chosen.clone(),
        }
    }

    /// Discard all selections.
    pub fn clear(&mut self) {
        self.chosen.clear();
    }
}
