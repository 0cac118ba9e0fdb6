//! Contracts for the external cleaning collaborators.
//!
//! The workflow core never parses files, scans data, or mutates datasets
//! itself; it drives implementations of [`CleaningEngine`] through five
//! blocking request/response calls. Timeouts, retries, and backoff belong to
//! whatever transport sits behind an implementation — the core only needs a
//! fail/succeed outcome per call.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AppliedFix, DatasetHandle, DatasetSummary, FixOptionSet, IssueSet, ReportReference};
use crate::selection::SelectionExport;

/// The engine call a stage transition delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineCall {
    Ingest,
    Detect,
    Suggest,
    Apply,
    Report,
}

impl EngineCall {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            EngineCall::Ingest => "ingest",
            EngineCall::Detect => "detect",
            EngineCall::Suggest => "suggest",
            EngineCall::Apply => "apply",
            EngineCall::Report => "report",
        }
    }
}

impl fmt::Display for EngineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure reported by an engine collaborator.
///
/// The message is surfaced to the operator verbatim.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct EngineError(String);

impl EngineError {
    /// Create an error with the collaborator's message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The collaborator's message.
    pub fn message(&self) -> &str {
        &self.0
    }

    /// Consume the error, yielding the message.
    pub fn into_message(self) -> String {
        self.0
    }
}

/// Result type for engine calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// The five request/response contracts the workflow depends on.
///
/// Calls are blocking; the pipeline serializes them by holding an exclusive
/// borrow of the engine for the duration of each transition.
pub trait CleaningEngine {
    /// Parse an uploaded file into a stored dataset and its summary.
    fn ingest(&mut self, file: &[u8]) -> EngineResult<(DatasetHandle, DatasetSummary)>;

    /// Scan a stored dataset for data-quality issues.
    fn detect(&mut self, dataset: &DatasetHandle) -> EngineResult<IssueSet>;

    /// Propose candidate fixes for each detected issue.
    fn suggest(&mut self, dataset: &DatasetHandle, issues: &IssueSet) -> EngineResult<FixOptionSet>;

    /// Execute the chosen fixes, producing a cleaned dataset and one
    /// provenance record per resolved issue. All-or-nothing: a failure must
    /// leave no partially cleaned dataset behind.
    fn apply(
        &mut self,
        dataset: &DatasetHandle,
        selections: &SelectionExport,
    ) -> EngineResult<(DatasetHandle, Vec<AppliedFix>)>;

    /// Render the applied-fixes record into a shareable document.
    fn report(
        &mut self,
        original: &DatasetHandle,
        cleaned: &DatasetHandle,
        fixes: &[AppliedFix],
    ) -> EngineResult<ReportReference>;

    /// Engine name for diagnostics.
    fn name(&self) -> &str;
}
