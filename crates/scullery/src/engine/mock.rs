//! Scripted engine for exercising the workflow in tests.

use crate::model::{
    AppliedFix, DatasetHandle, DatasetSummary, FixOptionSet, IssueSet, ReportReference,
};
use crate::selection::SelectionExport;

use super::contract::{CleaningEngine, EngineCall, EngineError, EngineResult};

/// Engine that returns canned responses and records every call.
///
/// Configure the responses with the `with_*` builders; inject a one-shot
/// failure with [`failing_next`]. The call log lets tests prove that a pure
/// read (backward navigation) never reached an engine.
///
/// [`failing_next`]: Self::failing_next
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    summary: Option<DatasetSummary>,
    issues: IssueSet,
    options: FixOptionSet,
    fail_next: Option<(EngineCall, String)>,
    calls: Vec<EngineCall>,
}

impl MockEngine {
    /// Create an engine with empty canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the summary returned by `ingest`.
    pub fn with_summary(mut self, summary: DatasetSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Set the issue set returned by `detect`.
    pub fn with_issues(mut self, issues: IssueSet) -> Self {
        self.issues = issues;
        self
    }

    /// Set the option set returned by `suggest`.
    pub fn with_options(mut self, options: FixOptionSet) -> Self {
        self.options = options;
        self
    }

    /// Make the next matching call fail once with the given message.
    pub fn failing_next(mut self, call: EngineCall, message: impl Into<String>) -> Self {
        self.fail_next = Some((call, message.into()));
        self
    }

    /// How many times a call has been made.
    pub fn call_count(&self, call: EngineCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// Record a call, consuming a pending failure if one matches.
    fn enter(&mut self, call: EngineCall) -> EngineResult<()> {
        self.calls.push(call);
        if self.fail_next.as_ref().is_some_and(|(failing, _)| *failing == call) {
            if let Some((_, message)) = self.fail_next.take() {
                return Err(EngineError::new(message));
            }
        }
        Ok(())
    }
}

impl CleaningEngine for MockEngine {
    fn ingest(&mut self, _file: &[u8]) -> EngineResult<(DatasetHandle, DatasetSummary)> {
        self.enter(EngineCall::Ingest)?;
        let summary = self
            .summary
            .clone()
            .unwrap_or_else(|| DatasetSummary::new(0, Vec::new()));
        Ok((DatasetHandle::new("mock-original"), summary))
    }

    fn detect(&mut self, _dataset: &DatasetHandle) -> EngineResult<IssueSet> {
        self.enter(EngineCall::Detect)?;
        Ok(self.issues.clone())
    }

    fn suggest(
        &mut self,
        _dataset: &DatasetHandle,
        _issues: &IssueSet,
    ) -> EngineResult<FixOptionSet> {
        self.enter(EngineCall::Suggest)?;
        Ok(self.options.clone())
    }

    fn apply(
        &mut self,
        _dataset: &DatasetHandle,
        selections: &SelectionExport,
    ) -> EngineResult<(DatasetHandle, Vec<AppliedFix>)> {
        self.enter(EngineCall::Apply)?;

        let fixes = selections
            .iter()
            .map(|selection| {
                let count = self
                    .issues
                    .get(selection.category, &selection.key)
                    .map(|issue| issue.count)
                    .unwrap_or(0);
                let mut fix = AppliedFix::new(
                    selection.category,
                    selection.key.clone(),
                    selection.option.method.clone(),
                    count,
                );
                if let Some(value) = selection.option.str_param("value") {
                    fix = fix.with_constant(value);
                }
                if let Some(format) = selection.option.str_param("format") {
                    fix = fix.with_format(format);
                }
                fix
            })
            .collect();

        Ok((DatasetHandle::new("mock-cleaned"), fixes))
    }

    fn report(
        &mut self,
        _original: &DatasetHandle,
        _cleaned: &DatasetHandle,
        _fixes: &[AppliedFix],
    ) -> EngineResult<ReportReference> {
        self.enter(EngineCall::Report)?;
        Ok(ReportReference::new("mock-report"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
