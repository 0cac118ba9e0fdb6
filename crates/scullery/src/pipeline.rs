//! The five-stage cleaning workflow state machine.
//!
//! A [`Pipeline`] owns one run: it sequences the external engine calls,
//! enforces the stage preconditions, and stores every stage's output so the
//! presentation shell can navigate backward without re-invoking an engine.
//!
//! Stage payloads are modeled as a tagged variant per stage, each nesting
//! the payload of the stage before it. Out-of-order transitions (apply
//! before suggest, report before apply) are therefore unrepresentable, not
//! merely checked.
//!
//! A run is strictly sequential: every transition takes `&mut self`, so the
//! borrow checker is the serialization mechanism — a second mutating call
//! against the same run cannot be expressed while one is in flight. Engine
//! calls block until they resolve; there is no cancellation.

use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::engine::{CleaningEngine, EngineCall, EngineError};
use crate::error::{Result, SculleryError};
use crate::model::{
    AppliedFix, DatasetHandle, DatasetSummary, FixOption, FixOptionSet, IssueCategory, IssueSet,
    ReportReference,
};
use crate::provenance::ProvenanceRecord;
use crate::selection::SelectionTracker;

/// The six ordered stages of a cleaning run.
///
/// The derived ordering follows the pipeline: `Empty < Summarized < Detected
/// < Suggested < Applied < Reported`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No dataset yet.
    Empty,
    /// Dataset ingested and summarized.
    Summarized,
    /// Issue detection has run.
    Detected,
    /// Fix options offered; the operator is deciding.
    Suggested,
    /// Chosen fixes executed.
    Applied,
    /// Report generated; terminal for this run.
    Reported,
}

impl Stage {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Empty => "Empty",
            Stage::Summarized => "Summarized",
            Stage::Detected => "Detected",
            Stage::Suggested => "Suggested",
            Stage::Applied => "Applied",
            Stage::Reported => "Reported",
        }
    }

    /// True once the run has produced its report.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Reported)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Payload once ingestion has produced a summary.
#[derive(Debug, Clone)]
struct SummarizedData {
    handle: DatasetHandle,
    summary: DatasetSummary,
}

/// Payload once detection has run.
#[derive(Debug, Clone)]
struct DetectedData {
    summarized: SummarizedData,
    issues: IssueSet,
}

/// Payload once fix options are offered.
#[derive(Debug, Clone)]
struct SuggestedData {
    detected: DetectedData,
    tracker: SelectionTracker,
}

/// Payload once fixes have been applied.
#[derive(Debug, Clone)]
struct AppliedData {
    suggested: SuggestedData,
    cleaned: DatasetHandle,
    fixes: Vec<AppliedFix>,
}

/// Payload once the report exists.
#[derive(Debug, Clone)]
struct ReportedData {
    applied: AppliedData,
    report: ReportReference,
}

/// The run's tagged state. Each variant nests everything produced so far.
#[derive(Debug, Clone)]
enum StageState {
    Empty,
    Summarized(SummarizedData),
    Detected(DetectedData),
    Suggested(SuggestedData),
    Applied(AppliedData),
    Reported(ReportedData),
}

/// Read-only projection of one stage's stored output.
#[derive(Debug)]
pub enum StageView<'a> {
    Empty,
    Summarized {
        handle: &'a DatasetHandle,
        summary: &'a DatasetSummary,
    },
    Detected {
        issues: &'a IssueSet,
    },
    Suggested {
        options: &'a FixOptionSet,
        tracker: &'a SelectionTracker,
    },
    Applied {
        cleaned: &'a DatasetHandle,
        fixes: &'a [AppliedFix],
    },
    Reported {
        report: &'a ReportReference,
    },
}

/// Drives a single cleaning run against a [`CleaningEngine`].
pub struct Pipeline<E: CleaningEngine> {
    engine: E,
    state: StageState,
    last_error: Option<SculleryError>,
}

impl<E: CleaningEngine> Pipeline<E> {
    /// Create a pipeline for a new run.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: StageState::Empty,
            last_error: None,
        }
    }

    /// Read access to the underlying engine, e.g. to fetch stored report
    /// content from the bundled in-memory engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The stage the run has reached.
    pub fn stage(&self) -> Stage {
        match &self.state {
            StageState::Empty => Stage::Empty,
            StageState::Summarized(_) => Stage::Summarized,
            StageState::Detected(_) => Stage::Detected,
            StageState::Suggested(_) => Stage::Suggested,
            StageState::Applied(_) => Stage::Applied,
            StageState::Reported(_) => Stage::Reported,
        }
    }

    /// The error left by the most recent failed transition, until a later
    /// attempt overwrites it.
    pub fn last_error(&self) -> Option<&SculleryError> {
        self.last_error.as_ref()
    }

    // -------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------

    /// Ingest an uploaded file. Valid only before a dataset exists.
    ///
    /// On success, detection runs automatically — there is no idle step
    /// between Summarized and Detected. If the automatic detection fails,
    /// the run stays at Summarized with the error attached (and the summary
    /// still visible); `Ok(Stage::Summarized)` is returned and [`detect`]
    /// may be retried.
    ///
    /// [`detect`]: Self::detect
    pub fn upload(&mut self, file: &[u8]) -> Result<Stage> {
        let current = self.stage();
        if current != Stage::Empty {
            return Err(self.record(wrong_stage("upload", Stage::Empty, current)));
        }

        let (handle, summary) = match self.engine.ingest(file) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.record(engine_failure(EngineCall::Ingest, e))),
        };

        tracing::info!(
            %handle,
            rows = summary.total_rows,
            columns = summary.total_columns,
            "dataset summarized"
        );
        self.state = StageState::Summarized(SummarizedData { handle, summary });
        self.last_error = None;

        if self.detect().is_err() {
            // The failure is recorded in last_error; visible progress stays
            // at Summarized rather than stranding the run.
            return Ok(Stage::Summarized);
        }
        Ok(Stage::Detected)
    }

    /// Scan the summarized dataset for issues. Valid from Summarized; runs
    /// automatically after a successful upload and remains available for
    /// retry after a failure.
    pub fn detect(&mut self) -> Result<Stage> {
        let current = self.stage();
        let handle = match &self.state {
            StageState::Summarized(s) => s.handle.clone(),
            _ => return Err(self.record(wrong_stage("detect", Stage::Summarized, current))),
        };

        let issues = match self.engine.detect(&handle) {
            Ok(issues) => issues,
            Err(e) => return Err(self.record(engine_failure(EngineCall::Detect, e))),
        };

        tracing::debug!(issues = issues.len(), "detection complete");
        self.last_error = None;
        self.state = match mem::replace(&mut self.state, StageState::Empty) {
            StageState::Summarized(summarized) => {
                StageState::Detected(DetectedData { summarized, issues })
            }
            other => other,
        };
        Ok(Stage::Detected)
    }

    /// Request fix options for the detected issues. Valid from Detected; an
    /// empty issue set is permitted and yields an empty option set, keeping
    /// the "no issues found" path open through to a no-op apply.
    pub fn suggest(&mut self) -> Result<Stage> {
        let current = self.stage();
        let handle = match &self.state {
            StageState::Detected(d) => d.summarized.handle.clone(),
            _ => return Err(self.record(wrong_stage("suggest", Stage::Detected, current))),
        };

        let options = {
            let issues = match &self.state {
                StageState::Detected(d) => &d.issues,
                // Guarded above; the state cannot have changed since.
                _ => return Err(self.record(wrong_stage("suggest", Stage::Detected, current))),
            };
            match self.engine.suggest(&handle, issues) {
                Ok(options) => options,
                Err(e) => return Err(self.record(engine_failure(EngineCall::Suggest, e))),
            }
        };

        tracing::debug!(offered = options.len(), "fix options received");
        self.last_error = None;
        self.state = match mem::replace(&mut self.state, StageState::Empty) {
            StageState::Detected(detected) => StageState::Suggested(SuggestedData {
                detected,
                tracker: SelectionTracker::new(options),
            }),
            other => other,
        };
        Ok(Stage::Suggested)
    }

    /// Record the operator's chosen method for one issue. Valid only while
    /// Suggested; does not change the stage, and may overwrite an earlier
    /// choice for the same issue.
    pub fn select(&mut self, category: IssueCategory, key: &str, method: &str) -> Result<()> {
        let current = self.stage();
        match &mut self.state {
            StageState::Suggested(s) => s.tracker.select(category, key, method),
            _ => Err(SculleryError::Validation(format!(
                "selections are only accepted in the Suggested stage (current: {current})"
            ))),
        }
    }

    /// Execute the chosen fixes. Valid from Suggested, and only once every
    /// detected issue has a selection (trivially true for an empty issue
    /// set). All-or-nothing: an incomplete selection map is rejected before
    /// the engine is ever called, and an engine failure leaves the run at
    /// Suggested.
    pub fn apply(&mut self) -> Result<Stage> {
        let current = self.stage();
        let gate = match &self.state {
            StageState::Suggested(s) => {
                if s.tracker.is_complete(&s.detected.issues) {
                    Ok((s.detected.summarized.handle.clone(), s.tracker.export()))
                } else {
                    let decided = s
                        .detected
                        .issues
                        .keys()
                        .filter(|k| s.tracker.selection_for(k.category, &k.key).is_some())
                        .count();
                    Err(SculleryError::Validation(format!(
                        "cannot apply fixes: {decided} of {} issues have a selection",
                        s.detected.issues.len()
                    )))
                }
            }
            _ => Err(wrong_stage("apply", Stage::Suggested, current)),
        };
        let (handle, export) = match gate {
            Ok(gated) => gated,
            Err(e) => return Err(self.record(e)),
        };

        let (cleaned, fixes) = match self.engine.apply(&handle, &export) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.record(engine_failure(EngineCall::Apply, e))),
        };

        tracing::info!(%cleaned, fixes = fixes.len(), "fixes applied");
        self.last_error = None;
        self.state = match mem::replace(&mut self.state, StageState::Empty) {
            StageState::Suggested(suggested) => StageState::Applied(AppliedData {
                suggested,
                cleaned,
                fixes,
            }),
            other => other,
        };
        Ok(Stage::Applied)
    }

    /// Generate the report for the run. Valid from Applied; Reported is
    /// terminal — the only further action is [`reset`].
    ///
    /// [`reset`]: Self::reset
    pub fn report(&mut self) -> Result<Stage> {
        let current = self.stage();
        let (original, cleaned) = match &self.state {
            StageState::Applied(a) => (
                a.suggested.detected.summarized.handle.clone(),
                a.cleaned.clone(),
            ),
            _ => return Err(self.record(wrong_stage("report", Stage::Applied, current))),
        };

        let reference = {
            let fixes = match &self.state {
                StageState::Applied(a) => a.fixes.as_slice(),
                // Guarded above; the state cannot have changed since.
                _ => return Err(self.record(wrong_stage("report", Stage::Applied, current))),
            };
            match self.engine.report(&original, &cleaned, fixes) {
                Ok(reference) => reference,
                Err(e) => return Err(self.record(engine_failure(EngineCall::Report, e))),
            }
        };

        tracing::info!(report = %reference, "report generated");
        self.last_error = None;
        self.state = match mem::replace(&mut self.state, StageState::Empty) {
            StageState::Applied(applied) => StageState::Reported(ReportedData {
                applied,
                report: reference,
            }),
            other => other,
        };
        Ok(Stage::Reported)
    }

    /// Start a new run, discarding all prior state. Nothing carries over.
    pub fn reset(&mut self) {
        tracing::debug!(from = %self.stage(), "run reset");
        self.state = StageState::Empty;
        self.last_error = None;
    }

    // -------------------------------------------------------------------
    // Read-only projections
    // -------------------------------------------------------------------

    /// The summary of the uploaded dataset, once available.
    pub fn summary(&self) -> Option<&DatasetSummary> {
        self.summarized_ref().map(|s| &s.summary)
    }

    /// The handle of the original uploaded dataset, once available.
    pub fn dataset_handle(&self) -> Option<&DatasetHandle> {
        self.summarized_ref().map(|s| &s.handle)
    }

    /// The detected issue set, once available.
    pub fn issues(&self) -> Option<&IssueSet> {
        self.detected_ref().map(|d| &d.issues)
    }

    /// The offered fix options, once available.
    pub fn fix_options(&self) -> Option<&FixOptionSet> {
        self.suggested_ref().map(|s| s.tracker.offered())
    }

    /// The chosen option for an issue, if decided.
    pub fn selection_for(&self, category: IssueCategory, key: &str) -> Option<&FixOption> {
        self.suggested_ref()
            .and_then(|s| s.tracker.selection_for(category, key))
    }

    /// Fraction of detected issues with a selection; 0 before the Suggested
    /// stage or when there is nothing to decide.
    pub fn completion_ratio(&self) -> f64 {
        match self.suggested_ref() {
            Some(s) => s.tracker.completion_ratio(&s.detected.issues),
            None => 0.0,
        }
    }

    /// True once every detected issue has a selection (or there were none).
    pub fn is_complete(&self) -> bool {
        match self.suggested_ref() {
            Some(s) => s.tracker.is_complete(&s.detected.issues),
            None => false,
        }
    }

    /// The applied-fix provenance records, once available.
    pub fn applied_fixes(&self) -> Option<&[AppliedFix]> {
        self.applied_ref().map(|a| a.fixes.as_slice())
    }

    /// The cleaned dataset handle, once available.
    pub fn cleaned_handle(&self) -> Option<&DatasetHandle> {
        self.applied_ref().map(|a| &a.cleaned)
    }

    /// The generated report reference, once available.
    pub fn report_reference(&self) -> Option<&ReportReference> {
        self.reported_ref().map(|r| &r.report)
    }

    /// Assemble the provenance record for the run, once fixes have been
    /// applied.
    pub fn provenance(&self) -> Option<ProvenanceRecord> {
        self.applied_ref().map(|a| {
            ProvenanceRecord::new(
                a.suggested.detected.summarized.handle.clone(),
                a.cleaned.clone(),
                a.fixes.clone(),
            )
        })
    }

    /// View the stored output of an earlier (or the current) stage.
    ///
    /// This is a pure read: it never mutates the run and never re-invokes an
    /// engine. Requesting a stage the run has not reached is a validation
    /// error.
    pub fn navigate(&self, stage: Stage) -> Result<StageView<'_>> {
        if stage > self.stage() {
            return Err(SculleryError::Validation(format!(
                "cannot view the {} stage: the run has only reached {}",
                stage,
                self.stage()
            )));
        }
        let unreachable = || SculleryError::Validation(format!("no stored output for {stage}"));
        Ok(match stage {
            Stage::Empty => StageView::Empty,
            Stage::Summarized => {
                let s = self.summarized_ref().ok_or_else(unreachable)?;
                StageView::Summarized {
                    handle: &s.handle,
                    summary: &s.summary,
                }
            }
            Stage::Detected => {
                let d = self.detected_ref().ok_or_else(unreachable)?;
                StageView::Detected { issues: &d.issues }
            }
            Stage::Suggested => {
                let s = self.suggested_ref().ok_or_else(unreachable)?;
                StageView::Suggested {
                    options: s.tracker.offered(),
                    tracker: &s.tracker,
                }
            }
            Stage::Applied => {
                let a = self.applied_ref().ok_or_else(unreachable)?;
                StageView::Applied {
                    cleaned: &a.cleaned,
                    fixes: &a.fixes,
                }
            }
            Stage::Reported => {
                let r = self.reported_ref().ok_or_else(unreachable)?;
                StageView::Reported { report: &r.report }
            }
        })
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn summarized_ref(&self) -> Option<&SummarizedData> {
        match &self.state {
            StageState::Empty => None,
            StageState::Summarized(s) => Some(s),
            StageState::Detected(d) => Some(&d.summarized),
            StageState::Suggested(s) => Some(&s.detected.summarized),
            StageState::Applied(a) => Some(&a.suggested.detected.summarized),
            StageState::Reported(r) => Some(&r.applied.suggested.detected.summarized),
        }
    }

    fn detected_ref(&self) -> Option<&DetectedData> {
        match &self.state {
            StageState::Empty | StageState::Summarized(_) => None,
            StageState::Detected(d) => Some(d),
            StageState::Suggested(s) => Some(&s.detected),
            StageState::Applied(a) => Some(&a.suggested.detected),
            StageState::Reported(r) => Some(&r.applied.suggested.detected),
        }
    }

    fn suggested_ref(&self) -> Option<&SuggestedData> {
        match &self.state {
            StageState::Empty | StageState::Summarized(_) | StageState::Detected(_) => None,
            StageState::Suggested(s) => Some(s),
            StageState::Applied(a) => Some(&a.suggested),
            StageState::Reported(r) => Some(&r.applied.suggested),
        }
    }

    fn applied_ref(&self) -> Option<&AppliedData> {
        match &self.state {
            StageState::Applied(a) => Some(a),
            StageState::Reported(r) => Some(&r.applied),
            _ => None,
        }
    }

    fn reported_ref(&self) -> Option<&ReportedData> {
        match &self.state {
            StageState::Reported(r) => Some(r),
            _ => None,
        }
    }

    /// Record a failed transition and hand the error back to the caller.
    fn record(&mut self, err: SculleryError) -> SculleryError {
        tracing::warn!(error = %err, stage = %self.stage(), "transition failed");
        self.last_error = Some(err.clone());
        err
    }
}

fn wrong_stage(operation: &str, required: Stage, current: Stage) -> SculleryError {
    SculleryError::Validation(format!(
        "{operation} is not valid in the {current} stage (requires {required})"
    ))
}

fn engine_failure(call: EngineCall, err: EngineError) -> SculleryError {
    SculleryError::Engine {
        call,
        message: err.into_message(),
    }
}
