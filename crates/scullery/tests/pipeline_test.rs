//! Integration tests for the scullery cleaning workflow.

use scullery::{
    ColumnSummary, ColumnType, DUPLICATE_ROWS_KEY, EngineCall, FixOption, FixOptionSet,
    InMemoryEngine, Issue, IssueCategory, IssueSet, MockEngine, Pipeline, ProvenanceRecord, Stage,
    StageView,
};

/// A small dataset with one issue of every category: a missing age, an exact
/// duplicate row, an extreme age value, and a mixed date format.
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

const CLEAN_CSV: &[u8] = b"id,name\n1,Alice\n2,Bob\n3,Carol\n";

fn hundred_row_summary() -> scullery::DatasetSummary {
    scullery::DatasetSummary::new(
        100,
        vec![
            ColumnSummary::new("age", ColumnType::Integer, 10, 100, 35),
            ColumnSummary::new("name", ColumnType::Text, 0, 100, 98),
            ColumnSummary::new("city", ColumnType::Text, 0, 100, 12),
        ],
    )
}

fn scripted_engine() -> MockEngine {
    let issues: IssueSet = [Issue::new(IssueCategory::MissingValues, "age", 10, 100)]
        .into_iter()
        .collect();
    let mut options = FixOptionSet::new();
    options.insert(
        IssueCategory::MissingValues,
        "age",
        vec![FixOption::new("mean", "Replace with mean value")],
    );
    MockEngine::new()
        .with_summary(hundred_row_summary())
        .with_issues(issues)
        .with_options(options)
}

// =============================================================================
// Scripted End-to-End Scenario
// =============================================================================

#[test]
fn test_end_to_end_scripted_scenario() {
    let mut pipeline = Pipeline::new(scripted_engine());

    pipeline.upload(b"age,name,city\n34,Alice,Boston\n").unwrap();
    let summary = pipeline.summary().unwrap();
    assert_eq!(summary.total_rows, 100);
    assert_eq!(summary.total_columns, 3);

    let issue = pipeline
        .issues()
        .unwrap()
        .get(IssueCategory::MissingValues, "age")
        .unwrap();
    assert_eq!(issue.count, 10);
    assert_eq!(issue.percentage, 10.0);

    pipeline.suggest().unwrap();
    let offered = pipeline
        .fix_options()
        .unwrap()
        .options_for(IssueCategory::MissingValues, "age")
        .unwrap();
    assert_eq!(offered.len(), 1);
    assert_eq!(offered[0].method, "mean");

    pipeline
        .select(IssueCategory::MissingValues, "age", "mean")
        .unwrap();
    assert_eq!(pipeline.completion_ratio(), 1.0);

    pipeline.apply().unwrap();
    let fixes = pipeline.applied_fixes().unwrap();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].category, IssueCategory::MissingValues);
    assert_eq!(fixes[0].key, "age");
    assert_eq!(fixes[0].method, "mean");

    pipeline.report().unwrap();
    assert!(pipeline.report_reference().is_some());
    assert_eq!(pipeline.stage(), Stage::Reported);
}

// =============================================================================
// Full Run Against the In-Memory Engine
// =============================================================================

#[test]
fn test_full_run_against_in_memory_engine() {
    let mut pipeline = Pipeline::new(InMemoryEngine::new());

    pipeline.upload(MESSY_CSV).unwrap();
    assert_eq!(pipeline.stage(), Stage::Detected);
    assert_eq!(pipeline.summary().unwrap().total_rows, 10);
    assert_eq!(pipeline.issues().unwrap().len(), 4);

    pipeline.suggest().unwrap();

    // Apply must be refused until every issue is decided.
    pipeline
        .select(IssueCategory::MissingValues, "age", "mean")
        .unwrap();
    let err = pipeline.apply().unwrap_err();
    assert!(err.is_validation());
    assert_eq!(pipeline.stage(), Stage::Suggested);

    pipeline
        .select(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, "drop_first")
        .unwrap();
    pipeline
        .select(IssueCategory::Outliers, "age", "cap")
        .unwrap();
    pipeline
        .select(IssueCategory::InconsistentFormats, "visit_date", "iso_date")
        .unwrap();
    assert!(pipeline.is_complete());

    pipeline.apply().unwrap();
    let fixes = pipeline.applied_fixes().unwrap();
    assert_eq!(fixes.len(), 4);
    assert_ne!(
        pipeline.cleaned_handle().unwrap(),
        pipeline.dataset_handle().unwrap()
    );

    pipeline.report().unwrap();
    let reference = pipeline.report_reference().unwrap();
    let content = pipeline.engine().report_content(reference).unwrap();
    assert!(content.contains("Data Quality Report"));
    assert!(content.contains("missing values in column age"));
    assert!(content.contains("duplicate rows"));
}

#[test]
fn test_no_issues_path_runs_through_trivially() {
    let mut pipeline = Pipeline::new(InMemoryEngine::new());

    pipeline.upload(CLEAN_CSV).unwrap();
    assert!(pipeline.issues().unwrap().is_empty());

    pipeline.suggest().unwrap();
    assert!(pipeline.fix_options().unwrap().is_empty());
    assert_eq!(pipeline.completion_ratio(), 0.0);
    assert!(pipeline.is_complete());

    pipeline.apply().unwrap();
    assert!(pipeline.applied_fixes().unwrap().is_empty());

    pipeline.report().unwrap();
    let content = pipeline
        .engine()
        .report_content(pipeline.report_reference().unwrap())
        .unwrap();
    assert!(content.contains("No fixes were applied"));
}

// =============================================================================
// Backward Navigation
// =============================================================================

#[test]
fn test_backward_navigation_is_a_pure_read() {
    let mut pipeline = Pipeline::new(InMemoryEngine::new());
    pipeline.upload(MESSY_CSV).unwrap();
    pipeline.suggest().unwrap();
    pipeline
        .select(IssueCategory::MissingValues, "age", "mean")
        .unwrap();
    pipeline
        .select(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, "drop_first")
        .unwrap();
    pipeline
        .select(IssueCategory::Outliers, "age", "cap")
        .unwrap();
    pipeline
        .select(IssueCategory::InconsistentFormats, "visit_date", "iso_date")
        .unwrap();
    pipeline.apply().unwrap();
    assert_eq!(pipeline.stage(), Stage::Applied);

    // Viewing Detected again must not call the detection engine a second
    // time, must not change the stage, and must not touch the selections.
    match pipeline.navigate(Stage::Detected).unwrap() {
        StageView::Detected { issues } => assert_eq!(issues.len(), 4),
        view => panic!("expected Detected view, got {view:?}"),
    }
    match pipeline.navigate(Stage::Suggested).unwrap() {
        StageView::Suggested { tracker, .. } => assert_eq!(tracker.selected_count(), 4),
        view => panic!("expected Suggested view, got {view:?}"),
    }

    assert_eq!(pipeline.stage(), Stage::Applied);
    assert!(
        pipeline
            .selection_for(IssueCategory::MissingValues, "age")
            .is_some()
    );
}

#[test]
fn test_navigation_counts_no_extra_engine_calls() {
    let mut pipeline = Pipeline::new(scripted_engine());
    pipeline.upload(b"data").unwrap();
    pipeline.suggest().unwrap();
    pipeline
        .select(IssueCategory::MissingValues, "age", "mean")
        .unwrap();
    pipeline.apply().unwrap();

    assert_eq!(pipeline.engine().call_count(EngineCall::Detect), 1);
    pipeline.navigate(Stage::Detected).unwrap();
    pipeline.navigate(Stage::Summarized).unwrap();
    pipeline.navigate(Stage::Applied).unwrap();
    assert_eq!(pipeline.engine().call_count(EngineCall::Detect), 1);
    assert_eq!(pipeline.engine().call_count(EngineCall::Ingest), 1);
    assert_eq!(pipeline.engine().call_count(EngineCall::Suggest), 1);
}

// =============================================================================
// Provenance
// =============================================================================

#[test]
fn test_provenance_record_survives_disk_round_trip() {
    let mut pipeline = Pipeline::new(InMemoryEngine::new());
    pipeline.upload(MESSY_CSV).unwrap();
    pipeline.suggest().unwrap();
    pipeline
        .select(IssueCategory::MissingValues, "age", "mean")
        .unwrap();
    pipeline
        .select(IssueCategory::Duplicates, DUPLICATE_ROWS_KEY, "drop_first")
        .unwrap();
    pipeline
        .select(IssueCategory::Outliers, "age", "remove")
        .unwrap();
    pipeline
        .select(IssueCategory::InconsistentFormats, "visit_date", "iso_date")
        .unwrap();
    pipeline.apply().unwrap();

    let record = pipeline.provenance().unwrap();
    assert_eq!(record.fixes.len(), 4);
    assert_eq!(record.descriptions.len(), 4);
    assert!(
        record
            .descriptions
            .iter()
            .any(|d| d.contains("duplicate rows"))
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.provenance.json");
    record.save(&path).unwrap();
    let loaded = ProvenanceRecord::load(&path).unwrap();
    assert_eq!(loaded.descriptions, record.descriptions);
}
