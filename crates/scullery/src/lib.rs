//! Scullery: guided cleaning workflow for tabular datasets.
//!
//! Scullery drives the multi-stage pipeline that prepares a dataset for
//! machine-learning training: upload, summarize, detect issues, offer fixes,
//! let an operator choose one fix per issue, apply the chosen fixes, and
//! report what changed.
//!
//! # Core Principles
//!
//! - **Decision before action**: every detected issue needs an operator
//!   selection before any fix runs; application is all-or-nothing
//! - **Non-destructive**: the original dataset is superseded, never modified
//! - **Full provenance**: every applied fix is recorded and describable
//!
//! # Example
//!
//! ```
//! use scullery::{InMemoryEngine, IssueCategory, Pipeline, Stage};
//!
//! let csv = b"age,name\n34,Alice\n,Bob\n29,Carol\n";
//! let mut pipeline = Pipeline::new(InMemoryEngine::new());
//!
//! pipeline.upload(csv).unwrap();
//! assert_eq!(pipeline.stage(), Stage::Detected);
//!
//! pipeline.suggest().unwrap();
//! pipeline.select(IssueCategory::MissingValues, "age", "mean").unwrap();
//! assert!(pipeline.is_complete());
//!
//! pipeline.apply().unwrap();
//! pipeline.report().unwrap();
//! assert_eq!(pipeline.stage(), Stage::Reported);
//! ```

pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provenance;
pub mod selection;

pub use engine::{CleaningEngine, EngineCall, EngineError, EngineResult, InMemoryEngine, MockEngine};
pub use error::{Result, SculleryError};
pub use model::{
    AppliedFix, ColumnSummary, ColumnType, DUPLICATE_ROWS_KEY, DatasetHandle, DatasetSummary,
    FixOption, FixOptionSet, Issue, IssueCategory, IssueKey, IssueSet, NumericSummary,
    ReportReference,
};
pub use pipeline::{Pipeline, Stage, StageView};
pub use provenance::ProvenanceRecord;
pub use selection::{Selection, SelectionExport, SelectionTracker};
