//! Error types for the scullery library.

use thiserror::Error;

use crate::engine::EngineCall;

/// Main error type for scullery operations.
///
/// The three public variants map onto the workflow's error taxonomy:
/// `Validation` for unmet transition preconditions (rejected locally, state
/// unchanged), `Engine` for a failed external collaborator call (message
/// surfaced verbatim), and `Usage` for programming-level misuse that should
/// be fixed rather than handled.
#[derive(Debug, Clone, Error)]
pub enum SculleryError {
    /// A precondition for the requested transition was not met.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An external engine call failed.
    #[error("{call} engine failed: {message}")]
    Engine {
        call: EngineCall,
        message: String,
    },

    /// Programming-level misuse of the API.
    #[error("usage error: {0}")]
    Usage(String),

    /// Error saving or loading a provenance record.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl SculleryError {
    /// True if this error came from an external engine.
    pub fn is_engine(&self) -> bool {
        matches!(self, SculleryError::Engine { .. })
    }

    /// True if this error is a locally rejected precondition.
    pub fn is_validation(&self) -> bool {
        matches!(self, SculleryError::Validation(_))
    }
}

/// Result type alias for scullery operations.
pub type Result<T> = std::result::Result<T, SculleryError>;
