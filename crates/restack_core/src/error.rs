//! Error types for the orchestrator core.

use thiserror::Error;

use crate::diagnose::ErrorClass;

/// Result type alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Errors that terminate an operation.
///
/// Transient failures never surface here; the escalation ladder absorbs
/// them until it exhausts. These variants are the fatal terminal states.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Could not establish a backend session: every login strategy failed")]
    SessionFailed,

    #[error("Stack '{0}' not found; refusing to destroy a nonexistent stack")]
    StackNotFound(String),

    #[error("Provider error ({class:?}): {message}")]
    Provider { class: ErrorClass, message: String },

    #[error("Operation '{action}' failed after exhausting all remedial steps")]
    Exhausted { action: String },

    #[error("Runner error: {0}")]
    Runner(#[from] restack_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
