//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur during runner operations.
///
/// A non-zero exit status from the engine is NOT an error at this layer; it
/// is reported through [`crate::CommandOutput::exit_code`] so the orchestrator
/// can classify the diagnostics. Only failures to invoke the engine at all
/// surface here.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("Failed to spawn engine process: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
