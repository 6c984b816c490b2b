//! Core runner trait and execution result types.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RunnerResult;

/// Result of one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Unique id for this invocation (diagnostics correlation).
    pub invocation_id: String,
    /// Process exit code (-1 if terminated by signal).
    pub exit_code: i64,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// When the process was spawned.
    pub started_at: DateTime<Utc>,
    /// When the process finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Whether the invocation exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combined stdout and stderr, in that order.
    ///
    /// The engine interleaves progress and errors across both streams; the
    /// orchestrator classifies the combined text, never a single stream.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Abstraction over the provisioning engine subprocess.
///
/// `args` is the engine verb plus flags (e.g. `["stack", "ls"]`); the program
/// name itself belongs to the implementation. Implementations must not mutate
/// the process-wide environment: any engine-steering variables are applied as
/// an overlay on the spawned child only.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one engine command in `work_dir`, capturing its output.
    async fn run(&self, work_dir: &Path, args: &[&str]) -> RunnerResult<CommandOutput>;

    /// Whether the engine binary can be invoked at all.
    async fn is_available(&self) -> RunnerResult<bool>;
}
