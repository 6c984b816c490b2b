//! CLI-based engine runner.
//!
//! Spawns the engine binary synchronously per invocation. All engine calls in
//! restack are blocking by contract: one command runs to completion before
//! the orchestrator decides its next step, and there is no timeout. A hang
//! in the engine is a hang in the orchestrator.

use std::path::Path;
use std::process::{Command, Stdio};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::config::EngineEnv;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandOutput, CommandRunner};

/// Default engine binary name.
pub const DEFAULT_PROGRAM: &str = "pulumi";

/// CLI runner options.
#[derive(Debug, Clone)]
pub struct CliRunnerOptions {
    /// Engine binary to invoke.
    pub program: String,
    /// Dry-run mode (log commands without executing).
    pub dry_run: bool,
}

impl Default for CliRunnerOptions {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            dry_run: false,
        }
    }
}

impl CliRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// CLI-based engine runner.
pub struct CliRunner {
    options: CliRunnerOptions,
    env: EngineEnv,
}

impl CliRunner {
    /// Create a runner with the given options and environment overlay.
    pub fn new(options: CliRunnerOptions, env: EngineEnv) -> Self {
        Self { options, env }
    }

    /// The configured engine binary name.
    pub fn program(&self) -> &str {
        &self.options.program
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Format a command line for logging.
    fn format_command(&self, args: &[&str]) -> String {
        let mut cmd = self.options.program.clone();
        for arg in args {
            if arg.contains(' ') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }
}

#[async_trait]
impl CommandRunner for CliRunner {
    async fn run(&self, work_dir: &Path, args: &[&str]) -> RunnerResult<CommandOutput> {
        let cmd_str = self.format_command(args);
        debug!("Executing: {} (in {:?})", cmd_str, work_dir);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", cmd_str);
            return Ok(CommandOutput {
                invocation_id: format!("dry-run-{}", uuid::Uuid::new_v4()),
                exit_code: 0,
                stdout: format!("[DRY-RUN] Command: {}", cmd_str),
                stderr: String::new(),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                duration_ms: 0,
            });
        }

        let started_at = Utc::now();
        let output = Command::new(&self.options.program)
            .args(args)
            .current_dir(work_dir)
            .envs(self.env.to_env())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                RunnerError::SpawnFailed(format!("{} ({})", e, self.options.program))
            })?;
        let finished_at = Utc::now();

        let exit_code = output.status.code().unwrap_or(-1) as i64;
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        if exit_code == 0 {
            debug!("Engine command completed in {}ms", duration_ms);
        } else {
            debug!(
                "Engine command exited with code {} after {}ms",
                exit_code, duration_ms
            );
        }

        Ok(CommandOutput {
            invocation_id: uuid::Uuid::new_v4().to_string(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            started_at,
            finished_at,
            duration_ms,
        })
    }

    async fn is_available(&self) -> RunnerResult<bool> {
        let status = Command::new(&self.options.program)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        Ok(status.map(|s| s.success()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_command_quotes_spaces() {
        let runner = CliRunner::new(CliRunnerOptions::default(), EngineEnv::new("/tmp/s"));

        let formatted = runner.format_command(&["stack", "init", "my stack"]);
        assert_eq!(formatted, "pulumi stack init 'my stack'");
    }

    #[test]
    fn test_custom_program() {
        let options = CliRunnerOptions::new().program("engine-compat");
        let runner = CliRunner::new(options, EngineEnv::new("/tmp/s"));

        assert_eq!(runner.program(), "engine-compat");
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let options = CliRunnerOptions::new().dry_run();
        let runner = CliRunner::new(options, EngineEnv::new("/tmp/s"));

        let output = runner
            .run(Path::new("/nonexistent-dir"), &["up", "--yes"])
            .await
            .unwrap();

        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("[DRY-RUN]"));
    }
}
