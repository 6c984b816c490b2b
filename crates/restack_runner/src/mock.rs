//! Mock engine runner for testing.
//!
//! Provides a scripted implementation of the [`CommandRunner`] trait so the
//! orchestrator's escalation logic can be exercised without a real engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandOutput, CommandRunner};

/// Predefined response for an engine invocation.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Captured invocation for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub work_dir: PathBuf,
    pub args: Vec<String>,
}

impl CapturedCall {
    /// The invocation rendered as a single command line.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

struct MockRule {
    pattern: String,
    responses: Vec<MockResponse>,
    hits: AtomicUsize,
}

/// Mock engine runner.
///
/// Responses are scripted per command pattern: a rule matches when its
/// pattern appears anywhere in the space-joined argument list, and the rule
/// with the longest matching pattern wins. A rule with several responses
/// replays them in registration order, repeating the last one. Unmatched
/// commands succeed with empty output.
#[derive(Clone)]
pub struct MockRunner {
    rules: Arc<RwLock<Vec<MockRule>>>,
    captured: Arc<RwLock<Vec<CapturedCall>>>,
    available: Arc<RwLock<bool>>,
    spawn_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Create a mock runner that answers every command with success.
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            captured: Arc::new(RwLock::new(Vec::new())),
            available: Arc::new(RwLock::new(true)),
            spawn_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Script a response for commands matching `pattern`.
    ///
    /// Calling `on` again with the same pattern queues a further response
    /// for subsequent matching invocations.
    pub fn on(self, pattern: impl Into<String>, response: MockResponse) -> Self {
        let pattern = pattern.into();
        {
            let mut rules = self.rules.write();
            if let Some(rule) = rules.iter_mut().find(|r| r.pattern == pattern) {
                rule.responses.push(response);
            } else {
                rules.push(MockRule {
                    pattern,
                    responses: vec![response],
                    hits: AtomicUsize::new(0),
                });
            }
        }
        self
    }

    /// Set whether the engine should report as available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Make every invocation fail at spawn level.
    pub fn simulate_spawn_failure(self, message: impl Into<String>) -> Self {
        *self.spawn_failure.write() = Some(message.into());
        self
    }

    /// All captured invocations, in order.
    pub fn calls(&self) -> Vec<CapturedCall> {
        self.captured.read().clone()
    }

    /// Number of invocations made.
    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    /// Whether any invocation's command line contains `pattern`.
    pub fn was_invoked(&self, pattern: &str) -> bool {
        self.captured
            .read()
            .iter()
            .any(|c| c.command_line().contains(pattern))
    }

    /// Invocations whose command line contains `pattern`.
    pub fn invocations_matching(&self, pattern: &str) -> Vec<CapturedCall> {
        self.captured
            .read()
            .iter()
            .filter(|c| c.command_line().contains(pattern))
            .cloned()
            .collect()
    }

    fn respond(&self, command_line: &str) -> MockResponse {
        let rules = self.rules.read();
        let best = rules
            .iter()
            .filter(|r| command_line.contains(&r.pattern))
            .max_by_key(|r| r.pattern.len());

        match best {
            Some(rule) => {
                let hit = rule.hits.fetch_add(1, Ordering::SeqCst);
                rule.responses
                    .get(hit.min(rule.responses.len() - 1))
                    .cloned()
                    .unwrap_or_else(|| MockResponse::success(""))
            }
            None => MockResponse::success(""),
        }
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, work_dir: &Path, args: &[&str]) -> RunnerResult<CommandOutput> {
        let call = CapturedCall {
            work_dir: work_dir.to_path_buf(),
            args: args.iter().map(|s| s.to_string()).collect(),
        };
        let command_line = call.command_line();
        self.captured.write().push(call);

        if let Some(message) = self.spawn_failure.read().clone() {
            return Err(RunnerError::SpawnFailed(message));
        }

        let response = self.respond(&command_line);
        let now = Utc::now();

        Ok(CommandOutput {
            invocation_id: format!("mock-{}", uuid::Uuid::new_v4()),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        })
    }

    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(*self.available.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unmatched_command_succeeds() {
        let runner = MockRunner::new();

        let output = runner.run(Path::new("/w"), &["stack", "ls"]).await.unwrap();
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_longest_pattern_wins() {
        let runner = MockRunner::new()
            .on("up", MockResponse::failure(1, "primary failed"))
            .on("up --refresh-only", MockResponse::success("refreshed"));

        let primary = runner
            .run(Path::new("/w"), &["up", "--yes", "--stack", "s1"])
            .await
            .unwrap();
        assert_eq!(primary.exit_code, 1);

        let refresh_only = runner
            .run(Path::new("/w"), &["up", "--refresh-only", "--yes"])
            .await
            .unwrap();
        assert_eq!(refresh_only.exit_code, 0);
        assert_eq!(refresh_only.stdout, "refreshed");
    }

    #[tokio::test]
    async fn test_sequential_responses_repeat_last() {
        let runner = MockRunner::new()
            .on("destroy", MockResponse::failure(1, "first"))
            .on("destroy", MockResponse::success("second"));

        let first = runner.run(Path::new("/w"), &["destroy"]).await.unwrap();
        assert_eq!(first.exit_code, 1);

        let second = runner.run(Path::new("/w"), &["destroy"]).await.unwrap();
        assert_eq!(second.exit_code, 0);

        let third = runner.run(Path::new("/w"), &["destroy"]).await.unwrap();
        assert_eq!(third.exit_code, 0, "last response repeats");
    }

    #[tokio::test]
    async fn test_captures_calls() {
        let runner = MockRunner::new();

        let _ = runner.run(Path::new("/w"), &["refresh", "--yes"]).await;
        let _ = runner.run(Path::new("/w"), &["up", "--yes"]).await;

        assert_eq!(runner.call_count(), 2);
        assert!(runner.was_invoked("refresh"));
        assert!(!runner.was_invoked("destroy"));
        assert_eq!(runner.invocations_matching("up").len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let runner = MockRunner::new().simulate_spawn_failure("engine missing");

        let result = runner.run(Path::new("/w"), &["up"]).await;
        assert!(result.is_err());
    }
}
