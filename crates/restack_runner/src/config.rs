//! Per-invocation engine environment configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment overlay applied to every engine invocation.
///
/// The engine reads its state root, passphrase, and update-check behavior
/// from environment variables. This record is threaded into each spawned
/// child explicitly, so the orchestrator stays reentrant within one process
/// and never leaks configuration across invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEnv {
    /// Directory the engine uses as its state root (locks, stacks).
    pub state_root: PathBuf,
    /// Secrets passphrase; empty disables interactive passphrase prompts.
    pub passphrase: String,
    /// Suppress the engine's own version-check network call.
    pub skip_update_check: bool,
    /// Additional variables (provider credentials, proxies).
    pub extra: HashMap<String, String>,
}

impl EngineEnv {
    /// Create an overlay rooted at the given engine state directory.
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
            passphrase: String::new(),
            skip_update_check: true,
            extra: HashMap::new(),
        }
    }

    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    pub fn skip_update_check(mut self, skip: bool) -> Self {
        self.skip_update_check = skip;
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The engine state root.
    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    /// Materialize the overlay as (key, value) pairs for a child process.
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                "PULUMI_HOME".to_string(),
                self.state_root.to_string_lossy().to_string(),
            ),
            (
                "PULUMI_CONFIG_PASSPHRASE".to_string(),
                self.passphrase.clone(),
            ),
        ];
        if self.skip_update_check {
            pairs.push(("PULUMI_SKIP_UPDATE_CHECK".to_string(), "true".to_string()));
        }
        for (key, value) in &self.extra {
            pairs.push((key.clone(), value.clone()));
        }
        pairs
    }
}
