//! Stack existence resolution.
//!
//! A stack can be visible to the engine's listing but missing from the state
//! tree, or the reverse, after a crashed operation. Existence is therefore
//! reconciled across independent probes, with presence evidence dominating
//! absence evidence: a false "not found" would steer the caller into a
//! destructive recreate.

use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use restack_runner::CommandRunner;

use crate::layout::StateLayout;

/// Reconciled existence signal for one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackExistence {
    Found,
    NotFound,
    /// Probes disagreed (some inconclusive, none positive).
    Ambiguous,
}

impl StackExistence {
    /// Presence bias for creation decisions: only a positive signal counts,
    /// so an ambiguous stack is (re)created rather than silently skipped.
    pub fn exists_for_create(&self) -> bool {
        matches!(self, Self::Found)
    }

    /// Presence bias for destructive decisions: ambiguity is treated as
    /// presence to avoid declaring a live stack nonexistent.
    pub fn exists_for_destroy(&self) -> bool {
        matches!(self, Self::Found | Self::Ambiguous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    Found,
    NotFound,
    Inconclusive,
}

/// Resolve whether `stack` exists, combining up to three probes.
///
/// Probe order: direct state-file presence, then the engine's stack listing,
/// then (for destructive operations only) a deep scan of the stacks
/// directory. Any positive probe decides Found; unanimous negatives decide
/// NotFound; a mix of negative and inconclusive yields Ambiguous.
pub async fn resolve(
    runner: &dyn CommandRunner,
    layout: &StateLayout,
    work_dir: &Path,
    stack: &str,
    destructive: bool,
) -> StackExistence {
    let mut outcomes = vec![probe_state_file(layout, stack)];

    if outcomes.last() != Some(&ProbeOutcome::Found) {
        outcomes.push(probe_listing(runner, work_dir, stack).await);
    }

    if destructive && !outcomes.contains(&ProbeOutcome::Found) {
        outcomes.push(probe_deep_scan(layout, stack));
    }

    let signal = if outcomes.contains(&ProbeOutcome::Found) {
        StackExistence::Found
    } else if outcomes.contains(&ProbeOutcome::Inconclusive) {
        StackExistence::Ambiguous
    } else {
        StackExistence::NotFound
    };

    if signal == StackExistence::Ambiguous {
        info!(
            "Existence probes disagree for stack '{}': {:?}",
            stack, outcomes
        );
    } else {
        debug!("Stack '{}' existence: {:?} ({:?})", stack, signal, outcomes);
    }

    signal
}

/// Direct check for persisted state under the stacks directory.
fn probe_state_file(layout: &StateLayout, stack: &str) -> ProbeOutcome {
    let stacks_dir = layout.stacks_dir();
    if !stacks_dir.exists() {
        return ProbeOutcome::NotFound;
    }

    if stacks_dir.join(stack).exists() {
        return ProbeOutcome::Found;
    }

    let entries = match stacks_dir.read_dir() {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read stacks directory {:?}: {}", stacks_dir, e);
            return ProbeOutcome::Inconclusive;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.contains(stack) {
            continue;
        }
        let path = entry.path();
        if path.is_file() && name.contains("stack.json") {
            return ProbeOutcome::Found;
        }
        if path.is_dir() && path.join("stack.json").exists() {
            return ProbeOutcome::Found;
        }
    }

    ProbeOutcome::NotFound
}

/// Scan the engine's stack listing for the stack token.
async fn probe_listing(runner: &dyn CommandRunner, work_dir: &Path, stack: &str) -> ProbeOutcome {
    let output = match runner.run(work_dir, &["stack", "ls"]).await {
        Ok(output) => output,
        Err(e) => {
            debug!("Stack listing could not run: {}", e);
            return ProbeOutcome::Inconclusive;
        }
    };

    if !output.success() {
        debug!("Stack listing failed: {}", output.stderr.trim());
        return ProbeOutcome::Inconclusive;
    }

    for line in output.stdout.lines() {
        // The active stack carries a trailing '*' marker in listings.
        let first_token = line.split_whitespace().next().map(|t| t.trim_end_matches('*'));
        if first_token == Some(stack) {
            return ProbeOutcome::Found;
        }
        if line.contains(stack) {
            debug!(
                "Stack '{}' matched listing line only as a substring: {}",
                stack,
                line.trim()
            );
            return ProbeOutcome::Found;
        }
    }

    ProbeOutcome::NotFound
}

/// Deep scan of the stacks tree for any path mentioning the stack.
fn probe_deep_scan(layout: &StateLayout, stack: &str) -> ProbeOutcome {
    let stacks_dir = layout.stacks_dir();
    if !stacks_dir.exists() {
        return ProbeOutcome::NotFound;
    }

    let mut inconclusive = false;
    for entry in WalkDir::new(&stacks_dir) {
        match entry {
            Ok(entry) => {
                // Match within the stacks tree only, not the root's own path.
                let relative = entry.path().strip_prefix(&stacks_dir).unwrap_or(entry.path());
                if relative.to_string_lossy().contains(stack) {
                    return ProbeOutcome::Found;
                }
            }
            Err(e) => {
                warn!("Deep scan error under {:?}: {}", stacks_dir, e);
                inconclusive = true;
            }
        }
    }

    if inconclusive {
        ProbeOutcome::Inconclusive
    } else {
        ProbeOutcome::NotFound
    }
}
