//! Backend session establishment.
//!
//! The engine's file-backed login target is spelled differently across
//! releases; the strategies below cover the known variants in decreasing
//! order of specificity, ending with the bare local flag.

use std::path::Path;

use tracing::{debug, info};

use restack_runner::CommandRunner;

use crate::error::OrchestratorResult;

/// Ordered login strategies. The first one that exits cleanly wins.
const LOGIN_STRATEGIES: &[&[&str]] = &[
    &["login", "file://~", "--local"],
    &["login", "file://", "--local"],
    &["login", "file://~"],
    &["login", "file://"],
    &["login", "--local"],
];

/// Establish a backend session in `work_dir`.
///
/// Returns false only if every strategy fails; no partial state is left
/// behind by a failed attempt. Spawn-level failures count as a failed
/// strategy rather than aborting the sequence.
pub async fn login(runner: &dyn CommandRunner, work_dir: &Path) -> OrchestratorResult<bool> {
    for strategy in LOGIN_STRATEGIES {
        debug!("Attempting backend login: {}", strategy.join(" "));
        match runner.run(work_dir, strategy).await {
            Ok(output) if output.success() => {
                info!("Backend login succeeded with: {}", strategy.join(" "));
                return Ok(true);
            }
            Ok(output) => {
                debug!(
                    "Login attempt failed (exit {}): {}",
                    output.exit_code,
                    output.stderr.trim()
                );
            }
            Err(e) => {
                debug!("Login attempt could not run: {}", e);
            }
        }
    }

    Ok(false)
}
