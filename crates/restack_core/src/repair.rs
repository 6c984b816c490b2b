//! State surgery for drift-induced failures.
//!
//! When the provider reports a recorded resource as missing remotely, the
//! recorded state is exported, the implicated records are removed, and the
//! filtered state is re-imported. The engine's own consistency model stays
//! authoritative; this is best-effort repair, not reconciliation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use restack_runner::CommandRunner;

use crate::error::OrchestratorResult;

/// One recorded resource inside a state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub urn: String,
    #[serde(default)]
    pub id: String,
    /// Remaining record fields, preserved byte-for-byte across the
    /// export/import round trip.
    #[serde(flatten)]
    pub properties: serde_json::Map<String, Value>,
}

/// Exported stack state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// Drop every record whose urn contains any failing reference.
/// Returns the number of records removed.
pub fn filter_resources(snapshot: &mut StateSnapshot, failing: &[String]) -> usize {
    let original = snapshot.resources.len();
    snapshot
        .resources
        .retain(|record| !failing.iter().any(|f| record.urn.contains(f)));
    original - snapshot.resources.len()
}

/// Export, filter, and re-import the stack's recorded state.
///
/// Returns true only if filtering removed at least one record and the
/// re-import succeeded. A failed or empty export, an unparseable snapshot,
/// or a filter that matches nothing all return false without touching the
/// recorded state. The temporary snapshot file is removed on every exit
/// path.
pub async fn repair(
    runner: &dyn CommandRunner,
    work_dir: &std::path::Path,
    stack: &str,
    failing: &[String],
) -> OrchestratorResult<bool> {
    if failing.is_empty() {
        return Ok(false);
    }

    info!("Attempting state repair for stack '{}'", stack);

    let export = runner
        .run(work_dir, &["stack", "export", "--stack", stack])
        .await?;
    if !export.success() || export.stdout.trim().is_empty() {
        warn!("State export yielded nothing to repair");
        return Ok(false);
    }

    let mut snapshot: StateSnapshot = match serde_json::from_str(&export.stdout) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Could not parse exported state: {}", e);
            return Ok(false);
        }
    };

    if snapshot.resources.is_empty() {
        debug!("No resources recorded in state");
        return Ok(false);
    }

    let removed = filter_resources(&mut snapshot, failing);
    if removed == 0 {
        debug!("No recorded resource matches the failing references");
        return Ok(false);
    }

    info!("Removing {} problematic record(s) from state", removed);

    // NamedTempFile deletes itself when dropped, covering every exit path.
    let file = NamedTempFile::new()?;
    serde_json::to_writer(file.as_file(), &snapshot)?;
    file.as_file().sync_all()?;
    let path = file.path().to_string_lossy().to_string();

    let import = runner
        .run(
            work_dir,
            &["stack", "import", "--file", path.as_str(), "--stack", stack],
        )
        .await?;

    if import.success() {
        info!("State repaired: {} record(s) removed", removed);
        Ok(true)
    } else {
        warn!("State re-import failed: {}", import.stderr.trim());
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restack_runner::{MockResponse, MockRunner};
    use std::path::Path;

    fn snapshot_json() -> String {
        serde_json::json!({
            "version": 3,
            "resources": [
                {"urn": "urn:prov:p::e::k::keep-me", "id": "1"},
                {"urn": "urn:prov:p::e::k::my-bucket", "id": "2"},
                {"urn": "urn:prov:p::e::k::also-keep", "id": "3"}
            ]
        })
        .to_string()
    }

    #[test]
    fn test_filter_removes_matching_records() {
        let mut snapshot: StateSnapshot = serde_json::from_str(&snapshot_json()).unwrap();
        let failing = vec!["my-bucket".to_string()];

        let removed = filter_resources(&mut snapshot, &failing);

        assert_eq!(removed, 1);
        assert_eq!(snapshot.resources.len(), 2);
        assert!(snapshot.resources.iter().all(|r| !r.urn.contains("my-bucket")));
    }

    #[test]
    fn test_filter_no_match_leaves_count_unchanged() {
        let mut snapshot: StateSnapshot = serde_json::from_str(&snapshot_json()).unwrap();
        let failing = vec!["never-recorded".to_string()];

        assert_eq!(filter_resources(&mut snapshot, &failing), 0);
        assert_eq!(snapshot.resources.len(), 3);
    }

    #[test]
    fn test_snapshot_preserves_unknown_fields() {
        let snapshot: StateSnapshot = serde_json::from_str(&snapshot_json()).unwrap();
        let round_trip = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(round_trip["version"], 3);
    }

    #[tokio::test]
    async fn test_repair_filters_and_reimports() {
        let runner = MockRunner::new()
            .on("stack export", MockResponse::success(snapshot_json()))
            .on("stack import", MockResponse::success("import successful"));

        let repaired = repair(
            &runner,
            Path::new("/w"),
            "dev",
            &["my-bucket".to_string()],
        )
        .await
        .unwrap();

        assert!(repaired);
        assert!(runner.was_invoked("stack export"));
        let imports = runner.invocations_matching("stack import");
        assert_eq!(imports.len(), 1);
        assert!(imports[0].command_line().contains("--file"));
    }

    #[tokio::test]
    async fn test_repair_no_match_skips_import() {
        let runner = MockRunner::new()
            .on("stack export", MockResponse::success(snapshot_json()));

        let repaired = repair(
            &runner,
            Path::new("/w"),
            "dev",
            &["never-recorded".to_string()],
        )
        .await
        .unwrap();

        assert!(!repaired);
        assert!(!runner.was_invoked("stack import"));
    }

    #[tokio::test]
    async fn test_repair_export_failure_returns_false() {
        let runner = MockRunner::new()
            .on("stack export", MockResponse::failure(1, "no stack"));

        let repaired = repair(&runner, Path::new("/w"), "dev", &["x".to_string()])
            .await
            .unwrap();

        assert!(!repaired);
        assert!(!runner.was_invoked("stack import"));
    }

    #[tokio::test]
    async fn test_repair_unparseable_state_returns_false() {
        let runner = MockRunner::new()
            .on("stack export", MockResponse::success("not json at all"));

        let repaired = repair(&runner, Path::new("/w"), "dev", &["x".to_string()])
            .await
            .unwrap();

        assert!(!repaired);
    }

    #[tokio::test]
    async fn test_repair_empty_failing_set_is_a_no_op() {
        let runner = MockRunner::new();

        let repaired = repair(&runner, Path::new("/w"), "dev", &[]).await.unwrap();

        assert!(!repaired);
        assert_eq!(runner.call_count(), 0);
    }
}
