//! Integration tests for the operation executor and escalation ladder.

use std::fs;

use restack_core::{
    Action, AutoConfirmer, ErrorClass, Executor, OperationRequest, OrchestratorError, Outcome,
    ScriptedConfirmer, StateLayout,
};
use restack_runner::{MockResponse, MockRunner};
use tempfile::{tempdir, TempDir};

const STACK: &str = "dev";

const CONFLICT_TEXT: &str =
    "error: googleapi: Error 409: You already own this bucket, conflict\nalready own it";

const NOT_FOUND_TEXT: &str = "error: googleapi: Error 404: resource not found\n\
     urn:prov:proj::env::kind::my-bucket not found while refreshing";

const FORBIDDEN_TEXT: &str = "error: googleapi: Error 403: Forbidden, caller lacks permission";

fn setup() -> (TempDir, StateLayout) {
    let root = tempdir().unwrap();
    let layout = StateLayout::new(root.path());
    (root, layout)
}

fn seed_stack_state(layout: &StateLayout, stack: &str) {
    let dir = layout.stacks_dir().join(stack);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("stack.json"), "{}").unwrap();
}

fn request(action: Action, root: &TempDir) -> OperationRequest {
    OperationRequest::new(action, STACK, root.path())
}

#[tokio::test]
async fn conflict_is_terminal_success_despite_exit_status() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new().on(
        "up --yes --stack dev --skip-preview",
        MockResponse::failure(1, CONFLICT_TEXT),
    );
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Update, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::NoChangesNeeded);
    assert!(!runner.was_invoked("--replace"));
    assert!(!runner.was_invoked("--refresh-only"));
}

#[tokio::test]
async fn targeted_replace_runs_before_refresh_only_and_stops_at_first_success() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new()
        .on(
            "up --yes --stack dev --skip-preview",
            MockResponse::failure(1, NOT_FOUND_TEXT),
        )
        .on("--replace", MockResponse::success("replaced"));
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Update, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::Succeeded);

    let replaces = runner.invocations_matching("--replace");
    assert_eq!(replaces.len(), 1, "exactly one targeted replace");
    assert!(replaces[0]
        .command_line()
        .contains("urn:prov:proj::env::kind::my-bucket"));
    assert!(
        !runner.was_invoked("--refresh-only"),
        "first successful rung halts the ladder"
    );
}

#[tokio::test]
async fn failed_replace_falls_back_to_refresh_only_then_retry() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new()
        .on(
            "up --yes --stack dev --skip-preview",
            MockResponse::failure(1, NOT_FOUND_TEXT),
        )
        .on(
            "up --yes --stack dev --skip-preview",
            MockResponse::success("updated on retry"),
        )
        .on("--replace", MockResponse::failure(1, "replace failed"))
        .on("--refresh-only", MockResponse::success("refreshed"));
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Update, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::Succeeded);

    let calls = runner.calls();
    let replace_index = calls
        .iter()
        .position(|c| c.command_line().contains("--replace"))
        .expect("replace attempted");
    let refresh_only_index = calls
        .iter()
        .position(|c| c.command_line().contains("--refresh-only"))
        .expect("refresh-only attempted");
    assert!(
        replace_index < refresh_only_index,
        "targeted replace must run before the refresh-only fallback"
    );
    assert_eq!(
        runner.invocations_matching("--skip-preview").len(),
        3,
        "refresh phase, primary, and one retry"
    );
}

#[tokio::test]
async fn ladder_exhausts_after_failed_retry() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new()
        .on(
            "up --yes --stack dev --skip-preview",
            MockResponse::failure(1, "error: something broke"),
        )
        .on("--refresh-only", MockResponse::success("refreshed"));
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let result = executor.execute(&request(Action::Update, &root)).await;

    match result {
        Err(OrchestratorError::Exhausted { action }) => assert_eq!(action, "update"),
        other => panic!("expected Exhausted, got {:?}", other),
    }
    assert!(
        !runner.was_invoked("--replace"),
        "generic failures have no targeted-replace rung"
    );
    assert_eq!(
        runner.invocations_matching("up --yes --stack dev --skip-preview").len(),
        2,
        "primary plus exactly one retry"
    );
}

#[tokio::test]
async fn permission_denied_is_never_escalated() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new().on(
        "up --yes --stack dev --skip-preview",
        MockResponse::failure(1, FORBIDDEN_TEXT),
    );
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let result = executor.execute(&request(Action::Update, &root)).await;

    match result {
        Err(OrchestratorError::Provider { class, message }) => {
            assert_eq!(class, ErrorClass::PermissionDenied);
            assert!(message.contains("sufficient permissions"));
        }
        other => panic!("expected Provider error, got {:?}", other),
    }
    assert!(!runner.was_invoked("--replace"));
    assert!(!runner.was_invoked("--refresh-only"));
}

#[tokio::test]
async fn destroying_a_nonexistent_stack_is_fatal_without_a_destroy_subprocess() {
    let (root, layout) = setup();

    let runner = MockRunner::new().on(
        "stack ls",
        MockResponse::success("NAME          LAST UPDATE\nother-stack   2 hours ago\n"),
    );
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let result = executor.execute(&request(Action::Destroy, &root)).await;

    match result {
        Err(OrchestratorError::StackNotFound(stack)) => assert_eq!(stack, STACK),
        other => panic!("expected StackNotFound, got {:?}", other),
    }
    assert!(!runner.was_invoked("destroy"));
}

#[tokio::test]
async fn declining_the_destroy_confirmation_cancels_cleanly() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new();
    let confirm = ScriptedConfirmer::new([false]);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Destroy, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(!runner.was_invoked("destroy"));
    assert_eq!(confirm.prompts().len(), 1);
}

#[tokio::test]
async fn destroy_success_offers_ordinary_metadata_removal() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new();
    let confirm = ScriptedConfirmer::new([true, true]);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Destroy, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::Succeeded);
    let removals = runner.invocations_matching("stack rm");
    assert_eq!(removals.len(), 1);
    assert!(!removals[0].command_line().contains("--force"));
}

#[tokio::test]
async fn exhausted_destroy_gates_forced_metadata_removal() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new()
        .on("destroy", MockResponse::failure(1, "error: cannot delete"))
        .on("--refresh-only", MockResponse::failure(1, "still broken"));
    let confirm = ScriptedConfirmer::new([true, true]);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Destroy, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::MetadataRemoved);
    assert!(runner.was_invoked("stack rm --yes --force"));
}

#[tokio::test]
async fn declining_forced_removal_is_a_cancellation_not_a_failure() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let runner = MockRunner::new()
        .on("destroy", MockResponse::failure(1, "error: cannot delete"))
        .on("--refresh-only", MockResponse::failure(1, "still broken"));
    let confirm = ScriptedConfirmer::new([true, false]);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Destroy, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(!runner.was_invoked("--force"));
}

#[tokio::test]
async fn total_login_failure_is_fatal_before_anything_else_runs() {
    let (root, layout) = setup();

    let runner = MockRunner::new().on("login", MockResponse::failure(255, "no backend"));
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let result = executor.execute(&request(Action::Update, &root)).await;

    assert!(matches!(result, Err(OrchestratorError::SessionFailed)));
    assert_eq!(runner.call_count(), 5, "only the login strategies ran");
}

#[tokio::test]
async fn update_creates_the_stack_when_no_probe_finds_it() {
    let (root, layout) = setup();

    let runner = MockRunner::new().on(
        "stack ls",
        MockResponse::success("NAME          LAST UPDATE\nother-stack   2 hours ago\n"),
    );
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Update, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::Succeeded);
    let inits = runner.invocations_matching("stack init");
    assert_eq!(inits.len(), 1);
    assert!(inits[0].command_line().contains("--non-interactive"));
}

#[tokio::test]
async fn drift_during_refresh_phase_triggers_state_surgery() {
    let (root, layout) = setup();
    seed_stack_state(&layout, STACK);

    let snapshot = serde_json::json!({
        "version": 3,
        "resources": [
            {"urn": "urn:prov:proj::env::kind::my-bucket", "id": "b1"},
            {"urn": "urn:prov:proj::env::kind::survivor", "id": "s1"}
        ]
    })
    .to_string();

    let runner = MockRunner::new()
        .on("refresh --yes", MockResponse::failure(1, NOT_FOUND_TEXT))
        .on("stack export", MockResponse::success(snapshot))
        .on("stack import", MockResponse::success("import successful"));
    let confirm = AutoConfirmer::new(true);
    let executor = Executor::new(&runner, layout, &confirm);

    let outcome = executor.execute(&request(Action::Update, &root)).await.unwrap();

    assert_eq!(outcome, Outcome::Succeeded);
    assert!(runner.was_invoked("stack export"));
    assert!(runner.was_invoked("stack import"));
}
