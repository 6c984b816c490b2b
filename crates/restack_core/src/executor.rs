//! Operation executor and escalation ladder.
//!
//! The top-level state machine: `Init → SessionEstablished → StackResolved →
//! PrimaryAttempt → {Success, Escalations…, Exhausted}`. Each failure is
//! classified at the subprocess boundary; the ladder itself only ever sees a
//! three-way outcome (success, retryable-with-class, fatal-with-class) and
//! walks a fixed, bounded sequence of remedial steps.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use restack_runner::CommandRunner;

use crate::confirm::Confirmation;
use crate::diagnose::{classify, Diagnosis, ErrorClass};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::extract::extract_failing_resources;
use crate::layout::StateLayout;
use crate::locks::{clear_locks, wait_for_locks};
use crate::repair::repair;
use crate::resolve::resolve;
use crate::session::login;

/// Requested operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Refresh,
    Preview,
    Update,
    Destroy,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Preview => "preview",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Destroy)
    }
}

/// One operation request. Created once per invocation; immutable.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub action: Action,
    pub stack: String,
    pub work_dir: PathBuf,
    pub verbose: bool,
}

impl OperationRequest {
    pub fn new(action: Action, stack: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            action,
            stack: stack.into(),
            work_dir: work_dir.into(),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Terminal outcome of a completed operation.
///
/// Failures terminate through [`OrchestratorError`] instead; cancellation is
/// an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// The desired state already holds (success-equivalent conflict).
    NoChangesNeeded,
    /// The operator declined a confirmation gate.
    Cancelled,
    /// Destroy exhausted its ladder and the operator chose forced metadata
    /// removal; remote resources may remain.
    MetadataRemoved,
}

/// How to deal with coordination locks before privileged operations.
#[derive(Debug, Clone, Copy)]
pub enum LockPolicy {
    /// Clear stale locks unconditionally (historical behavior; defeats
    /// mutual exclusion when another invocation is live).
    ClearImmediately,
    /// Wait up to the given duration for the holder, then clear whatever
    /// remains.
    WaitThenClear(Duration),
}

/// Upper bound on remedial steps attempted after a primary failure.
const MAX_ESCALATION_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscalationStep {
    /// Replace each failing resource in extraction order, stopping at the
    /// first success.
    TargetedReplace,
    /// One refresh-only pass followed by a single retry of the primary.
    RefreshOnlyThenRetry,
}

fn escalation_steps(class: ErrorClass) -> &'static [EscalationStep] {
    match class {
        ErrorClass::RemoteNotFound => {
            &[EscalationStep::TargetedReplace, EscalationStep::RefreshOnlyThenRetry]
        }
        _ => &[EscalationStep::RefreshOnlyThenRetry],
    }
}

/// The resilient operation orchestrator.
pub struct Executor<'a> {
    runner: &'a dyn CommandRunner,
    layout: StateLayout,
    confirm: &'a dyn Confirmation,
    lock_policy: LockPolicy,
}

impl<'a> Executor<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        layout: StateLayout,
        confirm: &'a dyn Confirmation,
    ) -> Self {
        Self {
            runner,
            layout,
            confirm,
            lock_policy: LockPolicy::ClearImmediately,
        }
    }

    pub fn lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// Drive one request to a terminal outcome.
    pub async fn execute(&self, request: &OperationRequest) -> OrchestratorResult<Outcome> {
        let stack = request.stack.as_str();
        let work_dir = request.work_dir.as_path();

        // Init → SessionEstablished. Without a session nothing below can
        // run, so a total login failure is fatal with no escalation.
        if !login(self.runner, work_dir).await? {
            return Err(OrchestratorError::SessionFailed);
        }

        // SessionEstablished → StackResolved.
        let existence = resolve(
            self.runner,
            &self.layout,
            work_dir,
            stack,
            request.action.is_destructive(),
        )
        .await;

        if request.action.is_destructive() {
            if !existence.exists_for_destroy() {
                return Err(OrchestratorError::StackNotFound(stack.to_string()));
            }
        } else if !existence.exists_for_create() {
            self.create_stack(work_dir, stack).await?;
        }

        let select = self.runner.run(work_dir, &["stack", "select", stack]).await?;
        if !select.success() {
            // Every later command targets the stack explicitly.
            warn!("Could not select stack '{}': {}", stack, select.stderr.trim());
        }

        // StackResolved → PrimaryAttempt.
        self.clear_stack_locks(stack);

        match request.action {
            Action::Refresh => {
                let primary = ["refresh", "--yes", "--stack", stack, "--skip-preview"];
                self.run_primary(request, &primary).await
            }
            Action::Preview => {
                let primary = ["preview", "--stack", stack];
                self.run_primary(request, &primary).await
            }
            Action::Update => self.run_update(request).await,
            Action::Destroy => self.run_destroy(request).await,
        }
    }

    async fn create_stack(&self, work_dir: &Path, stack: &str) -> OrchestratorResult<()> {
        info!("Stack '{}' not found. Creating it", stack);
        let init = self
            .runner
            .run(work_dir, &["stack", "init", stack, "--non-interactive"])
            .await?;

        if init.success() {
            info!("Created stack '{}'", stack);
            Ok(())
        } else if init.combined().contains("already exists") {
            info!("Stack '{}' already exists, selecting it", stack);
            Ok(())
        } else {
            Err(OrchestratorError::Provider {
                class: ErrorClass::Unclassified,
                message: format!(
                    "could not create stack '{}': {}",
                    stack,
                    init.stderr.trim()
                ),
            })
        }
    }

    fn clear_stack_locks(&self, stack: &str) {
        if let LockPolicy::WaitThenClear(timeout) = self.lock_policy {
            wait_for_locks(&self.layout, stack, timeout);
        }
        clear_locks(&self.layout, stack);
    }

    /// Run a primary command and resolve its outcome through the ladder.
    async fn run_primary(
        &self,
        request: &OperationRequest,
        primary: &[&str],
    ) -> OrchestratorResult<Outcome> {
        let output = self.runner.run(&request.work_dir, primary).await?;
        let text = output.combined();
        let diagnosis = classify(&text);

        if diagnosis.class.is_success_equivalent() {
            self.report_simplified(&diagnosis);
            return Ok(Outcome::NoChangesNeeded);
        }
        if output.success() {
            return Ok(Outcome::Succeeded);
        }

        if request.verbose {
            info!("Raw diagnostics:\n{}", text);
        }
        self.escalate(request, primary, diagnosis, text).await
    }

    async fn run_update(&self, request: &OperationRequest) -> OrchestratorResult<Outcome> {
        let stack = request.stack.as_str();
        let work_dir = request.work_dir.as_path();

        // Refresh phase: sync recorded state with the provider first.
        info!("Refreshing state for stack '{}'", stack);
        let refresh = self
            .runner
            .run(
                work_dir,
                &["refresh", "--yes", "--stack", stack, "--skip-preview"],
            )
            .await?;
        let refresh_text = refresh.combined();
        let refresh_diagnosis = classify(&refresh_text);

        if refresh_diagnosis.class.is_success_equivalent() {
            self.report_simplified(&refresh_diagnosis);
            return Ok(Outcome::NoChangesNeeded);
        }

        if !refresh.success() {
            debug!("Refresh completed with errors:\n{}", refresh_text);
            if refresh_diagnosis.class == ErrorClass::RemoteNotFound {
                // Drift detected before the update even starts; surgically
                // drop the missing records so the update can plan cleanly.
                let failing = extract_failing_resources(&refresh_text);
                match repair(self.runner, work_dir, stack, &failing).await {
                    Ok(true) => info!("Recorded state repaired before update"),
                    Ok(false) => debug!("No state repair applied"),
                    Err(e) => warn!("State repair failed: {}", e),
                }
            }
        }

        // The refresh may have taken a while; clear again before mutating.
        self.clear_stack_locks(stack);

        info!("Deploying stack '{}'", stack);
        let primary = ["up", "--yes", "--stack", stack, "--skip-preview"];
        self.run_primary(request, &primary).await
    }

    async fn run_destroy(&self, request: &OperationRequest) -> OrchestratorResult<Outcome> {
        let stack = request.stack.as_str();
        let work_dir = request.work_dir.as_path();

        // Best-effort refresh so the destroy plans against current reality.
        info!("Refreshing state before destroy");
        let refresh = self
            .runner
            .run(
                work_dir,
                &["refresh", "--yes", "--stack", stack, "--skip-preview"],
            )
            .await?;
        if !refresh.success() {
            debug!("Refresh before destroy reported errors; continuing");
        }

        if !self.confirm.confirm(&format!(
            "WARNING: this will destroy all resources in stack '{}'. Continue?",
            stack
        )) {
            info!("Destroy cancelled by operator");
            return Ok(Outcome::Cancelled);
        }

        let primary = ["destroy", "--yes", "--stack", stack, "--skip-preview"];
        let output = self.runner.run(work_dir, &primary).await?;
        let text = output.combined();
        let diagnosis = classify(&text);

        let destroyed = if output.success() {
            true
        } else {
            if diagnosis.class.is_fatal() {
                return Err(self.fatal(diagnosis, text));
            }
            match self.escalate(request, &primary, diagnosis, text).await {
                Ok(Outcome::Succeeded) => true,
                Ok(other) => return Ok(other),
                Err(OrchestratorError::Exhausted { .. }) => false,
                Err(e) => return Err(e),
            }
        };

        if destroyed {
            info!("Stack '{}' successfully destroyed", stack);
            self.offer_metadata_removal(work_dir, stack).await
        } else {
            self.offer_force_removal(work_dir, stack).await
        }
    }

    /// After a clean destroy, optionally drop the stack's bookkeeping too.
    async fn offer_metadata_removal(
        &self,
        work_dir: &Path,
        stack: &str,
    ) -> OrchestratorResult<Outcome> {
        if !self.confirm.confirm(&format!(
            "Remove stack metadata for '{}'? This removes the stack from the backend entirely.",
            stack
        )) {
            info!("Stack metadata preserved; the stack can be reused");
            return Ok(Outcome::Succeeded);
        }

        let removal = self
            .runner
            .run(work_dir, &["stack", "rm", "--yes", stack])
            .await?;
        if removal.success() {
            info!("Stack metadata removed; cleanup complete");
        } else {
            warn!(
                "Could not remove stack metadata: {}",
                removal.stderr.trim()
            );
        }
        Ok(Outcome::Succeeded)
    }

    /// Destroy exhausted every rung: offer removal of the bookkeeping alone.
    async fn offer_force_removal(
        &self,
        work_dir: &Path,
        stack: &str,
    ) -> OrchestratorResult<Outcome> {
        warn!("Destroy failed after all remedial steps");
        if !self.confirm.confirm(&format!(
            "Force-remove stack '{}' metadata? Remote resources will NOT be destroyed.",
            stack
        )) {
            info!("Force-removal declined; stack left in place");
            return Ok(Outcome::Cancelled);
        }

        let removal = self
            .runner
            .run(work_dir, &["stack", "rm", "--yes", "--force", stack])
            .await?;
        if removal.success() {
            warn!(
                "Stack '{}' metadata forcefully removed; remote resources may remain",
                stack
            );
            Ok(Outcome::MetadataRemoved)
        } else {
            Err(OrchestratorError::Exhausted {
                action: Action::Destroy.name().to_string(),
            })
        }
    }

    /// Walk the remedial ladder for a failed primary command.
    async fn escalate(
        &self,
        request: &OperationRequest,
        primary: &[&str],
        diagnosis: Diagnosis,
        text: String,
    ) -> OrchestratorResult<Outcome> {
        if diagnosis.class.is_fatal() {
            return Err(self.fatal(diagnosis, text));
        }
        if diagnosis.class.is_success_equivalent() {
            self.report_simplified(&diagnosis);
            return Ok(Outcome::NoChangesNeeded);
        }

        self.report_simplified(&diagnosis);

        let stack = request.stack.as_str();
        let work_dir = request.work_dir.as_path();
        let steps = escalation_steps(diagnosis.class);
        debug_assert!(steps.len() <= MAX_ESCALATION_DEPTH);

        for step in steps {
            match step {
                EscalationStep::TargetedReplace => {
                    let failing = extract_failing_resources(&text);
                    if failing.is_empty() {
                        debug!("No failing resources identified; skipping replacement");
                        continue;
                    }
                    info!(
                        "Attempting targeted replacement of {} resource(s)",
                        failing.len()
                    );
                    for reference in &failing {
                        let replace = self
                            .runner
                            .run(
                                work_dir,
                                &["up", "--yes", "--stack", stack, "--replace", reference.as_str()],
                            )
                            .await?;
                        if replace.success() {
                            info!("Successfully replaced '{}'", reference);
                            return Ok(Outcome::Succeeded);
                        }
                        debug!("Replacement of '{}' failed", reference);
                    }
                    info!("Resource replacement did not succeed; escalating");
                }
                EscalationStep::RefreshOnlyThenRetry => {
                    info!("Running refresh-only pass before retrying");
                    let refresh_only = self
                        .runner
                        .run(
                            work_dir,
                            &["up", "--yes", "--stack", stack, "--refresh-only"],
                        )
                        .await?;
                    if !refresh_only.success() {
                        debug!("Refresh-only pass failed");
                        continue;
                    }

                    let retry = self.runner.run(work_dir, primary).await?;
                    let retry_text = retry.combined();
                    let retry_diagnosis = classify(&retry_text);
                    if retry_diagnosis.class.is_success_equivalent() {
                        self.report_simplified(&retry_diagnosis);
                        return Ok(Outcome::NoChangesNeeded);
                    }
                    if retry.success() {
                        info!("Retry after refresh-only pass succeeded");
                        return Ok(Outcome::Succeeded);
                    }
                    if retry_diagnosis.class.is_fatal() {
                        return Err(self.fatal(retry_diagnosis, retry_text));
                    }
                    debug!("Retry failed:\n{}", retry_text);
                }
            }
        }

        Err(OrchestratorError::Exhausted {
            action: request.action.name().to_string(),
        })
    }

    fn fatal(&self, diagnosis: Diagnosis, text: String) -> OrchestratorError {
        OrchestratorError::Provider {
            class: diagnosis.class,
            message: diagnosis.simplified.unwrap_or(text),
        }
    }

    fn report_simplified(&self, diagnosis: &Diagnosis) {
        if let Some(message) = &diagnosis.simplified {
            info!("{}", message);
        }
    }
}
