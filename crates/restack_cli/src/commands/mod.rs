//! CLI command definitions.
//!
//! Each subcommand builds an operation request and hands it to the
//! orchestrator core; the shared plumbing (workspace preparation, runner
//! construction, confirmation gate) lives in [`run_operation`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use restack_core::{
    Action, AutoConfirmer, Confirmation, Executor, LockPolicy, OperationRequest, Outcome,
    StateLayout, StdinConfirmer,
};
use restack_runner::{CliRunner, CliRunnerOptions, EngineEnv};

use crate::workspace;

pub mod clear;
pub mod deploy;
pub mod destroy;
pub mod preview;
pub mod refresh;

/// restack - resilient stack operations for a provisioning engine
#[derive(Parser)]
#[command(name = "restack")]
#[command(version, about = "restack - resilient stack operations for a provisioning engine")]
#[command(long_about = r#"
restack drives an infrastructure-provisioning engine through create, inspect
and tear-down operations, absorbing the engine's operational fragilities:
stale locks, backend-login flakiness, and state/reality drift.

WORKFLOWS:
  deploy    → refresh state, repair drift, then update the stack
  preview   → show the changes an update would apply
  refresh   → synchronize recorded state with the provider
  destroy   → tear down a stack (confirmation-gated)
  clear     → remove stale coordination locks

EXIT CODES:
  0 - Success (including clean cancellation)
  1 - General error
  2 - Invalid arguments
  3 - Backend session failure
  4 - Fatal provider error
  5 - Remedial ladder exhausted
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a stack (refresh, repair drift, update)
    Deploy(OperationArgs),

    /// Preview the changes an update would apply
    Preview(OperationArgs),

    /// Synchronize recorded state with the provider
    Refresh(OperationArgs),

    /// Destroy a stack's resources
    Destroy(OperationArgs),

    /// Remove stale coordination locks
    Clear(clear::ClearArgs),
}

/// Arguments shared by every stack operation.
#[derive(Args)]
pub struct OperationArgs {
    /// Name of the stack to operate on
    #[arg(short, long)]
    pub stack: String,

    /// Project working directory
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Project name used when rendering the descriptor
    #[arg(short, long, default_value = "restack-project")]
    pub project: String,

    /// Environment name exposed to the descriptor
    #[arg(short, long, default_value = "dev")]
    pub environment: String,

    /// Answer yes to every confirmation (non-interactive)
    #[arg(long)]
    pub yes: bool,

    /// Engine binary to invoke
    #[arg(long, default_value = "pulumi")]
    pub engine: String,

    /// Wait up to this many seconds for lock holders before clearing
    #[arg(long, value_name = "SECONDS")]
    pub wait_locks: Option<u64>,
}

/// Shared driver for the four stack operations.
pub async fn run_operation(
    action: Action,
    args: &OperationArgs,
    verbose: bool,
) -> Result<Outcome> {
    let prepared = workspace::prepare(
        &args.work_dir,
        &args.project,
        &args.stack,
        &args.environment,
        verbose,
    )?;

    let engine_env = EngineEnv::new(&prepared.state_root);
    let runner = CliRunner::new(
        CliRunnerOptions::new().program(&args.engine),
        engine_env,
    );

    let confirm: Box<dyn Confirmation> = if args.yes {
        Box::new(AutoConfirmer::new(true))
    } else {
        Box::new(StdinConfirmer)
    };

    let layout = StateLayout::new(&prepared.state_root);
    let mut executor = Executor::new(&runner, layout, confirm.as_ref());
    if let Some(seconds) = args.wait_locks {
        executor = executor.lock_policy(LockPolicy::WaitThenClear(Duration::from_secs(seconds)));
    }

    let request =
        OperationRequest::new(action, &args.stack, &prepared.build_dir).verbose(verbose);
    let outcome = executor.execute(&request).await?;
    Ok(outcome)
}

/// Print the terminal outcome in a uniform way.
pub fn report_outcome(action: Action, stack: &str, outcome: Outcome) {
    match outcome {
        Outcome::Succeeded => {
            println!("✅ {} of stack '{}' completed", action.name(), stack);
        }
        Outcome::NoChangesNeeded => {
            println!("✅ No changes required; the desired state already holds");
        }
        Outcome::Cancelled => {
            println!("Operation cancelled");
        }
        Outcome::MetadataRemoved => {
            println!(
                "⚠️  Stack '{}' metadata removed; remote resources may remain",
                stack
            );
        }
    }
}
