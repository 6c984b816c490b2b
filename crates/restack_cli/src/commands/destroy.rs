//! Destroy command - tear down a stack's resources.
//!
//! Destruction and any metadata removal are gated by explicit confirmations
//! unless `--yes` is passed; declining cancels cleanly.

use anyhow::Result;
use tracing::info;

use restack_core::Action;

use super::{report_outcome, run_operation, OperationArgs};

pub async fn execute(args: OperationArgs, verbose: bool) -> Result<()> {
    info!("Destroying stack '{}'", args.stack);

    let outcome = run_operation(Action::Destroy, &args, verbose).await?;
    report_outcome(Action::Destroy, &args.stack, outcome);

    Ok(())
}
