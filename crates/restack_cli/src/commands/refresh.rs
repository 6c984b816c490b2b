//! Refresh command - synchronize recorded state with the provider.

use anyhow::Result;
use tracing::info;

use restack_core::Action;

use super::{report_outcome, run_operation, OperationArgs};

pub async fn execute(args: OperationArgs, verbose: bool) -> Result<()> {
    info!("Refreshing state for stack '{}'", args.stack);

    let outcome = run_operation(Action::Refresh, &args, verbose).await?;
    report_outcome(Action::Refresh, &args.stack, outcome);

    Ok(())
}
