//! Preview command - show the changes an update would apply.

use anyhow::Result;
use tracing::info;

use restack_core::Action;

use super::{report_outcome, run_operation, OperationArgs};

pub async fn execute(args: OperationArgs, verbose: bool) -> Result<()> {
    info!("Previewing changes for stack '{}'", args.stack);

    let outcome = run_operation(Action::Preview, &args, verbose).await?;
    report_outcome(Action::Preview, &args.stack, outcome);

    Ok(())
}
