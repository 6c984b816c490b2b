//! Deploy command - refresh, repair drift, then update a stack.

use anyhow::Result;
use tracing::info;

use restack_core::Action;

use super::{report_outcome, run_operation, OperationArgs};

pub async fn execute(args: OperationArgs, verbose: bool) -> Result<()> {
    info!("Deploying stack '{}'", args.stack);

    let outcome = run_operation(Action::Update, &args, verbose).await?;
    report_outcome(Action::Update, &args.stack, outcome);

    Ok(())
}
