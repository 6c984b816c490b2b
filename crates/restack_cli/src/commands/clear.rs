//! Clear command - remove stale coordination locks.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use restack_core::{clear_all_locks, clear_locks, StateLayout};

use crate::workspace;

#[derive(Args)]
pub struct ClearArgs {
    /// Stack whose locks should be cleared; omit to clear all locks
    #[arg(short, long)]
    pub stack: Option<String>,

    /// Project working directory
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,
}

pub async fn execute(args: ClearArgs, _verbose: bool) -> Result<()> {
    let state_root = workspace::state_root(&args.work_dir);
    let layout = StateLayout::new(&state_root);

    match &args.stack {
        Some(stack) => {
            let removed = clear_locks(&layout, stack);
            if removed > 0 {
                let noun = if removed == 1 { "entry" } else { "entries" };
                println!("✅ Removed {} lock {} for stack '{}'", removed, noun, stack);
            } else {
                println!("No lock entries found for stack '{}'", stack);
            }
            println!("Lock directory: {:?}", layout.stack_locks_dir(stack));
        }
        None => {
            if clear_all_locks(&layout) {
                println!("✅ Removed the locks directory");
            } else {
                println!("No locks directory found");
            }
            println!("Locks directory: {:?}", layout.locks_dir());
        }
    }

    Ok(())
}
