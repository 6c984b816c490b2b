//! restack CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success (including clean cancellation)
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Backend session failure
//! - 4: Fatal provider error
//! - 5: Remedial ladder exhausted

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod workspace;

use commands::{Cli, Commands};
use restack_core::OrchestratorError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const SESSION_FAILURE: u8 = 3;
    pub const PROVIDER_ERROR: u8 = 4;
    pub const EXHAUSTED: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; --verbose widens the default filter, --quiet
    // narrows it to warnings.
    let level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let default_filter = format!(
        "warn,restack_cli={level},restack_core={level},restack_runner={level},restack_templates={level}"
    );
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let verbose = cli.verbose;
    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::execute(args, verbose).await,
        Commands::Preview(args) => commands::preview::execute(args, verbose).await,
        Commands::Refresh(args) => commands::refresh::execute(args, verbose).await,
        Commands::Destroy(args) => commands::destroy::execute(args, verbose).await,
        Commands::Clear(args) => commands::clear::execute(args, verbose).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<OrchestratorError>() {
        Some(OrchestratorError::SessionFailed) => ExitCodes::SESSION_FAILURE,
        Some(OrchestratorError::Provider { .. }) => ExitCodes::PROVIDER_ERROR,
        Some(OrchestratorError::StackNotFound(_)) => ExitCodes::PROVIDER_ERROR,
        Some(OrchestratorError::Exhausted { .. }) => ExitCodes::EXHAUSTED,
        Some(_) => ExitCodes::GENERAL_ERROR,
        None => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("argument") || msg.contains("option") {
                ExitCodes::INVALID_ARGS
            } else {
                ExitCodes::GENERAL_ERROR
            }
        }
    }
}
