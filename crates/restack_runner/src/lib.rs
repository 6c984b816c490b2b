//! # restack_runner
//!
//! Subprocess execution wrapper for the infrastructure-provisioning engine.
//!
//! This crate provides the single boundary through which restack talks to the
//! external engine (a `pulumi`-compatible CLI). The orchestrator core never
//! spawns processes itself; it drives the [`CommandRunner`] trait, which keeps
//! the escalation logic testable against scripted outputs.
//!
//! # Features
//!
//! - **CLI Runner**: spawns the engine binary, captures combined diagnostics
//! - **Environment Overlay**: per-invocation environment ([`EngineEnv`]),
//!   never mutates the process-wide environment
//! - **Dry-Run Mode**: log commands without executing
//! - **Mock Runner**: scripted responses and captured-call verification
//!
//! # Example
//!
//! ```rust,no_run
//! use restack_runner::{CliRunner, CliRunnerOptions, CommandRunner, EngineEnv};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let env = EngineEnv::new("/tmp/build/.state");
//!     let runner = CliRunner::new(CliRunnerOptions::default(), env);
//!
//!     let output = runner.run(Path::new("/tmp/build"), &["stack", "ls"]).await?;
//!     println!("exit code: {}", output.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mock;
pub mod runner;

pub use cli::{CliRunner, CliRunnerOptions};
pub use config::EngineEnv;
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{CommandOutput, CommandRunner};
