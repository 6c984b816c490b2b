//! # restack_core
//!
//! The resilient operation orchestrator: sequences a provisioning or
//! destruction request through a bounded ladder of remedial actions (lock
//! clearing, backend re-login, state refresh, targeted state surgery,
//! retries), classifying each failure from the engine's diagnostic text.
//!
//! ## Components
//!
//! - [`diagnose`]: ordered rule table mapping diagnostics to an error class
//! - [`extract`]: failing-resource reference extraction from diagnostics
//! - [`locks`]: stale coordination-lock clearing, scoped per stack
//! - [`session`]: ordered backend-login strategies
//! - [`resolve`]: stack existence reconciliation across independent probes
//! - [`repair`]: export, filter, re-import state surgery
//! - [`executor`]: the escalation-ladder state machine tying it together
//!
//! The orchestrator is strictly sequential: one request runs to a terminal
//! outcome before the process exits, and every engine call blocks.

pub mod confirm;
pub mod diagnose;
pub mod error;
pub mod executor;
pub mod extract;
pub mod layout;
pub mod locks;
pub mod repair;
pub mod resolve;
pub mod session;

pub use confirm::{AutoConfirmer, Confirmation, ScriptedConfirmer, StdinConfirmer};
pub use diagnose::{classify, Diagnosis, ErrorClass};
pub use error::{OrchestratorError, OrchestratorResult};
pub use executor::{Action, Executor, LockPolicy, OperationRequest, Outcome};
pub use extract::extract_failing_resources;
pub use layout::StateLayout;
pub use locks::{clear_all_locks, clear_locks, wait_for_locks};
pub use repair::{repair, ResourceRecord, StateSnapshot};
pub use resolve::{resolve, StackExistence};
pub use session::login;
