//! # restack_templates
//!
//! Project-descriptor rendering for restack.
//!
//! The provisioning engine expects a YAML project descriptor in its working
//! directory. This crate renders the descriptor from a template, expanding
//! `{{name}}` and `${name}` references from a flat context record. The
//! orchestrator core treats this as an opaque file-producing step.

pub mod error;
pub mod renderer;

pub use error::{TemplateError, TemplateResult};
pub use renderer::{default_descriptor, RenderContext, TemplateRenderer, PROJECT_DESCRIPTOR};
