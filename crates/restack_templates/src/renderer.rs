//! Descriptor rendering and instantiation.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};

/// File name of the project descriptor the engine reads.
pub const PROJECT_DESCRIPTOR: &str = "Project.yaml";

/// Flat variable context for descriptor rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: HashMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Standard context for one operation: project, stack, environment.
    pub fn for_project(project: &str, stack: &str, environment: &str) -> Self {
        Self::new()
            .set("project", project)
            .set("stack", stack)
            .set("environment", environment)
            .set("env", environment)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }
}

/// Descriptor renderer.
///
/// Expands `{{name}}` template references and `${name}` engine-style
/// references from the context; unknown references are left untouched so the
/// engine can resolve its own runtime variables. Runs of blank lines left
/// behind by expansion are collapsed.
pub struct TemplateRenderer {
    brace_pattern: Regex,
    dollar_pattern: Regex,
    blank_pattern: Regex,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            brace_pattern: Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}")
                .expect("static pattern"),
            dollar_pattern: Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}")
                .expect("static pattern"),
            blank_pattern: Regex::new(r"\n\s*\n\s*\n+").expect("static pattern"),
        }
    }

    /// Render template text against the context.
    pub fn render_str(&self, template: &str, context: &RenderContext) -> String {
        let expand = |pattern: &Regex, input: &str| -> String {
            pattern
                .replace_all(input, |captures: &regex::Captures<'_>| {
                    match context.get(&captures[1]) {
                        Some(value) => value.to_string(),
                        None => captures[0].to_string(),
                    }
                })
                .to_string()
        };

        let rendered = expand(&self.brace_pattern, template);
        let rendered = expand(&self.dollar_pattern, &rendered);
        self.blank_pattern.replace_all(&rendered, "\n\n").to_string()
    }

    /// Render a descriptor template file to its output path.
    ///
    /// The rendered output must parse as YAML; a descriptor the engine
    /// cannot read would only fail later and less legibly.
    pub fn render_file(
        &self,
        template_path: &Path,
        output_path: &Path,
        context: &RenderContext,
    ) -> TemplateResult<()> {
        if !template_path.exists() {
            return Err(TemplateError::NotFound(
                template_path.to_string_lossy().to_string(),
            ));
        }

        let template = fs::read_to_string(template_path)?;
        let rendered = self.render_str(&template, context);

        serde_yaml::from_str::<serde_yaml::Value>(&rendered)?;

        fs::write(output_path, &rendered)?;
        info!(
            "Rendered descriptor: {:?} -> {:?}",
            template_path.file_name().unwrap_or_default(),
            output_path
        );
        debug!("Rendered content:\n{}", rendered);

        Ok(())
    }
}

/// Minimal descriptor written when a project carries none of its own.
pub fn default_descriptor(project: &str) -> String {
    format!(
        "name: {}\nruntime: yaml\ndescription: Managed by restack\n",
        project
    )
}
