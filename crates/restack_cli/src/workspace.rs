//! Operation workspace preparation.
//!
//! Every operation runs out of a `build/` directory next to the project
//! sources: auxiliary project files are copied in, the descriptor is
//! rendered, and the engine's state root lives at `build/.state`. The
//! project directory itself is never mutated.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use restack_templates::{default_descriptor, RenderContext, TemplateRenderer, PROJECT_DESCRIPTOR};

/// Prepared operation workspace.
pub struct Workspace {
    pub work_dir: PathBuf,
    pub build_dir: PathBuf,
    pub state_root: PathBuf,
}

/// Engine state root for a project directory.
pub fn state_root(work_dir: &Path) -> PathBuf {
    work_dir.join("build").join(".state")
}

/// Prepare the build directory for one operation.
pub fn prepare(
    work_dir: &Path,
    project: &str,
    stack: &str,
    environment: &str,
    verbose: bool,
) -> Result<Workspace> {
    let work_dir = work_dir
        .canonicalize()
        .with_context(|| format!("work directory not found: {:?}", work_dir))?;
    let build_dir = work_dir.join("build");
    let state_root = build_dir.join(".state");

    fs::create_dir_all(&state_root)
        .with_context(|| format!("could not create state root {:?}", state_root))?;

    if verbose {
        info!("Using work directory: {:?}", work_dir);
        info!("Using build directory: {:?}", build_dir);
    }

    copy_project_files(&work_dir, &build_dir);
    render_descriptor(&work_dir, &build_dir, project, stack, environment)?;

    Ok(Workspace {
        work_dir,
        build_dir,
        state_root,
    })
}

/// Copy project files into the build directory. Best-effort: individual
/// copy failures are logged and skipped.
fn copy_project_files(work_dir: &Path, build_dir: &Path) {
    let entries = match work_dir.read_dir() {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read work directory {:?}: {}", work_dir, e);
            return;
        }
    };

    let options = fs_extra::file::CopyOptions::new().overwrite(true);
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        // The descriptor is rendered, not copied.
        if !path.is_file() || name == PROJECT_DESCRIPTOR {
            continue;
        }
        let target = build_dir.join(&name);
        match fs_extra::file::copy(&path, &target, &options) {
            Ok(_) => debug!("Copied project file: {}", name),
            Err(e) => warn!("Could not copy {}: {}", name, e),
        }
    }
}

/// Render the project descriptor into the build directory, falling back to
/// a minimal default when the project carries none.
fn render_descriptor(
    work_dir: &Path,
    build_dir: &Path,
    project: &str,
    stack: &str,
    environment: &str,
) -> Result<()> {
    let template = work_dir.join(PROJECT_DESCRIPTOR);
    let output = build_dir.join(PROJECT_DESCRIPTOR);

    if template.exists() {
        let renderer = TemplateRenderer::new();
        let context = RenderContext::for_project(project, stack, environment);
        renderer
            .render_file(&template, &output, &context)
            .with_context(|| format!("could not render {:?}", template))?;
    } else if !output.exists() {
        info!("No {} found; writing a minimal descriptor", PROJECT_DESCRIPTOR);
        fs::write(&output, default_descriptor(project))
            .with_context(|| format!("could not write {:?}", output))?;
    }

    Ok(())
}
