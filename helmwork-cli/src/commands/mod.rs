pub mod plan;
pub mod run;
pub mod tasks;

use std::path::Path;

use anyhow::{Context, Result};
use helmwork_core::{project, Project};

/// Load the project file, resolving a relative path against the current directory.
pub fn load_project(path: &Path) -> Result<Project> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("could not determine the current directory")?
            .join(path)
    };
    project::load_at(&path).with_context(|| format!("failed to load {}", path.display()))
}
