//! Empty marker files for units whose side effects helm never writes to disk.
//!
//! A marker is touched only after the unit succeeded, so its presence and
//! mtime let an engine decide whether `helm lint` / `helm unittest` must run
//! again.

use std::path::Path;

use crate::error::{io_err, CommandError};

/// Create `path` (and its parents) as an empty file, or refresh its mtime.
pub fn touch(path: &Path) -> Result<(), CommandError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(path, b"").map_err(|e| io_err(path, e))?;
    tracing::debug!("touched marker: {}", path.display());
    Ok(())
}
