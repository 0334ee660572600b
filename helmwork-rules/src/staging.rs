//! Chart source staging: a plain recursive copy into the build directory.

use std::fs;
use std::path::Path;

use helmwork_command::CommandError;

/// Replace `target` with a fresh copy of `source`.
pub(crate) fn stage_chart(source: &Path, target: &Path) -> Result<(), CommandError> {
    if !source.is_dir() {
        return Err(io_err(
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "chart directory not found"),
        ));
    }
    if target.exists() {
        fs::remove_dir_all(target).map_err(|e| io_err(target, e))?;
    }
    copy_dir(source, target)?;
    tracing::info!("staged {} -> {}", source.display(), target.display());
    Ok(())
}

fn copy_dir(source: &Path, target: &Path) -> Result<(), CommandError> {
    fs::create_dir_all(target).map_err(|e| io_err(target, e))?;
    let mut entries = fs::read_dir(source)
        .map_err(|e| io_err(source, e))?
        .map(|entry| entry.map_err(|e| io_err(source, e)))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let from = entry.path();
        let to = target.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| io_err(&from, e))?;
        if file_type.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| io_err(&from, e))?;
        }
    }
    Ok(())
}

fn io_err(path: &Path, source: std::io::Error) -> CommandError {
    CommandError::Io {
        path: path.to_path_buf(),
        source,
    }
}
