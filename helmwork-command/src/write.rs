//! Content-addressed, atomic file writes for generated values files.
//!
//! A file whose bytes already match is left alone so its mtime does not move.
//! Otherwise the content goes to a uniquely named temp file in the target
//! directory first and is renamed into place. Units running in parallel may
//! materialize the same values file at once; each writer stages its own copy.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, CommandError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Written { path: PathBuf },
    Unchanged { path: PathBuf },
}

/// Hex SHA-256 of `content`.
pub fn digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Write `content` to `path` unless it already holds exactly that content.
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<WriteResult, CommandError> {
    let unchanged = fs::read(path)
        .map(|existing| existing == content)
        .unwrap_or(false);
    if unchanged {
        tracing::debug!("unchanged: {}", path.display());
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
        });
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    let mut staging = tempfile::Builder::new()
        .prefix(".helmwork-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| io_err(parent, e))?;
    staging
        .write_all(content)
        .map_err(|e| io_err(staging.path(), e))?;
    // A failed persist drops the temp file, which removes it.
    staging.persist(path).map_err(|e| io_err(path, e.error))?;

    tracing::info!("wrote {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rewrite_only_when_content_differs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("values.yaml");
        let outcomes: Vec<bool> = [&b"a: 1\n"[..], b"a: 1\n", b"a: 2\n"]
            .iter()
            .map(|content| matches!(write_atomic(&path, content).unwrap(), WriteResult::Written { .. }))
            .collect();
        assert_eq!(outcomes, vec![true, false, true]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 2\n");
    }

    #[test]
    fn no_staging_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.yaml");
        write_atomic(&path, b"data").unwrap();
        write_atomic(&path, b"other").unwrap();
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("clean.yaml")]);
    }

    #[test]
    fn concurrent_writers_of_the_same_content_all_succeed() {
        use std::sync::{Arc, Barrier};

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("values-shared.yaml");
        let content: Vec<u8> = (0..20_000)
            .map(|i| format!("key{i}: {i}\n"))
            .collect::<String>()
            .into_bytes();

        for _ in 0..10 {
            let _ = fs::remove_file(&path);
            let barrier = Arc::new(Barrier::new(4));
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let barrier = Arc::clone(&barrier);
                    let path = path.clone();
                    let content = content.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        write_atomic(&path, &content).map(|_| ())
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
            assert_eq!(fs::read(&path).unwrap(), content);
        }
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("build").join("helm").join("values").join("v.yaml");
        write_atomic(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn digest_is_stable_hex() {
        assert_eq!(
            digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
