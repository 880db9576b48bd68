//! Path utilities

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::HostcovError;

/// Resolve the host-test root: `--root` if given, else the current directory
pub fn resolve_root(root: Option<&Path>) -> Result<PathBuf> {
    let dir = match root {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if !dir.is_dir() {
        return Err(HostcovError::config_error(format!(
            "Root directory does not exist: {}",
            dir.display()
        ))
        .into());
    }

    // Absolute paths keep the tracefiles and the HTML report linkable
    dir.canonicalize()
        .with_context(|| format!("Failed to resolve {}", dir.display()))
}

/// Ensure a directory exists
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Remove a directory tree; a missing directory is not an error
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Remove a file; a missing file is not an error
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// `file://` URL for a local path
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_missing_paths_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_dir_if_exists(&dir.path().join("build")).is_ok());
        assert!(remove_file_if_exists(&dir.path().join("unified_coverage.info")).is_ok());
    }

    #[test]
    fn test_remove_dir_if_exists_removes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build/esp-idf");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::write(build.join("main.gcda"), b"x").unwrap();

        remove_dir_if_exists(&dir.path().join("build")).unwrap();
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn test_resolve_root_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = resolve_root(Some(&missing)).unwrap_err();
        assert!(err.downcast_ref::<HostcovError>().is_some());
    }

    #[test]
    fn test_file_url() {
        assert_eq!(
            file_url(Path::new("/work/coverage/html/index.html")),
            "file:///work/coverage/html/index.html"
        );
    }
}
