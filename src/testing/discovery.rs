//! Project and test-executable discovery
//!
//! A project is an immediate subdirectory of the root that carries a build
//! descriptor. Discovery is deterministic: projects come back sorted by name,
//! and the build directory is scanned in sorted order when looking for the
//! test binary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::error::HostcovError;

/// File suffixes that mark build artifacts rather than test binaries
const ARTIFACT_SUFFIXES: &[&str] = &[".bin", ".map", ".cmake"];

/// Compiled-output suffix used when no plain executable is found
const ELF_PATTERN: &str = "*.elf";

/// A discovered test project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Directory name
    pub name: String,
    /// Project directory
    pub root: PathBuf,
    /// Build output directory (may not exist yet)
    pub build_dir: PathBuf,
}

impl Project {
    pub fn new(root: PathBuf, build_dir_name: &str) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let build_dir = root.join(build_dir_name);
        Self {
            name,
            root,
            build_dir,
        }
    }

    /// Whether the project has been built at least once
    pub fn has_build_output(&self) -> bool {
        self.build_dir.is_dir()
    }
}

/// Project discovery engine
pub struct ProjectDiscovery<'a> {
    /// Marker file name
    descriptor: &'a str,
    /// Build output directory name
    build_dir: &'a str,
    /// Directory names to skip
    denylist: &'a [String],
}

impl<'a> ProjectDiscovery<'a> {
    pub fn new(descriptor: &'a str, build_dir: &'a str, denylist: &'a [String]) -> Self {
        Self {
            descriptor,
            build_dir,
            denylist,
        }
    }

    /// Sorted projects directly under `root`. Entries that cannot be read or
    /// do not qualify are skipped; an unreadable root is an error.
    pub fn discover(&self, root: &Path) -> Result<Vec<Project>> {
        let entries = fs::read_dir(root).map_err(|e| {
            HostcovError::config_error_with_hint(
                format!("Failed to read root directory {}", root.display()),
                Some(e.into()),
                "Pass the host-test directory with --root",
            )
        })?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !self.denylist.iter().any(|d| d == name))
            .filter(|name| root.join(name).join(self.descriptor).exists())
            .collect();
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| Project::new(root.join(name), self.build_dir))
            .collect())
    }
}

/// Keep only the projects named in `selected`, preserving discovery order.
/// An empty selection keeps everything; unknown names are an error.
pub fn select_projects(projects: Vec<Project>, selected: &[String]) -> Result<Vec<Project>> {
    if selected.is_empty() {
        return Ok(projects);
    }

    let unknown: Vec<&str> = selected
        .iter()
        .filter(|name| !projects.iter().any(|p| &p.name == *name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        let available = projects
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(HostcovError::config_error_with_hint(
            format!("Unknown project(s): {}", unknown.join(", ")),
            None,
            format!("Available projects: {}", available),
        )
        .into());
    }

    Ok(projects
        .into_iter()
        .filter(|p| selected.contains(&p.name))
        .collect())
}

/// Locate the test binary inside `build_dir`.
///
/// Candidates are regular executable files without artifact suffixes and
/// without "cmake" in their name. When none qualify, `*.elf` files are used.
/// The first candidate in name order wins.
pub fn find_test_executable(build_dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(build_dir)
        .map(|rd| rd.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();

    let executable = entries.into_iter().find(|path| {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        path.is_file()
            && is_executable(path)
            && !ARTIFACT_SUFFIXES.iter().any(|s| name.ends_with(s))
            && !name.to_lowercase().contains("cmake")
    });

    executable.or_else(|| find_elf(build_dir))
}

fn find_elf(build_dir: &Path) -> Option<PathBuf> {
    let escaped = glob::Pattern::escape(&build_dir.to_string_lossy());
    let pattern = Path::new(&escaped).join(ELF_PATTERN);
    let mut elfs: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .ok()?
        .flatten()
        .collect();
    elfs.sort();
    elfs.into_iter().next()
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        path.extension().map(|ext| ext == "exe").unwrap_or(false)
    }
}
