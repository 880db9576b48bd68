//! hostcov.toml configuration parsing
//!
//! The file is optional and lives in the host-test root. Every key has a
//! default matching the stock ESP-IDF host-test layout, so an empty or absent
//! file yields a working configuration.
//!
//! ```toml
//! [discovery]
//! descriptor = "CMakeLists.txt"
//! build_dir = "build"
//! exclude = ["espnow_facade"]
//!
//! [tools]
//! idf = "idf.py"
//! target = "linux"
//! lcov = "lcov"
//! genhtml = "genhtml"
//!
//! [coverage]
//! output_dir = "coverage"
//! ignore_file = "coverage_ignore.txt"
//! title = "Host Test Coverage"
//! fail_under = 80.0
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use super::validation::validate_config;
use crate::error::{hints, HostcovError};

/// Config file name looked up in the root directory
pub const CONFIG_FILE: &str = "hostcov.toml";

/// Directory names never treated as projects
const BUILTIN_EXCLUDES: &[&str] = &["build", "__pycache__", ".pytest_cache"];

/// Root configuration from hostcov.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostcovConfig {
    /// Project discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// External tool names
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Coverage output settings
    #[serde(default)]
    pub coverage: CoverageSettings,
}

/// `[discovery]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DiscoveryConfig {
    /// Marker file that makes a directory a project
    pub descriptor: String,

    /// Build output directory name inside each project
    pub build_dir: String,

    /// Extra directory names to skip, on top of the built-in list
    pub exclude: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            descriptor: "CMakeLists.txt".to_string(),
            build_dir: "build".to_string(),
            exclude: Vec::new(),
        }
    }
}

/// `[tools]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ToolsConfig {
    /// ESP-IDF front-end
    pub idf: String,

    /// Target passed to `set-target` on clean builds
    pub target: String,

    /// lcov executable (capture, remove, merge, summary)
    pub lcov: String,

    /// genhtml executable
    pub genhtml: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            idf: "idf.py".to_string(),
            target: "linux".to_string(),
            lcov: "lcov".to_string(),
            genhtml: "genhtml".to_string(),
        }
    }
}

/// `[coverage]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CoverageSettings {
    /// Output directory, relative to the root
    pub output_dir: String,

    /// Ignore-pattern file, relative to the root
    pub ignore_file: String,

    /// HTML report title
    pub title: String,

    /// Minimum unified line coverage in percent
    pub fail_under: Option<f64>,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            output_dir: "coverage".to_string(),
            ignore_file: "coverage_ignore.txt".to_string(),
            title: "Host Test Coverage".to_string(),
            fail_under: None,
        }
    }
}

impl HostcovConfig {
    /// Load `hostcov.toml` from `root`, or defaults if there is none
    pub fn load_from_root(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HostcovError::config_error_with_hint(
                format!("Failed to read {}", path.display()),
                Some(e.into()),
                hints::invalid_config(),
            )
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            HostcovError::config_error_with_hint(
                format!("Failed to parse {}: {}", CONFIG_FILE, e.message()),
                Some(e.into()),
                hints::invalid_config(),
            )
        })?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Directory names excluded from discovery: built-ins, the coverage
    /// output directory, then configured extras
    pub fn denylist(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_EXCLUDES.iter().map(|s| s.to_string()).collect();
        names.push(self.coverage.output_dir.clone());
        for name in &self.discovery.exclude {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.coverage.output_dir)
    }

    pub fn ignore_file(&self, root: &Path) -> PathBuf {
        root.join(&self.coverage.ignore_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = HostcovConfig::parse("").unwrap();
        assert_eq!(config.discovery.descriptor, "CMakeLists.txt");
        assert_eq!(config.discovery.build_dir, "build");
        assert_eq!(config.tools.idf, "idf.py");
        assert_eq!(config.tools.target, "linux");
        assert_eq!(config.coverage.title, "Host Test Coverage");
        assert!(config.coverage.fail_under.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = HostcovConfig::parse(
            r#"
            [discovery]
            exclude = ["espnow_facade"]

            [tools]
            lcov = "/usr/local/bin/lcov"

            [coverage]
            fail_under = 75.5
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery.descriptor, "CMakeLists.txt");
        assert_eq!(config.tools.lcov, "/usr/local/bin/lcov");
        assert_eq!(config.tools.genhtml, "genhtml");
        assert_eq!(config.coverage.fail_under, Some(75.5));
        assert!(config.denylist().contains(&"espnow_facade".to_string()));
    }

    #[test]
    fn test_denylist_contains_output_dir() {
        let config = HostcovConfig::parse("[coverage]\noutput_dir = \"cov-out\"\n").unwrap();
        let denylist = config.denylist();
        assert!(denylist.contains(&"cov-out".to_string()));
        assert!(denylist.contains(&"build".to_string()));
        assert!(!denylist.contains(&"coverage".to_string()));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = HostcovConfig::parse("[tools]\nninja = \"ninja\"\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HostcovError>(),
            Some(HostcovError::Config { .. })
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostcovConfig::load_from_root(dir.path()).unwrap();
        assert_eq!(config.output_dir(dir.path()), dir.path().join("coverage"));
        assert_eq!(
            config.ignore_file(dir.path()),
            dir.path().join("coverage_ignore.txt")
        );
    }
}
