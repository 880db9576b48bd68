//! Error types and helpers for user-friendly error messages
//!
//! Every fatal condition of a run maps onto one [`HostcovError`] variant.
//! Soft failures (coverage capture, filtering) never become errors; they are
//! printed as warnings by the stage that hit them.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline errors with actionable hints
#[derive(Error, Debug)]
pub enum HostcovError {
    /// Configuration file or command-line errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        hint: Option<String>,
    },

    /// Tool/executable not found in PATH
    #[error("Missing tool: {tool}")]
    MissingTool {
        tool: String,
        required_for: String,
        hint: String,
    },

    /// Setting the build target or building a project failed
    #[error("Build failed for {project}: {message}")]
    BuildFailure {
        project: String,
        message: String,
        hint: Option<String>,
    },

    /// No runnable test binary in the build output directory
    #[error("Could not find executable for {project} in {}", build_dir.display())]
    ExecutableNotFound {
        project: String,
        build_dir: PathBuf,
    },

    /// The test binary exited non-zero
    #[error("Test execution failed for {project} (exit code {exit_code})")]
    TestFailure { project: String, exit_code: i32 },

    /// One or more projects failed while running with --keep-going
    #[error("{} of {total} projects failed: {}", failed.len(), failed.join(", "))]
    ProjectsFailed { failed: Vec<String>, total: usize },

    /// No project produced a coverage dataset
    #[error("No coverage data found. Please run tests first.")]
    NoCoverageData,

    /// Merging the per-project datasets failed
    #[error("Failed to merge coverage data.")]
    MergeFailure {
        inputs: Vec<PathBuf>,
        /// What lcov printed before failing
        output: Option<String>,
    },

    /// HTML report generation failed
    #[error("Failed to generate HTML report. Tracefile might contain invalid paths.")]
    ReportFailure {
        tracefile: PathBuf,
        /// What genhtml printed before failing
        output: Option<String>,
    },

    /// Unified line coverage below the requested threshold
    #[error("Line coverage {actual} is below the required {threshold:.1}%")]
    BelowThreshold { actual: String, threshold: f64 },
}

impl HostcovError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
            hint: None,
        }
    }

    /// Create a configuration error with source and hint
    pub fn config_error_with_hint(
        message: impl Into<String>,
        source: Option<anyhow::Error>,
        hint: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source,
            hint: Some(hint.into()),
        }
    }

    /// Create a missing tool error
    pub fn missing_tool(
        tool: impl Into<String>,
        required_for: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::MissingTool {
            tool: tool.into(),
            required_for: required_for.into(),
            hint: hint.into(),
        }
    }

    /// Create a build failure error
    pub fn build_failure(project: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BuildFailure {
            project: project.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Create a build failure error with hint
    pub fn build_failure_with_hint(
        project: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::BuildFailure {
            project: project.into(),
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            HostcovError::Config { hint, .. } | HostcovError::BuildFailure { hint, .. } => {
                hint.clone()
            }
            HostcovError::MissingTool { hint, .. } => Some(hint.clone()),
            HostcovError::ExecutableNotFound { .. } => Some(hints::executable_not_found().into()),
            HostcovError::TestFailure { project, .. } => Some(format!(
                "Re-run with: hostcov test --project {} to reproduce the failure",
                project
            )),
            HostcovError::ProjectsFailed { .. } | HostcovError::BelowThreshold { .. } => None,
            HostcovError::NoCoverageData => Some(hints::no_coverage_data().into()),
            HostcovError::MergeFailure { .. } => Some(hints::merge_failure().into()),
            HostcovError::ReportFailure { tracefile, .. } => Some(format!(
                "Inspect the SF: entries of {} and make sure the sources still exist",
                tracefile.display()
            )),
        }
    }

    /// Output of the external tool behind the failure, if it printed any
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            HostcovError::MergeFailure { output, .. }
            | HostcovError::ReportFailure { output, .. } => output.as_deref(),
            _ => None,
        }
    }

    /// Display error with formatting and hints
    pub fn display_with_hints(&self) {
        use console::style;

        eprintln!("\n{} {}", style("ERROR:").red().bold(), self);

        if let HostcovError::MissingTool { required_for, .. } = self {
            eprintln!("  required for: {}", required_for);
        }

        if let Some(output) = self.tool_output() {
            eprintln!("\n{}", style("OUTPUT:").cyan().bold());
            for line in output.lines() {
                eprintln!("  {}", line);
            }
        }

        if let Some(h) = self.hint() {
            eprintln!("\n{} {}", style("HINT:").yellow().bold(), h);
        }

        if let HostcovError::MergeFailure { inputs, .. } = self {
            if !inputs.is_empty() {
                eprintln!("\n{}", style("INPUTS:").cyan().bold());
                for input in inputs {
                    eprintln!("  • {}", input.display());
                }
            }
        }

        eprintln!();
    }
}

/// Common error hints
pub mod hints {
    /// Get hint for missing idf.py
    pub fn idf() -> &'static str {
        "Install ESP-IDF and export its environment before running:\n\
         • . $IDF_PATH/export.sh\n\
         • Or set [tools].idf in hostcov.toml to the idf.py location"
    }

    /// Get hint for missing lcov/genhtml
    pub fn lcov() -> &'static str {
        "Install lcov (provides both lcov and genhtml):\n\
         • macOS: brew install lcov\n\
         • Ubuntu: sudo apt install lcov"
    }

    /// Get hint for invalid hostcov.toml
    pub fn invalid_config() -> &'static str {
        "hostcov.toml is invalid. Common issues:\n\
         • Unknown section or key (only [discovery], [tools], [coverage])\n\
         • Invalid TOML syntax (check quotes, brackets, commas)"
    }

    /// Get hint when no test binary was produced
    pub fn executable_not_found() -> &'static str {
        "The build finished but produced no runnable binary.\n\
         Check that the project targets linux: idf.py --preview set-target linux\n\
         or re-run with CLEAN_BUILD=1"
    }

    /// Get hint when nothing was captured
    pub fn no_coverage_data() -> &'static str {
        "Run the host tests first: hostcov test\n\
         Projects need a build/ directory containing .gcda files.\n\
         If they have one, check the lcov output printed with the warnings above"
    }

    /// Get hint for a failed lcov merge
    pub fn merge_failure() -> &'static str {
        "One of the tracefiles is probably corrupt. Re-run the tests with CLEAN_BUILD=1"
    }
}
