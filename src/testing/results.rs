//! Per-project run results
//!
//! Collects the outcome of each project's build/test cycle so `--keep-going`
//! runs can print a table at the end and fail once, after every project ran.

use std::path::PathBuf;
use std::time::Duration;

use console::style;

use crate::error::HostcovError;

/// Project result status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Passed,
    Failed,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Passed => write!(f, "PASSED"),
            ProjectStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of one project's build/test cycle
#[derive(Debug)]
pub struct ProjectResult {
    /// Project name
    pub name: String,
    /// Result status
    pub status: ProjectStatus,
    /// Wall-clock time for all stages
    pub duration: Duration,
    /// The test binary that ran, when one was found
    pub executable: Option<PathBuf>,
    /// Failure message (if failed)
    pub message: Option<String>,
    failure: Option<anyhow::Error>,
}

impl ProjectResult {
    pub fn passed(name: &str, executable: PathBuf, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: ProjectStatus::Passed,
            duration,
            executable: Some(executable),
            message: None,
            failure: None,
        }
    }

    pub fn failed(name: &str, error: anyhow::Error, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: ProjectStatus::Failed,
            duration,
            executable: None,
            message: Some(error.to_string()),
            failure: Some(error),
        }
    }

    /// The typed error behind a failure, if it is one of ours
    pub fn error(&self) -> Option<&HostcovError> {
        self.failure.as_ref()?.downcast_ref::<HostcovError>()
    }

    /// Consume the result, yielding the failure
    pub fn into_error(self) -> Option<anyhow::Error> {
        self.failure
    }
}

/// Aggregated run summary
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<ProjectResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: ProjectResult) {
        self.results.push(result);
    }

    pub fn passed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ProjectStatus::Passed)
            .count()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.status == ProjectStatus::Failed)
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.status == ProjectStatus::Passed)
    }

    /// Print a pass/fail table
    pub fn print_summary(&self) {
        println!("\n{}", "═".repeat(60));
        println!("HOST TEST SUMMARY");
        println!("{}", "═".repeat(60));

        for result in &self.results {
            let status = match result.status {
                ProjectStatus::Passed => style(result.status.to_string()).green(),
                ProjectStatus::Failed => style(result.status.to_string()).red(),
            };
            println!(
                "  {:<40} {:<8} {:>7.1}s",
                result.name,
                status,
                result.duration.as_secs_f64()
            );
            if let Some(message) = &result.message {
                println!("      {}", style(message).dim());
            } else if let Some(executable) = &result.executable {
                println!("      {}", style(executable.display()).dim());
            }
        }

        println!("{}", "─".repeat(60));
        println!(
            "  {} passed, {} failed, {} total",
            self.passed_count(),
            self.results.len() - self.passed_count(),
            self.results.len()
        );
        println!("{}", "═".repeat(60));
    }
}
