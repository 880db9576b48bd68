//! Build-run driver
//!
//! Drives one project through clean → coverage reset → build → locate binary
//! → execute. Every failing stage is fatal for the project; nothing is
//! retried.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use walkdir::WalkDir;

use super::discovery::{find_test_executable, Project};
use super::results::ProjectResult;
use crate::config::ToolsConfig;
use crate::error::{hints, HostcovError};
use crate::exec::{ToolCommand, ToolRunner};
use crate::utils::paths::remove_dir_if_exists;
use crate::utils::terminal::{print_banner, print_info, print_warning};

/// Environment variable selecting clean builds
pub const CLEAN_BUILD_ENV: &str = "CLEAN_BUILD";

/// Whether `CLEAN_BUILD` asks for a clean build (`1`, `true`, `yes`, `on`)
pub fn clean_build_from_env() -> bool {
    std::env::var(CLEAN_BUILD_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Runs the build/test cycle of a single project
pub struct ProjectRunner<'a> {
    runner: &'a dyn ToolRunner,
    tools: &'a ToolsConfig,
    clean: bool,
}

impl<'a> ProjectRunner<'a> {
    pub fn new(runner: &'a dyn ToolRunner, tools: &'a ToolsConfig, clean: bool) -> Self {
        Self {
            runner,
            tools,
            clean,
        }
    }

    /// Run every stage and time it
    pub fn run(&self, project: &Project) -> ProjectResult {
        let start = Instant::now();
        match self.run_stages(project) {
            Ok(executable) => ProjectResult::passed(&project.name, executable, start.elapsed()),
            Err(e) => ProjectResult::failed(&project.name, e, start.elapsed()),
        }
    }

    fn run_stages(&self, project: &Project) -> Result<PathBuf> {
        println!();
        print_banner(&format!("Processing: {}", project.name));

        if self.clean {
            self.clean_build(project)?;
        }

        print_info(&format!(
            "Cleaning old coverage data (.gcda) in {}",
            project.root.display()
        ));
        let removed = reset_coverage_data(&project.root);
        if removed > 0 {
            println!("  removed {} file(s)", removed);
        }

        self.build(project)?;

        let executable = find_test_executable(&project.build_dir).ok_or_else(|| {
            HostcovError::ExecutableNotFound {
                project: project.name.clone(),
                build_dir: project.build_dir.clone(),
            }
        })?;

        self.execute(project, &executable)?;
        Ok(executable)
    }

    /// Remove the build directory and re-select the host target
    fn clean_build(&self, project: &Project) -> Result<()> {
        print_info(&format!("Cleaning build directory in {}", project.root.display()));
        if let Err(e) = remove_dir_if_exists(&project.build_dir) {
            print_warning(&format!(
                "Could not fully remove {}: {}",
                project.build_dir.display(),
                e
            ));
        }

        print_info(&format!("Setting target to {}", self.tools.target));
        let cmd = ToolCommand::new(&self.tools.idf, &project.root)
            .args(["--preview", "set-target"])
            .arg(&self.tools.target)
            .inherit_io();
        let result = self
            .runner
            .run(&cmd)
            .map_err(|_| HostcovError::missing_tool(&self.tools.idf, "set-target", hints::idf()))?;

        if !result.success {
            return Err(HostcovError::build_failure_with_hint(
                &project.name,
                format!("Failed to set target to {}", self.tools.target),
                format!("Ensure {} is in PATH and the ESP-IDF environment is exported", self.tools.idf),
            )
            .into());
        }
        Ok(())
    }

    fn build(&self, project: &Project) -> Result<()> {
        print_info(&format!("Building in {}", project.root.display()));
        let cmd = ToolCommand::new(&self.tools.idf, &project.root)
            .arg("build")
            .inherit_io();
        let result = self
            .runner
            .run(&cmd)
            .map_err(|_| HostcovError::missing_tool(&self.tools.idf, "building projects", hints::idf()))?;

        if !result.success {
            return Err(HostcovError::build_failure(
                &project.name,
                format!("{} build exited with code {}", self.tools.idf, result.exit_code),
            )
            .into());
        }
        Ok(())
    }

    fn execute(&self, project: &Project, executable: &Path) -> Result<()> {
        print_info(&format!("Running executable: {}", executable.display()));
        let cmd = ToolCommand::new(executable.to_string_lossy(), &project.root).inherit_io();
        let result = self.runner.run(&cmd).map_err(|e| {
            HostcovError::build_failure(
                &project.name,
                format!("Could not launch {}: {}", executable.display(), e),
            )
        })?;

        if !result.success {
            return Err(HostcovError::TestFailure {
                project: project.name.clone(),
                exit_code: result.exit_code,
            }
            .into());
        }
        Ok(())
    }
}

/// Delete every `.gcda` file under `dir`. Failures are ignored; returns the
/// number of files removed.
pub fn reset_coverage_data(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "gcda").unwrap_or(false))
        .filter(|e| std::fs::remove_file(e.path()).is_ok())
        .count()
}
