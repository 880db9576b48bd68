//! Coverage capture, filtering and aggregation
//!
//! Wraps the lcov tool family. Per project: capture the build directory into
//! a raw tracefile, strip ignored sources into a filtered one, print its
//! summary. Afterwards all effective tracefiles are merged into one unified
//! tracefile which genhtml renders as the final report.

use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::ProgressBar;

use super::discovery::Project;
use super::summary::{summarize, SummaryReport, SummarySection, UNIFIED_LABEL};
use crate::config::HostcovConfig;
use crate::error::HostcovError;
use crate::exec::{ToolCommand, ToolRunner};
use crate::utils::paths::{ensure_dir, remove_file_if_exists};
use crate::utils::terminal::{create_spinner, print_banner, print_warning};

/// Raw tracefile name inside a project's build directory
pub const RAW_TRACEFILE: &str = "coverage.info";

/// Filtered tracefile name inside a project's build directory
pub const FILTERED_TRACEFILE: &str = "coverage_filtered.info";

/// Unified tracefile name inside the output directory
pub const UNIFIED_TRACEFILE: &str = "unified_coverage.info";

/// Summary file name inside the output directory
pub const SUMMARY_FILE: &str = "summary.txt";

/// How strictly lcov treats gcov errors during capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Any gcov error fails the capture
    Strict,
    /// gcov errors are tolerated (`--ignore-errors gcov`)
    Permissive,
}

impl CaptureMode {
    /// Attempt order for a capture
    pub const ATTEMPTS: [CaptureMode; 2] = [CaptureMode::Strict, CaptureMode::Permissive];

    fn extra_args(self) -> &'static [&'static str] {
        match self {
            CaptureMode::Strict => &[],
            CaptureMode::Permissive => &["--ignore-errors", "gcov"],
        }
    }
}

/// Tracefiles produced for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCoverage {
    pub raw: PathBuf,
    pub filtered: Option<PathBuf>,
}

impl ProjectCoverage {
    /// Filtered tracefile if filtering succeeded, else the raw one
    pub fn effective(&self) -> &Path {
        self.filtered.as_deref().unwrap_or(&self.raw)
    }
}

/// lcov front-end bound to a runner
pub struct Lcov<'a> {
    runner: &'a dyn ToolRunner,
    program: &'a str,
}

impl<'a> Lcov<'a> {
    pub fn new(runner: &'a dyn ToolRunner, program: &'a str) -> Self {
        Self { runner, program }
    }

    fn capture_command(&self, project: &Project, output: &Path, mode: CaptureMode) -> ToolCommand {
        ToolCommand::new(self.program, &project.root)
            .arg("--capture")
            .arg("--directory")
            .path_arg(&project.build_dir)
            .arg("--output-file")
            .path_arg(output)
            .args(mode.extra_args().iter().copied())
            .arg("--quiet")
    }

    /// Capture the project's build directory. A non-zero exit is retried once
    /// in permissive mode; a tool that cannot be launched is not retried.
    pub fn capture(&self, project: &Project) -> Option<PathBuf> {
        let output = project.build_dir.join(RAW_TRACEFILE);
        let mut diagnostics = None;

        for mode in CaptureMode::ATTEMPTS {
            match self.runner.run(&self.capture_command(project, &output, mode)) {
                Ok(result) if result.success => return Some(output),
                Ok(result) => diagnostics = result.diagnostics(),
                Err(e) => {
                    print_warning(&format!("Skipping coverage for {}: {:#}", project.name, e));
                    return None;
                }
            }
        }

        print_warning(&format!(
            "Skipping coverage for {}: capture failed in strict and permissive mode",
            project.name
        ));
        if let Some(diagnostics) = diagnostics {
            print_tool_output(&diagnostics);
        }
        None
    }

    /// Remove ignored sources from `raw`. Returns the filtered tracefile, or
    /// `None` when there is nothing to filter or lcov failed.
    pub fn filter(&self, project: &Project, raw: &Path, patterns: &[String]) -> Option<PathBuf> {
        if patterns.is_empty() {
            return None;
        }

        let output = project.build_dir.join(FILTERED_TRACEFILE);
        let cmd = ToolCommand::new(self.program, &project.root)
            .arg("--remove")
            .path_arg(raw)
            .args(patterns.iter().cloned())
            .arg("--output-file")
            .path_arg(&output)
            .arg("--quiet");

        let diagnostics = match self.runner.run(&cmd) {
            Ok(result) if result.success => return Some(output),
            Ok(result) => result.diagnostics(),
            Err(e) => Some(format!("{:#}", e)),
        };
        print_warning(&format!(
            "Filtering failed for {}; using unfiltered coverage",
            project.name
        ));
        if let Some(diagnostics) = diagnostics {
            print_tool_output(&diagnostics);
        }
        None
    }

    /// Capture then filter
    pub fn collect(&self, project: &Project, patterns: &[String]) -> Option<ProjectCoverage> {
        let raw = self.capture(project)?;
        let filtered = self.filter(project, &raw, patterns);
        Some(ProjectCoverage {
            raw,
            filtered,
        })
    }

    /// Merge `inputs` into `output` with a single lcov call
    pub fn merge(&self, inputs: &[PathBuf], output: &Path, cwd: &Path) -> Result<()> {
        let mut cmd = ToolCommand::new(self.program, cwd);
        for input in inputs {
            cmd = cmd.arg("-a").path_arg(input);
        }
        let cmd = cmd.arg("-o").path_arg(output).arg("--quiet");

        let output = match self.runner.run(&cmd) {
            Ok(result) if result.success => return Ok(()),
            Ok(result) => result.diagnostics(),
            Err(e) => Some(format!("{:#}", e)),
        };
        Err(HostcovError::MergeFailure {
            inputs: inputs.to_vec(),
            output,
        }
        .into())
    }

    pub fn summarize(&self, dataset: &Path, label: &str, cwd: &Path) -> SummarySection {
        summarize(self.runner, self.program, dataset, label, cwd)
    }
}

/// Render the unified tracefile to HTML; returns the index page
pub fn generate_html(
    runner: &dyn ToolRunner,
    genhtml: &str,
    tracefile: &Path,
    html_dir: &Path,
    title: &str,
    cwd: &Path,
) -> Result<PathBuf> {
    let cmd = ToolCommand::new(genhtml, cwd)
        .path_arg(tracefile)
        .arg("--output-directory")
        .path_arg(html_dir)
        .arg("--quiet")
        .arg("--title")
        .arg(title);

    let output = match runner.run(&cmd) {
        Ok(result) if result.success => return Ok(html_dir.join("index.html")),
        Ok(result) => result.diagnostics(),
        Err(e) => Some(format!("{:#}", e)),
    };
    Err(HostcovError::ReportFailure {
        tracefile: tracefile.to_path_buf(),
        output,
    }
    .into())
}

/// Echo a failed tool's own output under the warning that reports it
fn print_tool_output(output: &str) {
    for line in output.lines() {
        eprintln!("  {}", line);
    }
}

/// Output locations of a coverage run
#[derive(Debug, Clone)]
pub struct CoveragePaths {
    pub output_dir: PathBuf,
    pub unified: PathBuf,
    pub html_dir: PathBuf,
    pub summary: PathBuf,
}

impl CoveragePaths {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            unified: output_dir.join(UNIFIED_TRACEFILE),
            html_dir: output_dir.join("html"),
            summary: output_dir.join(SUMMARY_FILE),
            output_dir,
        }
    }
}

/// What a successful coverage run produced
#[derive(Debug, Clone)]
pub struct CoverageOutcome {
    /// Effective tracefiles passed to the merge, in project order
    pub merged: Vec<PathBuf>,
    pub unified: SummarySection,
    pub html_index: PathBuf,
}

/// Captures every project and aggregates the result
pub struct CoveragePipeline<'a> {
    runner: &'a dyn ToolRunner,
    config: &'a HostcovConfig,
    root: &'a Path,
    paths: CoveragePaths,
    verbose: bool,
}

impl<'a> CoveragePipeline<'a> {
    pub fn new(runner: &'a dyn ToolRunner, config: &'a HostcovConfig, root: &'a Path) -> Self {
        Self {
            runner,
            config,
            root,
            paths: CoveragePaths::new(config.output_dir(root)),
            verbose: false,
        }
    }

    /// Verbose runs echo commands instead of showing spinners
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Write the summary on a failing run without masking the failure
    fn persist_on_failure(&self, report: &SummaryReport) {
        if let Err(e) = report.persist(&self.paths.summary) {
            print_warning(&format!("{:#}", e));
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if self.verbose {
            ProgressBar::hidden()
        } else {
            create_spinner(message)
        }
    }

    pub fn paths(&self) -> &CoveragePaths {
        &self.paths
    }

    /// Run capture/filter per project, merge, summarize and render HTML.
    /// The summary file is written once, whether or not the run succeeds.
    pub fn run(&self, projects: &[Project], patterns: &[String]) -> Result<CoverageOutcome> {
        ensure_dir(&self.paths.output_dir)?;
        remove_file_if_exists(&self.paths.unified).map_err(|e| {
            HostcovError::config_error(format!(
                "Failed to remove previous {}: {}",
                self.paths.unified.display(),
                e
            ))
        })?;

        print_banner("Generating Coverage Reports");
        println!();

        let lcov = Lcov::new(self.runner, &self.config.tools.lcov);
        let mut report = SummaryReport::new();
        let mut merged = Vec::new();

        for project in projects.iter().filter(|p| p.has_build_output()) {
            let Some(coverage) = lcov.collect(project, patterns) else {
                continue;
            };
            let effective = coverage.effective().to_path_buf();
            report.add(lcov.summarize(&effective, &project.name, &project.root));
            merged.push(effective);
        }

        if merged.is_empty() {
            self.persist_on_failure(&report);
            return Err(HostcovError::NoCoverageData.into());
        }

        println!("\nMerging coverage data...");
        let spinner = self.spinner("lcov merge");
        let merge = lcov.merge(&merged, &self.paths.unified, self.root);
        spinner.finish_and_clear();
        if let Err(e) = merge {
            self.persist_on_failure(&report);
            return Err(e);
        }

        println!();
        let unified = lcov.summarize(&self.paths.unified, UNIFIED_LABEL, self.root);
        report.add(unified.clone());
        report.persist(&self.paths.summary)?;

        println!(
            "\nGenerating HTML report in {}...",
            self.paths.html_dir.display()
        );
        let spinner = self.spinner("genhtml");
        let html = generate_html(
            self.runner,
            &self.config.tools.genhtml,
            &self.paths.unified,
            &self.paths.html_dir,
            &self.config.coverage.title,
            self.root,
        );
        spinner.finish_and_clear();

        Ok(CoverageOutcome {
            merged,
            unified,
            html_index: html?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::subprocess::scripted::{exit, exit_with_stdout, ScriptedRunner};
    use std::fs;
    use tempfile::TempDir;

    const SUMMARY_OUT: &str = "  lines......: 88.2% (15 of 17 lines)\n  functions..: 83.3% (5 of 6 functions)\n";

    fn project(root: &Path, name: &str, built: bool) -> Project {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("CMakeLists.txt"), "").unwrap();
        if built {
            fs::create_dir_all(dir.join("build")).unwrap();
        }
        Project::new(dir, "build")
    }

    fn lcov_ok(cmd: &ToolCommand) -> Result<crate::exec::CommandResult> {
        if cmd.args.first().map(String::as_str) == Some("--summary") {
            Ok(exit_with_stdout(0, SUMMARY_OUT))
        } else {
            Ok(exit(0))
        }
    }

    #[test]
    fn test_capture_retries_permissive() {
        let temp = TempDir::new().unwrap();
        let p = project(temp.path(), "heartbeat_manager", true);
        let runner = ScriptedRunner::new(|cmd| {
            let permissive = cmd.args.iter().any(|a| a == "--ignore-errors");
            Ok(exit(if permissive { 0 } else { 1 }))
        });

        let raw = Lcov::new(&runner, "lcov").capture(&p).unwrap();
        assert_eq!(raw, p.build_dir.join("coverage.info"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        let build = p.build_dir.to_string_lossy().to_string();
        let out = raw.to_string_lossy().to_string();
        assert_eq!(
            calls[0].args,
            vec!["--capture", "--directory", build.as_str(), "--output-file", out.as_str(), "--quiet"]
        );
        assert_eq!(
            calls[1].args,
            vec![
                "--capture", "--directory", build.as_str(), "--output-file", out.as_str(),
                "--ignore-errors", "gcov", "--quiet"
            ]
        );
        assert_eq!(calls[1].cwd, p.root);
    }

    #[test]
    fn test_capture_gives_up_after_two_attempts() {
        let temp = TempDir::new().unwrap();
        let p = project(temp.path(), "tx_state_machine", true);
        let runner = ScriptedRunner::new(|_| Ok(exit(1)));

        assert!(Lcov::new(&runner, "lcov").capture(&p).is_none());
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_capture_launch_error_not_retried() {
        let temp = TempDir::new().unwrap();
        let p = project(temp.path(), "tx_state_machine", true);
        let runner = ScriptedRunner::new(|_| anyhow::bail!("lcov: not found"));

        assert!(Lcov::new(&runner, "lcov").capture(&p).is_none());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_filter_fallback_to_raw() {
        let temp = TempDir::new().unwrap();
        let p = project(temp.path(), "message_router", true);
        let patterns = vec!["*/mocks/*".to_string(), "/usr/*".to_string()];
        let runner = ScriptedRunner::new(|cmd| {
            Ok(exit(if cmd.args[0] == "--remove" { 1 } else { 0 }))
        });

        let coverage = Lcov::new(&runner, "lcov").collect(&p, &patterns).unwrap();
        assert!(coverage.filtered.is_none());
        assert_eq!(coverage.effective(), p.build_dir.join("coverage.info"));

        let remove = &runner.calls()[1];
        assert_eq!(remove.args[0], "--remove");
        assert_eq!(&remove.args[2..4], &["*/mocks/*", "/usr/*"]);
        assert_eq!(remove.args[4], "--output-file");
    }

    #[test]
    fn test_filter_success_is_effective() {
        let temp = TempDir::new().unwrap();
        let p = project(temp.path(), "message_router", true);
        let runner = ScriptedRunner::succeeding();

        let coverage = Lcov::new(&runner, "lcov")
            .collect(&p, &["*/esp-idf/*".to_string()])
            .unwrap();
        assert_eq!(
            coverage.effective(),
            p.build_dir.join("coverage_filtered.info")
        );
    }

    #[test]
    fn test_no_patterns_skips_filter() {
        let temp = TempDir::new().unwrap();
        let p = project(temp.path(), "espnow_storage", true);
        let runner = ScriptedRunner::succeeding();

        let coverage = Lcov::new(&runner, "lcov").collect(&p, &[]).unwrap();
        assert!(coverage.filtered.is_none());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_pipeline_skips_unbuilt_projects() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let a = project(root, "a", true);
        let b = project(root, "b", false);
        let config = HostcovConfig::default();
        let runner = ScriptedRunner::new(lcov_ok);

        let outcome = CoveragePipeline::new(&runner, &config, root)
            .run(&[a.clone(), b], &[])
            .unwrap();

        assert_eq!(outcome.merged, vec![a.build_dir.join("coverage.info")]);
        assert_eq!(outcome.unified.line_percent(), Some(88.2));
        assert_eq!(outcome.html_index, root.join("coverage/html/index.html"));

        let calls = runner.calls();
        let merge = calls
            .iter()
            .find(|c| c.args.first().map(String::as_str) == Some("-a"))
            .unwrap();
        assert_eq!(merge.args.iter().filter(|a| *a == "-a").count(), 1);
        assert_eq!(merge.cwd, root);
        assert!(calls.iter().all(|c| c.cwd != root.join("b")));

        let genhtml = calls.last().unwrap();
        assert_eq!(genhtml.program, "genhtml");
        assert!(genhtml.args.contains(&"Host Test Coverage".to_string()));

        let summary = fs::read_to_string(root.join("coverage/summary.txt")).unwrap();
        assert_eq!(summary.matches("a:\n").count(), 1);
        assert_eq!(summary.matches("UNIFIED REPORT:\n").count(), 1);
        assert!(!summary.contains("b:\n"));
    }

    #[test]
    fn test_pipeline_regenerates_unified() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let a = project(root, "a", true);
        fs::create_dir_all(root.join("coverage")).unwrap();
        let unified = root.join("coverage/unified_coverage.info");
        fs::write(&unified, "SF:/stale.cpp\nend_of_record\n").unwrap();

        let config = HostcovConfig::default();
        let runner = ScriptedRunner::new(lcov_ok);
        CoveragePipeline::new(&runner, &config, root)
            .run(&[a], &[])
            .unwrap();

        // The scripted merge writes nothing, so the old file must be gone
        assert!(!unified.exists());
    }

    #[test]
    fn test_pipeline_no_coverage_data() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let b = project(root, "b", false);
        let config = HostcovConfig::default();
        let runner = ScriptedRunner::succeeding();

        let err = CoveragePipeline::new(&runner, &config, root)
            .run(&[b], &[])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HostcovError>(),
            Some(HostcovError::NoCoverageData)
        ));
        assert!(runner.calls().is_empty());
        assert!(root.join("coverage/summary.txt").exists());
    }

    #[test]
    fn test_pipeline_unwritable_summary_keeps_original_error() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let b = project(root, "b", false);
        fs::create_dir_all(root.join("coverage/summary.txt")).unwrap();
        let config = HostcovConfig::default();
        let runner = ScriptedRunner::succeeding();

        let err = CoveragePipeline::new(&runner, &config, root)
            .run(&[b], &[])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HostcovError>(),
            Some(HostcovError::NoCoverageData)
        ));
    }

    #[test]
    fn test_pipeline_merge_failure() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let a = project(root, "a", true);
        let c = project(root, "c", true);
        let config = HostcovConfig::default();
        let runner = ScriptedRunner::new(|cmd| {
            if cmd.args[0] == "-a" {
                let mut result = exit(1);
                result.stderr = "lcov: ERROR: (corrupt) unexpected line\n".to_string();
                Ok(result)
            } else {
                Ok(exit(0))
            }
        });

        let err = CoveragePipeline::new(&runner, &config, root)
            .run(&[a, c], &[])
            .unwrap_err();
        match err.downcast_ref::<HostcovError>() {
            Some(HostcovError::MergeFailure { inputs, output }) => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(output.as_deref(), Some("lcov: ERROR: (corrupt) unexpected line"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_report_failure() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let a = project(root, "a", true);
        let config = HostcovConfig::default();
        let runner = ScriptedRunner::new(|cmd| {
            if cmd.program == "genhtml" {
                Ok(exit_with_stdout(1, "genhtml: ERROR: cannot read /h/a/main.c\n"))
            } else {
                Ok(exit(0))
            }
        });

        let err = CoveragePipeline::new(&runner, &config, root)
            .run(&[a], &[])
            .unwrap_err();
        let err = err.downcast_ref::<HostcovError>().unwrap();
        assert!(matches!(err, HostcovError::ReportFailure { .. }));
        assert_eq!(
            err.tool_output(),
            Some("genhtml: ERROR: cannot read /h/a/main.c")
        );
        // Summary is still written before the report is rendered
        assert!(root.join("coverage/summary.txt").exists());
    }
}
