//! Coverage command implementation

use anyhow::Result;
use clap::Args;

use super::{ProjectFilter, Session};
use crate::config::validate_threshold;
use crate::error::HostcovError;
use crate::exec::SystemRunner;
use crate::testing::coverage::CoverageOutcome;
use crate::testing::{load_ignore_patterns, CoveragePipeline};
use crate::utils::paths::file_url;
use crate::utils::terminal::print_warning;
use crate::utils::tools::{require_tool, tool_version};

/// Report options
#[derive(Args, Debug, Clone, Default)]
pub struct CoverageOptions {
    /// Open the HTML report in the default browser
    #[arg(long)]
    pub open: bool,

    /// Fail when unified line coverage is below PERCENT
    #[arg(long, value_name = "PERCENT")]
    pub fail_under: Option<f64>,
}

/// Capture, merge and report coverage of already-run projects
#[derive(Args, Debug)]
pub struct CoverageCommand {
    #[command(flatten)]
    pub filter: ProjectFilter,

    #[command(flatten)]
    pub options: CoverageOptions,
}

impl CoverageCommand {
    /// Execute the coverage command
    pub fn execute(self, session: &Session) -> Result<()> {
        generate_coverage(session, &self.filter, &self.options)
    }
}

/// Run the coverage pipeline and the post-report steps
pub fn generate_coverage(
    session: &Session,
    filter: &ProjectFilter,
    options: &CoverageOptions,
) -> Result<()> {
    let threshold = options.fail_under.or(session.config.coverage.fail_under);
    if let Some(threshold) = threshold {
        validate_threshold(threshold)?;
    }

    let tools = &session.config.tools;
    let lcov = require_tool(&tools.lcov, "coverage capture")?;
    require_tool(&tools.genhtml, "HTML report generation")?;

    let runner = SystemRunner::new(session.verbose);
    if session.verbose {
        if let Some(version) = tool_version(&runner, &tools.lcov, &session.root) {
            eprintln!("Using {} at {} ({})", lcov.name, lcov.path.display(), version);
        }
    }

    let projects = session.projects(filter)?;
    let ignore_file = session.config.ignore_file(&session.root);
    let patterns = load_ignore_patterns(&ignore_file);
    if session.verbose {
        eprintln!(
            "Loaded {} ignore pattern(s) from {}",
            patterns.len(),
            ignore_file.display()
        );
    }

    let pipeline = CoveragePipeline::new(&runner, &session.config, &session.root)
        .verbose(session.verbose);
    let outcome = pipeline.run(&projects, &patterns)?;

    if session.verbose {
        eprintln!("Merged {} tracefile(s):", outcome.merged.len());
        for tracefile in &outcome.merged {
            eprintln!("  {}", tracefile.display());
        }
    }

    println!(
        "\nSuccess! Full report available at: {}",
        file_url(&outcome.html_index)
    );
    println!(
        "Text summary available at: {}",
        pipeline.paths().summary.display()
    );

    if options.open {
        open_report(&outcome);
    }

    if let Some(threshold) = threshold {
        check_threshold(&outcome, threshold)?;
    }

    Ok(())
}

fn open_report(outcome: &CoverageOutcome) {
    let url = file_url(&outcome.html_index);
    println!("\nOpening report in browser...");
    if let Err(e) = open::that(&url) {
        print_warning(&format!("Failed to open browser: {}", e));
        println!("You can manually open: {}", url);
    }
}

fn check_threshold(outcome: &CoverageOutcome, threshold: f64) -> Result<()> {
    match outcome.unified.line_percent() {
        Some(actual) if actual >= threshold => Ok(()),
        Some(actual) => Err(HostcovError::BelowThreshold {
            actual: format!("{:.1}%", actual),
            threshold,
        }
        .into()),
        None => Err(HostcovError::BelowThreshold {
            actual: "unknown".to_string(),
            threshold,
        }
        .into()),
    }
}
