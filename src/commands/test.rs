//! Test command implementation

use anyhow::Result;
use clap::Args;

use super::{ProjectFilter, Session};
use crate::error::HostcovError;
use crate::exec::SystemRunner;
use crate::testing::results::ProjectStatus;
use crate::testing::{clean_build_from_env, ProjectRunner, RunSummary};
use crate::utils::terminal::{print_success, print_warning};
use crate::utils::tools::{require_tool, tool_version};

/// Build-run options
#[derive(Args, Debug, Clone, Default)]
pub struct TestOptions {
    /// Delete build directories and re-run set-target first (also CLEAN_BUILD=1)
    #[arg(long)]
    pub clean: bool,

    /// Continue with the remaining projects after a failure
    #[arg(long)]
    pub keep_going: bool,
}

/// Build and run every host test project
#[derive(Args, Debug)]
pub struct TestCommand {
    #[command(flatten)]
    pub filter: ProjectFilter,

    #[command(flatten)]
    pub options: TestOptions,
}

impl TestCommand {
    /// Execute the test command
    pub fn execute(self, session: &Session) -> Result<()> {
        run_tests(session, &self.filter, &self.options)
    }
}

/// Build and run the selected projects in name order
pub fn run_tests(session: &Session, filter: &ProjectFilter, options: &TestOptions) -> Result<()> {
    let tools = &session.config.tools;
    let info = require_tool(&tools.idf, "building host tests")?;

    let runner = SystemRunner::new(session.verbose);
    if session.verbose {
        if let Some(version) = tool_version(&runner, &tools.idf, &session.root) {
            eprintln!("Using {} at {} ({})", info.name, info.path.display(), version);
        }
    }

    let projects = session.projects(filter)?;
    if projects.is_empty() {
        print_warning(&format!(
            "No test projects found in {}",
            session.root.display()
        ));
        return Ok(());
    }

    let clean = options.clean || clean_build_from_env();
    let project_runner = ProjectRunner::new(&runner, tools, clean);
    let mut summary = RunSummary::new();

    for project in &projects {
        let result = project_runner.run(project);
        if result.status == ProjectStatus::Failed {
            if !options.keep_going {
                if let Some(err) = result.into_error() {
                    return Err(err);
                }
                continue;
            }
            if let Some(err) = result.error() {
                err.display_with_hints();
            }
        }
        summary.add(result);
    }

    if options.keep_going {
        summary.print_summary();
    }

    if !summary.all_passed() {
        return Err(HostcovError::ProjectsFailed {
            failed: summary.failed_names(),
            total: summary.results.len(),
        }
        .into());
    }

    println!();
    print_success(&format!("{} project(s) built and passed", summary.passed_count()));
    Ok(())
}
