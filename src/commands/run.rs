//! Run command implementation: test, then coverage

use anyhow::Result;
use clap::Args;

use super::coverage::{generate_coverage, CoverageOptions};
use super::test::{run_tests, TestOptions};
use super::{ProjectFilter, Session};

/// Build and run all projects, then generate the coverage report
#[derive(Args, Debug)]
pub struct RunCommand {
    #[command(flatten)]
    pub filter: ProjectFilter,

    #[command(flatten)]
    pub test: TestOptions,

    #[command(flatten)]
    pub coverage: CoverageOptions,
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(self, session: &Session) -> Result<()> {
        run_tests(session, &self.filter, &self.test)?;
        println!();
        generate_coverage(session, &self.filter, &self.coverage)
    }
}
