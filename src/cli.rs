//! CLI argument parsing using clap derive macros

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    coverage::CoverageCommand, run::RunCommand, test::TestCommand, Session,
};

/// hostcov - host test and coverage runner
///
/// Builds and runs every ESP-IDF host test project under a root directory,
/// then merges their lcov coverage into one report.
#[derive(Parser, Debug)]
#[command(name = "hostcov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Host test root directory (defaults to the current directory)
    #[arg(short, long, global = true, env = "HOSTCOV_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and run every host test project
    Test(TestCommand),

    /// Capture, merge and render coverage for built projects
    Coverage(CoverageCommand),

    /// Test, then generate coverage
    Run(RunCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        if self.no_color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        let session = Session::load(self.root.as_deref(), self.verbose)?;

        match self.command {
            Commands::Test(cmd) => cmd.execute(&session),
            Commands::Coverage(cmd) => cmd.execute(&session),
            Commands::Run(cmd) => cmd.execute(&session),
        }
    }
}
