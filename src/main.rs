//! hostcov - host-side build, test and coverage orchestration
//!
//! Runs every ESP-IDF host test project under a root directory and merges
//! their coverage into a single lcov report.
//!
//! ## Architecture
//!
//! ```text
//! discovery → (per project) idf.py build → test binary → lcov capture/remove
//!           → lcov merge → lcov --summary / genhtml
//! ```

mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod testing;
mod utils;

use std::process::ExitCode;

use clap::Parser;

use cli::Cli;
use error::HostcovError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<HostcovError>() {
                Some(e) => e.display_with_hints(),
                None => utils::terminal::print_error(&format!("{:#}", err)),
            }
            ExitCode::FAILURE
        }
    }
}
