//! Command implementations
//!
//! Each command module provides a clap-derived struct and execute method.

pub mod coverage;
pub mod run;
pub mod test;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use crate::config::HostcovConfig;
use crate::testing::{select_projects, Project, ProjectDiscovery};

/// Restrict a command to some projects
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Only process this project (repeatable)
    #[arg(short, long = "project", value_name = "NAME")]
    pub projects: Vec<String>,
}

/// Root directory, configuration and global flags shared by all commands
#[derive(Debug, Clone)]
pub struct Session {
    pub root: PathBuf,
    pub config: HostcovConfig,
    pub verbose: bool,
}

impl Session {
    /// Resolve the root and load its hostcov.toml
    pub fn load(root: Option<&Path>, verbose: bool) -> Result<Self> {
        let root = crate::utils::paths::resolve_root(root)?;
        let config = HostcovConfig::load_from_root(&root)?;
        Ok(Self {
            root,
            config,
            verbose,
        })
    }

    /// Discover projects and apply the filter
    pub fn projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let denylist = self.config.denylist();
        let discovery = ProjectDiscovery::new(
            &self.config.discovery.descriptor,
            &self.config.discovery.build_dir,
            &denylist,
        );
        let projects = discovery.discover(&self.root)?;

        if self.verbose {
            eprintln!(
                "Discovered {} project(s) in {}",
                projects.len(),
                self.root.display()
            );
        }

        select_projects(projects, &filter.projects)
    }
}
