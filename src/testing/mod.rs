//! Host-test pipeline
//!
//! - Project discovery and test-binary lookup
//! - Ignore-pattern loading
//! - Per-project build/run driver and result aggregation
//! - lcov capture, filtering, merge and HTML rendering
//! - Coverage summary extraction

pub mod coverage;
pub mod discovery;
pub mod ignore;
pub mod results;
pub mod runner;
pub mod summary;

pub use coverage::CoveragePipeline;
pub use discovery::{select_projects, Project, ProjectDiscovery};
pub use ignore::load_ignore_patterns;
pub use results::RunSummary;
pub use runner::{clean_build_from_env, ProjectRunner};
