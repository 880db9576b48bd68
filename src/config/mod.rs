//! Configuration loading

mod hostcov_toml;
mod validation;

pub use hostcov_toml::{HostcovConfig, ToolsConfig};
pub use validation::validate_threshold;
