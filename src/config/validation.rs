//! Configuration validation with helpful error messages

use anyhow::Result;

use super::HostcovConfig;
use crate::error::HostcovError;

/// Validate a parsed configuration
pub fn validate_config(config: &HostcovConfig) -> Result<()> {
    validate_file_name("discovery.descriptor", &config.discovery.descriptor)?;
    validate_file_name("discovery.build_dir", &config.discovery.build_dir)?;

    for name in &config.discovery.exclude {
        validate_file_name("discovery.exclude", name)?;
    }

    for (key, value) in [
        ("tools.idf", &config.tools.idf),
        ("tools.target", &config.tools.target),
        ("tools.lcov", &config.tools.lcov),
        ("tools.genhtml", &config.tools.genhtml),
        ("coverage.output_dir", &config.coverage.output_dir),
        ("coverage.ignore_file", &config.coverage.ignore_file),
    ] {
        if value.trim().is_empty() {
            return Err(empty_value(key));
        }
    }

    if let Some(threshold) = config.coverage.fail_under {
        validate_threshold(threshold)?;
    }

    Ok(())
}

/// Thresholds are percentages
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(HostcovError::config_error_with_hint(
            format!("fail_under must be between 0 and 100, got {}", threshold),
            None,
            "Use a percentage such as fail_under = 80.0",
        )
        .into());
    }
    Ok(())
}

/// Names matched against single directory entries must not contain separators
fn validate_file_name(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(empty_value(key));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(HostcovError::config_error_with_hint(
            format!("{} must be a plain file name, got '{}'", key, value),
            None,
            "Discovery only looks at immediate children of each directory",
        )
        .into());
    }
    Ok(())
}

fn empty_value(key: &str) -> anyhow::Error {
    HostcovError::config_error(format!("{} must not be empty", key)).into()
}
