//! Tool detection and validation
//!
//! The pipeline shells out to `idf.py`, `lcov` and `genhtml`. Each command
//! checks the tools it needs up front so a missing toolchain is reported once,
//! with an install hint, instead of as a failure halfway through a run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use which::which;

use crate::error::{hints, HostcovError};
use crate::exec::{ToolCommand, ToolRunner};

/// Tool detection result
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Tool name as configured
    pub name: String,
    /// Path to the tool executable
    pub path: PathBuf,
}

/// Check if a tool exists and return its information
pub fn check_tool(tool_name: &str) -> Option<ToolInfo> {
    which(tool_name).ok().map(|path| ToolInfo {
        name: tool_name.to_string(),
        path,
    })
}

/// First line of `tool --version`, if the tool answers
pub fn tool_version(runner: &dyn ToolRunner, tool_name: &str, cwd: &Path) -> Option<String> {
    let cmd = ToolCommand::new(tool_name, cwd).arg("--version");
    match runner.run(&cmd) {
        Ok(result) if result.success => result
            .combined_output()
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Require a tool to exist, return error with hint if missing
pub fn require_tool(tool_name: &str, required_for: &str) -> Result<ToolInfo> {
    match check_tool(tool_name) {
        Some(info) => Ok(info),
        None => Err(HostcovError::missing_tool(tool_name, required_for, tool_hint(tool_name)).into()),
    }
}

/// Get installation hint for a tool
fn tool_hint(tool_name: &str) -> &'static str {
    let base = Path::new(tool_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(tool_name);
    match base {
        "idf.py" => hints::idf(),
        "lcov" | "genhtml" => hints::lcov(),
        _ => "Install this tool and ensure it's in your PATH",
    }
}
