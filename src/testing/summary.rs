//! Coverage summary extraction and the persisted summary file
//!
//! `lcov --summary` output is passed through verbatim except for filtering:
//! only the `lines` / `functions` percentage lines are kept. The one number
//! read back out is the unified line percentage, for `--fail-under`.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::exec::{ToolCommand, ToolRunner};
use crate::utils::terminal::banner;

/// Label of the merged dataset's section
pub const UNIFIED_LABEL: &str = "UNIFIED REPORT";

/// Title line of the summary file
const SUMMARY_TITLE: &str = "Host Test Coverage Summary";

/// Keep coverage-percentage lines, trimmed
pub fn extract_summary_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains(':') && (line.contains("lines") || line.contains("functions")))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Line coverage percentage from extracted summary lines
pub fn line_coverage_percent(lines: &[String]) -> Option<f64> {
    static LINES_RE: OnceLock<Regex> = OnceLock::new();
    let re = LINES_RE.get_or_init(|| {
        Regex::new(r"^lines\.*\s*:\s*([0-9]+(?:\.[0-9]+)?)%").expect("valid regex")
    });

    lines
        .iter()
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps[1].parse().ok())
}

/// One labelled block of the summary
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySection {
    pub label: String,
    /// `None` when the summarizer could not produce output
    pub lines: Option<Vec<String>>,
}

impl SummarySection {
    pub fn available(label: &str, lines: Vec<String>) -> Self {
        Self {
            label: label.to_string(),
            lines: Some(lines),
        }
    }

    pub fn unavailable(label: &str) -> Self {
        Self {
            label: label.to_string(),
            lines: None,
        }
    }

    pub fn line_percent(&self) -> Option<f64> {
        self.lines.as_deref().and_then(line_coverage_percent)
    }

    /// Text block shared by console and file, without the trailing blank line
    pub fn render(&self) -> String {
        let mut out = String::new();
        match &self.lines {
            Some(lines) => {
                let _ = writeln!(out, "{}:", self.label);
                for line in lines {
                    let _ = writeln!(out, "  {}", line);
                }
            }
            None => {
                let _ = writeln!(out, "  Summary not available for {}", self.label);
            }
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

/// Run the summarizer on `dataset` and print the result. Never fails.
pub fn summarize(
    runner: &dyn ToolRunner,
    lcov: &str,
    dataset: &Path,
    label: &str,
    cwd: &Path,
) -> SummarySection {
    let cmd = ToolCommand::new(lcov, cwd)
        .arg("--summary")
        .path_arg(dataset)
        .args(["--ignore-errors", "gcov"]);

    let section = match runner.run(&cmd) {
        Ok(result) if result.success => {
            SummarySection::available(label, extract_summary_lines(&result.combined_output()))
        }
        _ => SummarySection::unavailable(label),
    };
    section.print();
    section
}

/// Summary file contents, kept in memory and written once per run
#[derive(Debug, Clone)]
pub struct SummaryReport {
    generated: String,
    sections: Vec<SummarySection>,
}

impl SummaryReport {
    pub fn new() -> Self {
        Self {
            generated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add(&mut self, section: SummarySection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "{}\nGenerated: {}\n\n",
            banner(SUMMARY_TITLE),
            self.generated
        );
        for section in &self.sections {
            out.push_str(&section.render());
            out.push('\n');
        }
        out
    }

    /// Write the summary file, replacing any previous one
    pub fn persist(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write summary to {}", path.display()))
    }
}

impl Default for SummaryReport {
    fn default() -> Self {
        Self::new()
    }
}
