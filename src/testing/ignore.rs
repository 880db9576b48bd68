//! Coverage ignore patterns
//!
//! One lcov `--remove` glob per line. Blank lines and `#` comments are
//! skipped. A missing file means no filtering.

use std::io;
use std::path::Path;

use crate::utils::terminal::print_warning;

/// Load patterns from `path`; never fails
pub fn load_ignore_patterns(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_ignore_patterns(&content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            print_warning(&format!(
                "Ignoring unreadable pattern file {}: {}",
                path.display(),
                e
            ));
            Vec::new()
        }
    }
}

pub fn parse_ignore_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
