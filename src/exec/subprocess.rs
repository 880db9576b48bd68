//! Subprocess execution with explicit working directories
//!
//! Every external tool the pipeline drives goes through [`ToolRunner`], so the
//! stages never touch the process-wide current directory and can be exercised
//! in tests with a scripted runner.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

/// A fully described external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program name or path
    pub program: String,

    /// Arguments, in order
    pub args: Vec<String>,

    /// Working directory for the child process
    pub cwd: PathBuf,

    /// Pass stdout/stderr straight through to the terminal
    pub inherit_io: bool,
}

impl ToolCommand {
    /// Create a command that captures its output
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            inherit_io: false,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Let the child write directly to the terminal
    pub fn inherit_io(mut self) -> Self {
        self.inherit_io = true;
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a subprocess execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,

    /// Process exit code (-1 when terminated by a signal)
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl CommandResult {
    /// Create a CommandResult from an exit status
    pub fn from_status(
        status: ExitStatus,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
            duration,
        }
    }

    /// Stdout followed by stderr; lcov writes its summary to either stream
    /// depending on version
    pub fn combined_output(&self) -> String {
        let mut out = self.stdout.clone();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }

    /// Trimmed combined output, or `None` when the tool printed nothing
    pub fn diagnostics(&self) -> Option<String> {
        let output = self.combined_output();
        let trimmed = output.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Executes external tools. Errors mean the process could not be launched;
/// a non-zero exit is reported through [`CommandResult::success`].
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<CommandResult>;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn spawn(command: &ToolCommand, start: Instant) -> Result<CommandResult> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).current_dir(&command.cwd);

        if command.inherit_io {
            cmd.stdin(Stdio::inherit());
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());

            let status = cmd
                .status()
                .with_context(|| format!("Failed to execute {}", command.program))?;

            Ok(CommandResult::from_status(
                status,
                String::new(),
                String::new(),
                start.elapsed(),
            ))
        } else {
            let output = cmd
                .output()
                .with_context(|| format!("Failed to execute {}", command.program))?;

            Ok(CommandResult::from_status(
                output.status,
                String::from_utf8_lossy(&output.stdout).to_string(),
                String::from_utf8_lossy(&output.stderr).to_string(),
                start.elapsed(),
            ))
        }
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<CommandResult> {
        if self.verbose {
            eprintln!(
                "{} {} (in {})",
                console::style("$").dim(),
                command,
                command.cwd.display()
            );
        }

        let start = Instant::now();
        let result = Self::spawn(command, start)?;

        if self.verbose {
            eprintln!(
                "{} exit {} after {:.1}s",
                console::style("$").dim(),
                result.exit_code,
                result.duration.as_secs_f64()
            );
        }
        Ok(result)
    }
}
