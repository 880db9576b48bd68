//! External process execution

pub mod subprocess;

pub use subprocess::{CommandResult, SystemRunner, ToolCommand, ToolRunner};
