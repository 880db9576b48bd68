//! Shared helpers for paths, tool lookup and terminal output

pub mod paths;
pub mod terminal;
pub mod tools;
