//! I/O adapters for autocommit commands.

pub mod config;
pub mod git;
pub mod github;
pub mod process;
