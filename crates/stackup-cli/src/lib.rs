//! stackup CLI library
//!
//! Argument parsing, the `install` command and its terminal output.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod project;

pub use error::CliError;
