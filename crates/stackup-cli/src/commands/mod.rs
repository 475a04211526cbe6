//! Command implementations.

mod install;

pub use install::InstallCommand;
