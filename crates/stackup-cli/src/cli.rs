//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use stackup_common_config::{vars, ConfigLoader, StackupConfig};
use stackup_common_fs::path::absolutize;

use crate::commands::InstallCommand;
use crate::error::CliError;
use crate::output::Printer;

/// stackup - install a program's dependencies and plugins
#[derive(Debug, Parser)]
#[command(
    name = "stackup",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase verbosity level"
    )]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = vars::STACKUP_CONFIG,
        value_hint = ValueHint::FilePath,
        help = "Path to configuration file"
    )]
    pub config: Option<PathBuf>,

    /// Run as if started in this directory
    #[arg(
        short = 'C',
        long,
        global = true,
        value_hint = ValueHint::DirPath,
        help = "Run as if started in this directory"
    )]
    pub cwd: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install packages and plugins for the current program or policy pack
    Install(InstallCommand),
}

impl Cli {
    /// Load configuration from `--config` or the default location.
    pub fn load_config(&self) -> Result<StackupConfig, CliError> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::new(path),
            None => ConfigLoader::from_default_location()?,
        };
        tracing::debug!(path = %loader.path().display(), "loading configuration");
        Ok(loader.load()?)
    }

    /// Execute the selected command
    pub async fn execute(self, config: StackupConfig) -> Result<(), CliError> {
        let current = std::env::current_dir()
            .map_err(|e| CliError::io_with_path("Cannot read working directory", e, "."))?;
        let cwd = match &self.cwd {
            Some(dir) => absolutize(dir, &current),
            None => current,
        };

        let ctx = CommandContext {
            config,
            cwd,
            printer: Printer::new(self.quiet),
            verbose: self.verbose,
        };

        match self.command {
            Command::Install(cmd) => cmd.execute(&ctx).await,
        }
    }
}

/// Context passed to all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: StackupConfig,
    pub cwd: PathBuf,
    pub printer: Printer,
    pub verbose: u8,
}
