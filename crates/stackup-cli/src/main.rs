//! stackup CLI
//!
//! Main entry point for the `stackup` binary.

use std::process::ExitCode;

use clap::Parser;
use stackup_cli::cli::Cli;
use stackup_cli::error::formatter::stderr_color;
use stackup_cli::error::{CliError, ErrorFormatter};
use stackup_common_config::Environment;
use stackup_common_log::{LogConfig, LogLevel};

fn main() -> ExitCode {
    // `.env` must be loaded before clap reads `STACKUP_CONFIG`.
    let _env = Environment::init();
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: LogLevel::from_verbosity(cli.verbose, cli.quiet),
        ..LogConfig::default()
    }
    .with_env_overrides();
    if let Err(e) = stackup_common_log::init(log_config) {
        eprintln!("warning: {e}");
    }

    let formatter = ErrorFormatter::new()
        .color(stderr_color())
        .verbose(cli.verbose > 0);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = CliError::from(e);
            formatter.print(&err);
            return err.exit_code();
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            formatter.print(&e);
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.load_config()?;
    cli.execute(config).await
}
