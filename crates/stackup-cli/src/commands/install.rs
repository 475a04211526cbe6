//! Install command implementation.

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use stackup_common_config::StackupConfig;
use stackup_common_http::{ByteStream, HttpClient, HttpConfig, HttpError};
use stackup_common_log::spans::Timer;
use stackup_plugin::{
    install_dependencies, resolve_install_target, DirPluginCache, FsMarkerLocator, HttpTransport,
    InstallObserver, InstallOptions, InstallOrchestrator, PluginInstaller, PluginLabel,
    ProgressObserver, RetryObserver, RetryPolicy, RetryingDownloader, Satisfaction,
    WorkingContext,
};
use tracing::debug;

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::progress::DownloadProgress;
use crate::output::Printer;
use crate::project::{load_manifest, ManifestRuntime, PolicyPackManifest, ProjectManifest};

/// Install packages and plugins for the current program or policy pack
#[derive(Debug, Parser)]
pub struct InstallCommand {
    /// Reinstall plugins even if they already exist
    #[arg(long)]
    reinstall: bool,

    /// Skip installing plugins
    #[arg(long)]
    no_plugins: bool,

    /// Skip installing dependencies
    #[arg(long)]
    no_dependencies: bool,

    /// Let the language runtime use version managers such as pyenv or nvm
    #[arg(long)]
    use_language_version_tools: bool,
}

impl InstallCommand {
    /// Install toggles selected on the command line.
    pub fn options(&self) -> InstallOptions {
        InstallOptions {
            skip_dependencies: self.no_dependencies,
            skip_plugins: self.no_plugins,
            force: self.reinstall,
            use_version_tools: self.use_language_version_tools,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let timer = Timer::start("install");
        let options = self.options();

        match resolve_install_target(&FsMarkerLocator, &ctx.cwd)? {
            WorkingContext::PolicyPack(manifest) => {
                self.install_policy_pack(ctx, &manifest, options).await?
            }
            WorkingContext::Project(manifest) => {
                self.install_project(ctx, &manifest, options).await?
            }
            WorkingContext::None => {
                return Err(CliError::user_with_hint(
                    format!("no Pulumi.yaml project file found in {} or any parent", ctx.cwd.display()),
                    "run this command from a project or policy pack directory, or pass --cwd",
                ))
            }
        }

        timer.finish();
        Ok(())
    }

    async fn install_policy_pack(
        &self,
        ctx: &CommandContext,
        manifest_path: &Path,
        options: InstallOptions,
    ) -> Result<(), CliError> {
        debug!(manifest = %manifest_path.display(), "installing policy pack dependencies");
        let manifest: PolicyPackManifest = load_manifest(manifest_path)?;
        let program = manifest.program(manifest_path);

        if install_dependencies(&ManifestRuntime::default(), &program, options).await? {
            ctx.printer.status("Finished installing policy pack dependencies");
        }
        Ok(())
    }

    async fn install_project(
        &self,
        ctx: &CommandContext,
        manifest_path: &Path,
        options: InstallOptions,
    ) -> Result<(), CliError> {
        debug!(manifest = %manifest_path.display(), "installing project dependencies and plugins");
        let manifest: ProjectManifest = load_manifest(manifest_path)?;
        let program = manifest.program(manifest_path);
        let runtime = ManifestRuntime::new(manifest.plugins);

        let orchestrator = build_orchestrator(&ctx.config)?;
        let observer = CliObserver::new(ctx.printer, ctx.verbose);
        let report = orchestrator.run(&runtime, &program, options, &observer).await?;

        if report.dependencies_installed {
            ctx.printer.status("Finished installing dependencies");
        }
        if !options.skip_plugins {
            ctx.printer.status(format!(
                "Plugins: {} installed, {} already present",
                report.installed(),
                report.skipped()
            ));
        }
        Ok(())
    }
}

fn build_orchestrator(
    config: &StackupConfig,
) -> Result<InstallOrchestrator<HttpTransport>, CliError> {
    let client = HttpClient::with_config(HttpConfig {
        connect_timeout: Duration::from_secs(config.http.connect_timeout_secs),
        request_timeout: Duration::from_secs(config.http.request_timeout_secs),
        ..HttpConfig::default()
    })?;

    let policy = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        initial_delay: config.retry.initial_delay(),
        backoff_factor: config.retry.backoff_factor,
        max_delay: config.retry.max_delay(),
    };
    let downloader = RetryingDownloader::new(
        HttpTransport::new(client),
        config.plugins.download_base_url.clone(),
    )
    .with_policy(policy);

    let cache_dir = config.plugin_cache_dir()?;
    debug!(cache = %cache_dir.display(), "plugin cache");
    let installer = PluginInstaller::new(DirPluginCache::new(cache_dir));

    Ok(InstallOrchestrator::new(downloader, installer))
}

/// Reports install progress on stderr.
struct CliObserver {
    printer: Printer,
    progress: DownloadProgress,
    verbose: u8,
}

impl CliObserver {
    fn new(printer: Printer, verbose: u8) -> Self {
        Self {
            printer,
            progress: DownloadProgress::new(printer.is_quiet()),
            verbose,
        }
    }
}

impl ProgressObserver for CliObserver {
    fn wrap(&self, stream: ByteStream, expected: Option<u64>) -> ByteStream {
        self.progress.wrap(stream, expected)
    }
}

// Retry notices are already emitted as warnings by the downloader.
impl RetryObserver for CliObserver {
    fn on_retry(&self, _error: &HttpError, attempt: u32, limit: u32, delay: Duration) {
        debug!(attempt, limit, ?delay, "download retry scheduled");
    }
}

impl InstallObserver for CliObserver {
    fn on_skipped(&self, plugin: &PluginLabel, reason: Satisfaction) {
        if self.verbose > 0 {
            let how = match reason {
                Satisfaction::Exact => "already installed",
                Satisfaction::AtLeast => "already installed (any version accepted)",
            };
            self.printer.status(format!("{plugin} {how}"));
        }
    }

    fn on_installing(&self, plugin: &PluginLabel, url: &str) {
        self.printer.status(format!("Installing {plugin}..."));
        debug!(%url, "downloading");
    }

    fn on_installed(&self, plugin: &PluginLabel, path: &Path) {
        self.printer
            .status(format!("Installed {plugin} into {}", path.display()));
    }

    fn on_kept(&self, plugin: &PluginLabel, path: &Path) {
        self.printer
            .status(format!("{plugin} already present in {}, keeping it", path.display()));
    }
}
