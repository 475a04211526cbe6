//! Drives one install run: dependencies first, then each required plugin.

use std::path::PathBuf;

use stackup_common_log::spans::plugin_span;
use tracing::{debug, info, warn, Instrument};

use crate::cache::DirPluginCache;
use crate::download::{RetryingDownloader, Transport};
use crate::error::{InstallError, Result};
use crate::installer::{sweep_staging, Placement, PluginInstaller};
use crate::matcher::{Satisfaction, VersionMatcher};
use crate::observer::InstallObserver;
use crate::requirement::{PluginLabel, PluginRequirement};
use crate::runtime::{LanguageRuntime, ProgramInfo};

/// Toggles for an install run. All combinations are valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Do not run the runtime's dependency install
    pub skip_dependencies: bool,
    /// Do not install plugins
    pub skip_plugins: bool,
    /// Reinstall plugins even when already present
    pub force: bool,
    /// Let the runtime use version managers when installing dependencies
    pub use_version_tools: bool,
}

/// What happened to one requirement in a successful step.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    /// Already present in the cache
    Skipped(Satisfaction),
    /// Downloaded and placed at `path`
    Installed { path: PathBuf, bytes: u64 },
    /// Downloaded, but `path` appeared in the meantime and was kept
    KeptExisting { path: PathBuf },
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallReport {
    /// Whether the dependency install ran
    pub dependencies_installed: bool,
    /// Requirements in the order they were processed
    pub outcomes: Vec<(PluginLabel, InstallOutcome)>,
    /// Downloads attempted
    pub downloads: usize,
}

impl InstallReport {
    /// Requirements left as they were, whether found before or after download.
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.installed()
    }

    pub fn installed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, InstallOutcome::Installed { .. }))
            .count()
    }
}

/// Run the runtime's dependency install unless `options` skips it.
///
/// Returns whether the install ran.
pub async fn install_dependencies(
    runtime: &dyn LanguageRuntime,
    program: &ProgramInfo,
    options: InstallOptions,
) -> Result<bool> {
    if options.skip_dependencies {
        debug!("skipping dependency install");
        return Ok(false);
    }

    info!(runtime = %program.runtime, root = %program.root.display(), "installing dependencies");
    runtime
        .install_dependencies(program, options.use_version_tools)
        .await
        .map_err(InstallError::dependency_install)?;
    Ok(true)
}

/// Installs everything a program needs.
///
/// Requirements are handled one at a time in the order the runtime lists
/// them. The first failure ends the run.
pub struct InstallOrchestrator<T> {
    downloader: RetryingDownloader<T>,
    installer: PluginInstaller,
}

impl<T: Transport> InstallOrchestrator<T> {
    pub fn new(downloader: RetryingDownloader<T>, installer: PluginInstaller) -> Self {
        Self {
            downloader,
            installer,
        }
    }

    pub fn cache(&self) -> &DirPluginCache {
        self.installer.cache()
    }

    /// Install dependencies and plugins for `program`.
    pub async fn run<O: InstallObserver>(
        &self,
        runtime: &dyn LanguageRuntime,
        program: &ProgramInfo,
        options: InstallOptions,
        observer: &O,
    ) -> Result<InstallReport> {
        let mut report = InstallReport {
            dependencies_installed: install_dependencies(runtime, program, options).await?,
            ..InstallReport::default()
        };

        if options.skip_plugins {
            debug!("skipping plugin install");
            return Ok(report);
        }

        let requirements = runtime
            .required_plugins(program)
            .await
            .map_err(InstallError::plugin_lookup)?;
        debug!(count = requirements.len(), "required plugins");

        if let Err(e) = sweep_staging(self.cache().root()) {
            warn!(error = %e, "could not clear leftover staging directories");
        }

        let matcher = VersionMatcher::new(options.force);
        for req in &requirements {
            let label = req.label();
            let version = req.version.as_ref().map(ToString::to_string);
            let span = plugin_span(req.kind.as_str(), &req.name, version.as_deref());

            let outcome = self
                .install_one(req, &label, &matcher, options.force, &mut report, observer)
                .instrument(span)
                .await;

            match outcome {
                Ok(outcome) => report.outcomes.push((label, outcome)),
                Err(e) => {
                    observer.on_failed(&label, &e);
                    return Err(e);
                }
            }
        }

        Ok(report)
    }

    async fn install_one<O: InstallObserver>(
        &self,
        req: &PluginRequirement,
        label: &PluginLabel,
        matcher: &VersionMatcher,
        force: bool,
        report: &mut InstallReport,
        observer: &O,
    ) -> Result<InstallOutcome> {
        if let Some(reason) = matcher.check(req, self.cache()) {
            match reason {
                Satisfaction::Exact => debug!("{label} skipping install (existing == match)"),
                Satisfaction::AtLeast => debug!("{label} skipping install (existing >= match)"),
            }
            observer.on_skipped(label, reason);
            return Ok(InstallOutcome::Skipped(reason));
        }

        let url = self.downloader.url_for(req);
        info!(url = %url, "installing {label}");
        observer.on_installing(label, &url);

        report.downloads += 1;
        let artifact = self
            .downloader
            .fetch(req, observer, observer)
            .await
            .map_err(InstallError::download)?;
        let bytes = artifact.len();

        match self.installer.install(req, artifact, force, observer).await? {
            Placement::Installed(path) => {
                info!(path = %path.display(), bytes, "installed {label}");
                observer.on_installed(label, &path);
                Ok(InstallOutcome::Installed { path, bytes })
            }
            Placement::KeptExisting(path) => {
                info!(path = %path.display(), "{label} already present, download discarded");
                observer.on_kept(label, &path);
                Ok(InstallOutcome::KeptExisting { path })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let label = |name: &str| PluginRequirement::new(crate::PluginKind::Resource, name).label();
        let report = InstallReport {
            dependencies_installed: true,
            outcomes: vec![
                (label("a"), InstallOutcome::Skipped(Satisfaction::Exact)),
                (
                    label("b"),
                    InstallOutcome::Installed {
                        path: PathBuf::from("/cache/resource-b"),
                        bytes: 10,
                    },
                ),
                (label("c"), InstallOutcome::Skipped(Satisfaction::AtLeast)),
                (
                    label("d"),
                    InstallOutcome::KeptExisting {
                        path: PathBuf::from("/cache/resource-d"),
                    },
                ),
            ],
            downloads: 2,
        };

        assert_eq!(report.skipped(), 3);
        assert_eq!(report.installed(), 1);
    }

    #[test]
    fn test_default_options_are_all_off() {
        let options = InstallOptions::default();
        assert!(!options.skip_dependencies);
        assert!(!options.skip_plugins);
        assert!(!options.force);
        assert!(!options.use_version_tools);
    }
}
