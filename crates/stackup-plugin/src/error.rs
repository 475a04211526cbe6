//! Install errors.

use std::error::Error as StdError;
use std::fmt;

use stackup_common_fs::FsError;

use crate::archive::ExtractError;
use crate::download::DownloadError;
use crate::requirement::PluginLabel;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for install operations
pub type Result<T> = std::result::Result<T, InstallError>;

/// Step of an install run that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Looking up project or policy pack markers
    ContextResolution,
    /// The language runtime's dependency install
    DependencyInstall,
    /// Asking the language runtime for required plugins
    PluginLookup,
    /// Fetching a plugin archive
    Download,
    /// Extracting a plugin into the cache
    Install,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ContextResolution => "context resolution",
            Self::DependencyInstall => "dependency install",
            Self::PluginLookup => "plugin lookup",
            Self::Download => "download",
            Self::Install => "install",
        })
    }
}

/// A fatal install failure, tagged with the stage and plugin it belongs to.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", describe(.stage, .plugin))]
pub struct InstallError {
    stage: InstallStage,
    plugin: Option<PluginLabel>,
    #[source]
    source: BoxError,
}

impl InstallError {
    /// Marker lookup failed for a reason other than absence.
    pub fn context_resolution(source: FsError) -> Self {
        Self {
            stage: InstallStage::ContextResolution,
            plugin: None,
            source: source.into(),
        }
    }

    /// The runtime could not install the program's dependencies.
    pub fn dependency_install(source: impl Into<BoxError>) -> Self {
        Self {
            stage: InstallStage::DependencyInstall,
            plugin: None,
            source: source.into(),
        }
    }

    /// The runtime could not report required plugins.
    pub fn plugin_lookup(source: impl Into<BoxError>) -> Self {
        Self {
            stage: InstallStage::PluginLookup,
            plugin: None,
            source: source.into(),
        }
    }

    /// Retries for a plugin download were exhausted.
    pub fn download(source: DownloadError) -> Self {
        Self {
            stage: InstallStage::Download,
            plugin: Some(source.plugin.clone()),
            source: source.into(),
        }
    }

    /// A plugin could not be placed into the cache.
    pub fn install(plugin: PluginLabel, source: ExtractError) -> Self {
        Self {
            stage: InstallStage::Install,
            plugin: Some(plugin),
            source: source.into(),
        }
    }

    /// Stage that failed.
    pub fn stage(&self) -> InstallStage {
        self.stage
    }

    /// Plugin being processed, if the failure belongs to one.
    pub fn plugin(&self) -> Option<&PluginLabel> {
        self.plugin.as_ref()
    }

    /// Underlying cause, for downcasting.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

fn describe(stage: &InstallStage, plugin: &Option<PluginLabel>) -> String {
    match (stage, plugin) {
        (InstallStage::ContextResolution, _) => "resolving install target".to_string(),
        (InstallStage::DependencyInstall, _) => "installing dependencies".to_string(),
        (InstallStage::PluginLookup, _) => "determining required plugins".to_string(),
        (InstallStage::Download, Some(plugin)) => format!("downloading {plugin}"),
        (InstallStage::Install, Some(plugin)) => format!("installing {plugin}"),
        (stage, None) => stage.to_string(),
    }
}
