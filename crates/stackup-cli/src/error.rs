//! CLI error handling and formatting.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use stackup_plugin::{InstallError, InstallStage};
use thiserror::Error;

pub mod formatter;

pub use formatter::ErrorFormatter;

/// CLI error type with rich context
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    Manifest {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{0}")]
    Install(#[from] InstallError),

    #[error("{message}")]
    User {
        message: String,
        hint: Option<String>,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E001",
            Self::Io { .. } => "E002",
            Self::Manifest { .. } => "E003",
            Self::Install(e) => match e.stage() {
                InstallStage::ContextResolution => "E010",
                InstallStage::DependencyInstall => "E011",
                InstallStage::PluginLookup => "E012",
                InstallStage::Download => "E013",
                InstallStage::Install => "E014",
            },
            Self::User { .. } => "E020",
            Self::Other(_) => "E999",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            Self::Config { .. } => 2,
            Self::Io { .. } => 3,
            Self::Manifest { .. } => 5,
            Self::Install(e) => match e.stage() {
                InstallStage::ContextResolution => 3,
                InstallStage::Download => 4,
                InstallStage::DependencyInstall => 8,
                InstallStage::PluginLookup | InstallStage::Install => 1,
            },
            Self::User { .. } => 1,
            Self::Other(_) => 1,
        };
        ExitCode::from(code)
    }

    /// Get hint for this error if available
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } => hint.as_deref(),
            Self::User { hint, .. } => hint.as_deref(),
            Self::Install(e) if e.stage() == InstallStage::Download => {
                Some("Check your network connection or set plugins.download_base_url")
            }
            _ => None,
        }
    }

    /// Create an IO error with path
    pub fn io_with_path(
        message: impl Into<String>,
        source: io::Error,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source,
            path: Some(path.into()),
        }
    }

    /// Create a manifest error
    pub fn manifest(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Manifest {
            message: message.into(),
            path: path.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a user error with hint
    pub fn user_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            path: None,
        }
    }
}

impl From<stackup_common_config::ConfigError> for CliError {
    fn from(err: stackup_common_config::ConfigError) -> Self {
        Self::Config {
            message: format!("Configuration error: {err}"),
            source: Some(Box::new(err)),
            hint: Some("Check your stackup configuration file".to_string()),
        }
    }
}

impl From<stackup_common_http::HttpError> for CliError {
    fn from(err: stackup_common_http::HttpError) -> Self {
        Self::Config {
            message: format!("Could not set up HTTP client: {err}"),
            source: Some(Box::new(err)),
            hint: None,
        }
    }
}
