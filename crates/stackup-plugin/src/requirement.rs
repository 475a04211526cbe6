//! Plugin requirement types
//!
//! A requirement names a plugin a program needs before it can run. It is
//! produced by the language runtime and never modified afterwards.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};

/// Kind of plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Cloud resource provider
    Resource,
    /// Language host
    Language,
    /// Policy analyzer
    Analyzer,
    /// Auxiliary tool
    Tool,
}

impl PluginKind {
    /// All kinds, in display order.
    pub const ALL: [PluginKind; 4] = [
        PluginKind::Resource,
        PluginKind::Language,
        PluginKind::Analyzer,
        PluginKind::Tool,
    ];

    /// Lowercase name used in labels, URLs and cache directories.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Resource => "resource",
            PluginKind::Language => "language",
            PluginKind::Analyzer => "analyzer",
            PluginKind::Tool => "tool",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a plugin kind is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plugin kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for PluginKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A declared need for a plugin.
///
/// Matching is keyed by `(kind, name)`. The version only constrains the
/// match when it is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequirement {
    /// Plugin name, e.g. `aws`
    pub name: String,

    /// Plugin kind
    pub kind: PluginKind,

    /// Pinned version
    #[serde(default)]
    pub version: Option<Version>,

    /// Server to download from instead of the default one
    #[serde(default, rename = "server", alias = "download_url")]
    pub download_url: Option<String>,
}

impl PluginRequirement {
    /// Create an unpinned requirement.
    pub fn new(kind: PluginKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            version: None,
            download_url: None,
        }
    }

    /// Pin the requirement to a version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Fetch from a specific server.
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    /// Whether a version is pinned.
    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }

    /// Identity used in messages and errors.
    pub fn label(&self) -> PluginLabel {
        PluginLabel {
            kind: self.kind,
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    /// Name of the cache directory holding this plugin.
    pub fn dir_name(&self) -> String {
        match &self.version {
            Some(v) => format!("{}-{}-v{}", self.kind, self.name, v),
            None => format!("{}-{}", self.kind, self.name),
        }
    }

    /// Name of the release archive for a platform.
    pub fn archive_name(&self, platform: &Platform) -> String {
        let version = match &self.version {
            Some(v) => format!("v{v}"),
            None => "latest".to_string(),
        };
        format!(
            "pulumi-{}-{}-{}-{}-{}.tar.gz",
            self.kind, self.name, version, platform.os, platform.arch
        )
    }

    /// Resolve the URL to fetch this plugin from.
    ///
    /// `download_url` overrides `default_base` as the server; the archive
    /// name is always appended.
    pub fn download_url(&self, default_base: &str, platform: &Platform) -> String {
        let base = self.download_url.as_deref().unwrap_or(default_base);
        format!("{}/{}", base.trim_end_matches('/'), self.archive_name(platform))
    }
}

/// Identity of a requirement: kind, name and optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginLabel {
    pub kind: PluginKind,
    pub name: String,
    pub version: Option<Version>,
}

impl PluginLabel {
    /// Version string, or `unspecified` when unpinned.
    pub fn version_or_unspecified(&self) -> String {
        self.version
            .as_ref()
            .map(Version::to_string)
            .unwrap_or_else(|| "unspecified".to_string())
    }
}

impl fmt::Display for PluginLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} plugin {}-{}", self.kind, self.name, v),
            None => write!(f, "{} plugin {}", self.kind, self.name),
        }
    }
}

/// Operating system and architecture names used in archive names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Translate Rust target names to release names.
    pub fn from_rust(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }
}
