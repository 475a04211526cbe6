//! Local plugin cache
//!
//! Installed plugins live in one directory each under the cache root:
//! ```text
//! ~/.stackup/plugins/
//! ├── resource-aws-v6.1.0/
//! ├── resource-aws-v5.4.0/
//! ├── language-python/
//! └── .tmp-3kf9a/          (in-flight install, ignored)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;
use stackup_common_fs::FsError;
use tracing::warn;

use crate::requirement::{PluginKind, PluginRequirement};

/// Lookup capability over installed plugins.
pub trait PluginCache: Send + Sync {
    /// Whether `(kind, name)` is installed at exactly `version`.
    fn has_exact(&self, kind: PluginKind, name: &str, version: &Version) -> bool;

    /// Whether `(kind, name)` is installed at `floor` or newer.
    ///
    /// With no floor any installed entry qualifies, including one installed
    /// without a version.
    fn has_at_least(&self, kind: PluginKind, name: &str, floor: Option<&Version>) -> bool;
}

/// One installed plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub kind: PluginKind,
    pub name: String,
    pub version: Option<Version>,
    pub path: PathBuf,
}

impl CacheEntry {
    /// Parse a cache directory name such as `resource-aws-v6.1.0`.
    pub fn parse(dir_name: &str, path: PathBuf) -> Option<Self> {
        if dir_name.starts_with('.') {
            return None;
        }

        let (kind, rest) = dir_name.split_once('-')?;
        let kind = kind.parse::<PluginKind>().ok()?;

        // Names may contain `-v`, so take the first split whose tail is a version.
        let versioned = rest.match_indices("-v").find_map(|(idx, _)| {
            let name = &rest[..idx];
            let version = Version::parse(&rest[idx + 2..]).ok()?;
            (!name.is_empty()).then(|| (name.to_string(), version))
        });

        let (name, version) = match versioned {
            Some((name, version)) => (name, Some(version)),
            None if !rest.is_empty() => (rest.to_string(), None),
            None => return None,
        };

        Some(Self {
            kind,
            name,
            version,
            path,
        })
    }
}

/// Plugin cache backed by a directory.
#[derive(Debug, Clone)]
pub struct DirPluginCache {
    root: PathBuf,
}

impl DirPluginCache {
    /// Create a cache rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a requirement installs into.
    pub fn path_for(&self, req: &PluginRequirement) -> PathBuf {
        self.root.join(req.dir_name())
    }

    /// List installed plugins. A missing root is an empty cache.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, FsError> {
        let inspect = |source: io::Error| FsError::Inspect {
            path: self.root.clone(),
            source,
        };

        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(inspect(e)),
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry.map_err(inspect)?;
            if !entry.file_type().map_err(inspect)?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(dir_name) = file_name.to_str() else {
                continue;
            };
            if let Some(parsed) = CacheEntry::parse(dir_name, entry.path()) {
                entries.push(parsed);
            }
        }

        entries.sort_by(|a, b| {
            (a.kind, &a.name, &a.version).cmp(&(b.kind, &b.name, &b.version))
        });
        Ok(entries)
    }

    /// Installed entries for one plugin, oldest first.
    pub fn find(&self, kind: PluginKind, name: &str) -> Vec<CacheEntry> {
        match self.entries() {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| e.kind == kind && e.name == name)
                .collect(),
            Err(e) => {
                warn!(error = %e, "could not read plugin cache, treating it as empty");
                Vec::new()
            }
        }
    }
}

impl PluginCache for DirPluginCache {
    fn has_exact(&self, kind: PluginKind, name: &str, version: &Version) -> bool {
        self.find(kind, name)
            .iter()
            .any(|e| e.version.as_ref() == Some(version))
    }

    fn has_at_least(&self, kind: PluginKind, name: &str, floor: Option<&Version>) -> bool {
        let entries = self.find(kind, name);
        match floor {
            None => !entries.is_empty(),
            Some(floor) => entries
                .iter()
                .any(|e| e.version.as_ref().is_some_and(|v| v >= floor)),
        }
    }
}
