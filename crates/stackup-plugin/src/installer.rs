//! Places downloaded plugin archives into the cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use stackup_common_fs::{ensure_dir, remove_dir_if_exists};
use tracing::{debug, info, warn};

use crate::archive::{unpack_file, ExtractError};
use crate::cache::DirPluginCache;
use crate::download::DownloadedArtifact;
use crate::error::{InstallError, Result};
use crate::observer::InstallObserver;
use crate::requirement::PluginRequirement;

/// Where [`PluginInstaller::install`] left the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The archive was unpacked into this directory
    Installed(PathBuf),
    /// This directory already existed and was left as it was
    KeptExisting(PathBuf),
}

impl Placement {
    pub fn path(&self) -> &Path {
        match self {
            Self::Installed(path) | Self::KeptExisting(path) => path,
        }
    }
}

/// Extracts plugin archives into a [`DirPluginCache`].
///
/// Archives are unpacked into a hidden staging directory under the cache
/// root and renamed into place once complete, so a failed extraction never
/// looks like an installed plugin.
#[derive(Debug, Clone)]
pub struct PluginInstaller {
    cache: DirPluginCache,
}

impl PluginInstaller {
    pub fn new(cache: DirPluginCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &DirPluginCache {
        &self.cache
    }

    /// Install `artifact` as `req`, returning where the plugin ended up.
    ///
    /// Without `force` an existing plugin directory is never replaced and
    /// [`Placement::KeptExisting`] is returned.
    ///
    /// The artifact is deleted whatever the outcome. A failure to delete it
    /// is reported to `observer` and logged, never returned.
    pub async fn install(
        &self,
        req: &PluginRequirement,
        artifact: DownloadedArtifact,
        force: bool,
        observer: &dyn InstallObserver,
    ) -> Result<Placement> {
        let root = self.cache.root().to_path_buf();
        let target = self.cache.path_for(req);
        let archive = artifact.path().to_path_buf();

        let task = {
            let target = target.clone();
            tokio::task::spawn_blocking(move || place(&archive, &root, &target, force))
        };
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(ExtractError::Aborted(e.to_string())),
        };

        let artifact_path = artifact.path().to_path_buf();
        if let Err(e) = artifact.close() {
            warn!(path = %artifact_path.display(), error = %e, "failed to remove temporary plugin archive");
            observer.on_cleanup_warning(&artifact_path, &e);
        }

        let replaced = result.map_err(|e| InstallError::install(req.label(), e))?;
        Ok(if replaced {
            Placement::Installed(target)
        } else {
            Placement::KeptExisting(target)
        })
    }
}

/// Unpack `archive` into staging and move it to `target`.
///
/// Returns false when `target` already existed and was kept.
fn place(archive: &Path, root: &Path, target: &Path, force: bool) -> std::result::Result<bool, ExtractError> {
    ensure_dir(root)?;

    // Removed on drop, so an early return leaves nothing behind.
    let staging = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempdir_in(root)
        .map_err(|source| ExtractError::Place {
            path: root.to_path_buf(),
            source,
        })?;

    let entries = unpack_file(archive, staging.path())?;
    debug!(entries, staging = %staging.path().display(), "archive extracted");

    if target.exists() {
        if !force {
            info!(path = %target.display(), "plugin directory already present, keeping existing entry");
            return Ok(false);
        }
        remove_dir_if_exists(target)?;
    }

    fs::rename(staging.path(), target).map_err(|source| ExtractError::Place {
        path: target.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Remove leftover staging directories from interrupted installs.
pub fn sweep_staging(root: &Path) -> io::Result<usize> {
    let dir = match fs::read_dir(root) {
        Ok(dir) => dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in dir {
        let entry = entry?;
        let is_staging = entry.file_name().to_str().is_some_and(|n| n.starts_with(".tmp-"));
        if is_staging && entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}
