//! File system utilities for stackup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod path;

/// File system errors.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("failed to inspect {}: {source}", path.display())]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// The path the failed operation was working on.
    pub fn path(&self) -> &Path {
        match self {
            Self::Inspect { path, .. } | Self::CreateDir { path, .. } | Self::Remove { path, .. } => path,
        }
    }
}

/// Result type for file system operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Find the nearest file named one of `names` in `start` or any of its ancestors.
///
/// Candidates are checked in `names` order within each directory before moving up.
/// Returns `Ok(None)` when the filesystem root is reached without a match. Any
/// failure other than absence (for example permission denied) is returned as
/// [`FsError::Inspect`].
pub fn find_upward(start: impl AsRef<Path>, names: &[&str]) -> Result<Option<PathBuf>> {
    let mut current = start.as_ref().to_path_buf();

    loop {
        for name in names {
            let candidate = current.join(name);
            match fs::metadata(&candidate) {
                Ok(meta) if meta.is_file() => return Ok(Some(candidate)),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(FsError::Inspect {
                        path: candidate,
                        source: e,
                    })
                }
            }
        }

        if !current.pop() {
            return Ok(None);
        }
    }
}

/// Ensure a directory exists (safe directory creation).
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|e| FsError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Remove a directory tree if it exists.
pub fn remove_dir_if_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FsError::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
