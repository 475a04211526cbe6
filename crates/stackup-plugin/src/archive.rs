//! Plugin archive extraction.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use stackup_common_fs::{ensure_dir, path::safe_join, FsError};
use tar::Archive;

/// Errors extracting or placing a plugin archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read archive: {0}")]
    Read(#[source] io::Error),

    #[error("archive entry escapes the install directory: {}", .0.display())]
    UnsafeEntry(PathBuf),

    #[error("failed to extract {}: {source}", path.display())]
    Unpack {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to place plugin into {}: {source}", path.display())]
    Place {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Cache(#[from] FsError),

    #[error("extraction did not complete: {0}")]
    Aborted(String),
}

/// Extract a gzip-compressed tar archive file into `dest`.
pub fn unpack_file(archive: &Path, dest: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive).map_err(|source| ExtractError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    extract_tar_gz(file, dest)
}

/// Extract a gzip-compressed tar stream into `dest`, returning the number of
/// entries written.
///
/// Entries with absolute paths or `..` components are rejected, as are links
/// pointing outside `dest`.
pub fn extract_tar_gz<R: Read>(reader: R, dest: &Path) -> Result<usize, ExtractError> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut count = 0;

    for entry in archive.entries().map_err(ExtractError::Read)? {
        let mut entry = entry.map_err(ExtractError::Read)?;
        let raw_path = entry.path().map_err(ExtractError::Read)?.into_owned();
        let out = safe_join(dest, &raw_path).ok_or_else(|| ExtractError::UnsafeEntry(raw_path.clone()))?;

        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            let target = entry
                .link_name()
                .map_err(ExtractError::Read)?
                .map(|t| t.into_owned())
                .unwrap_or_default();
            if !link_stays_inside(&raw_path, &target, kind.is_hard_link()) {
                return Err(ExtractError::UnsafeEntry(raw_path));
            }
        }

        if kind.is_dir() {
            ensure_dir(&out)?;
        } else {
            if let Some(parent) = out.parent() {
                ensure_dir(parent)?;
            }
            entry
                .unpack(&out)
                .map_err(|source| ExtractError::Unpack { path: out.clone(), source })?;
        }
        count += 1;
    }

    Ok(count)
}

/// Whether a link at `entry` pointing to `target` resolves inside the root.
fn link_stays_inside(entry: &Path, target: &Path, hard: bool) -> bool {
    // Hard link targets are archive paths; symlink targets are relative to the link.
    let base = if hard {
        PathBuf::new()
    } else {
        entry.parent().map(Path::to_path_buf).unwrap_or_default()
    };

    let mut depth: usize = base.components().count();
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use tempfile::tempdir;

    fn tarball(build: impl FnOnce(&mut tar::Builder<GzEncoder<Vec<u8>>>)) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        build(&mut builder);
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn add_file(builder: &mut tar::Builder<GzEncoder<Vec<u8>>>, path: &str, body: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, body).unwrap();
    }

    /// Write a header with a raw name, bypassing the builder's path checks.
    fn add_raw(builder: &mut tar::Builder<GzEncoder<Vec<u8>>>, name: &[u8], body: &[u8]) {
        let mut header = tar::Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, body).unwrap();
    }

    #[test]
    fn test_extracts_nested_files() {
        let bytes = tarball(|b| {
            add_file(b, "pulumi-resource-aws", b"#!/bin/sh\n");
            add_file(b, "schema/schema.json", b"{}");
        });
        let dir = tempdir().unwrap();

        let count = extract_tar_gz(bytes.as_slice(), dir.path()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(fs::read(dir.path().join("pulumi-resource-aws")).unwrap(), b"#!/bin/sh\n");
        assert_eq!(fs::read_to_string(dir.path().join("schema/schema.json")).unwrap(), "{}");
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let bytes = tarball(|b| add_raw(b, b"../evil", b"x"));
        let dir = tempdir().unwrap();
        let inner = dir.path().join("inner");
        fs::create_dir(&inner).unwrap();

        let err = extract_tar_gz(bytes.as_slice(), &inner).unwrap_err();
        assert!(matches!(err, ExtractError::UnsafeEntry(_)));
        assert!(!dir.path().join("evil").exists());
    }

    #[test]
    fn test_rejects_escaping_symlink() {
        let bytes = tarball(|b| {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            b.append_link(&mut header, "bin/link", "../../outside").unwrap();
        });
        let dir = tempdir().unwrap();

        let err = extract_tar_gz(bytes.as_slice(), dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::UnsafeEntry(_)));
    }

    #[test]
    fn test_link_inside_root() {
        assert!(link_stays_inside(Path::new("bin/link"), Path::new("../lib/x"), false));
        assert!(!link_stays_inside(Path::new("link"), Path::new("../x"), false));
        assert!(!link_stays_inside(Path::new("link"), Path::new("/etc/passwd"), false));
        assert!(link_stays_inside(Path::new("a/b"), Path::new("c/d"), true));
    }

    #[test]
    fn test_not_gzip() {
        let dir = tempdir().unwrap();
        let err = extract_tar_gz(&b"plain text"[..], dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Read(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = unpack_file(&dir.path().join("nope.tar.gz"), dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Open { .. }));
    }
}
