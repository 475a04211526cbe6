//! Path manipulation utilities.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` without hitting the filesystem.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => components.push(Component::Prefix(p)),
            Component::RootDir => {
                components.clear();
                components.push(Component::RootDir);
            }
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::ParentDir) | None => components.push(Component::ParentDir),
                _ => {} // Don't pop prefix or root dir
            },
            Component::Normal(c) => components.push(Component::Normal(c)),
        }
    }

    if components.is_empty() {
        PathBuf::from(".")
    } else {
        components.iter().collect()
    }
}

/// Resolve `path` against `base` when relative, then normalize.
pub fn absolutize(path: impl AsRef<Path>, base: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(base.as_ref().join(path))
    }
}

/// Join paths safely, preventing path traversal.
///
/// Returns `None` when `path` is absolute or contains a `..` component.
pub fn safe_join(base: impl AsRef<Path>, path: impl AsRef<Path>) -> Option<PathBuf> {
    let base = base.as_ref();
    let path = path.as_ref();

    if path.is_absolute() {
        return None;
    }

    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::Prefix(_) | Component::RootDir
        ) {
            return None;
        }
    }

    Some(base.join(path))
}
