//! Works out whether an install targets a project or a policy pack.

use std::path::{Path, PathBuf};

use stackup_common_fs::{find_upward, FsError};
use tracing::debug;

use crate::error::{InstallError, Result};

/// Project manifest file names, in lookup order.
pub const PROJECT_MARKERS: &[&str] = &["Pulumi.yaml", "Pulumi.yml"];

/// Policy pack manifest file names, in lookup order.
pub const POLICY_PACK_MARKERS: &[&str] = &["PulumiPolicy.yaml", "PulumiPolicy.yml"];

/// Finds the nearest marker files at or above a directory.
pub trait MarkerLocator {
    /// Nearest policy pack manifest.
    fn find_policy_pack(&self, start: &Path) -> std::result::Result<Option<PathBuf>, FsError>;

    /// Nearest project manifest.
    fn find_project(&self, start: &Path) -> std::result::Result<Option<PathBuf>, FsError>;
}

/// [`MarkerLocator`] walking the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMarkerLocator;

impl MarkerLocator for FsMarkerLocator {
    fn find_policy_pack(&self, start: &Path) -> std::result::Result<Option<PathBuf>, FsError> {
        find_upward(start, POLICY_PACK_MARKERS)
    }

    fn find_project(&self, start: &Path) -> std::result::Result<Option<PathBuf>, FsError> {
        find_upward(start, PROJECT_MARKERS)
    }
}

/// What an install run applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingContext {
    /// A project, identified by its manifest
    Project(PathBuf),
    /// A policy pack, identified by its manifest
    PolicyPack(PathBuf),
    /// Neither marker was found
    None,
}

/// Whether the policy pack's own dependencies should be installed from `cwd`.
///
/// A policy pack wins when there is no project above it, or when the policy
/// pack's directory contains the project's directory as a substring. The
/// comparison is textual, so a policy pack in `/a/project2` counts as inside
/// a project in `/a/proj`.
pub fn should_use_policy_pack_deps(locator: &dyn MarkerLocator, cwd: &Path) -> Result<bool> {
    Ok(policy_pack_manifest(locator, cwd)?.is_some())
}

/// Decide the install target for `cwd`.
pub fn resolve_install_target(locator: &dyn MarkerLocator, cwd: &Path) -> Result<WorkingContext> {
    if let Some(policy_pack) = policy_pack_manifest(locator, cwd)? {
        return Ok(WorkingContext::PolicyPack(policy_pack));
    }

    let context = match locator
        .find_project(cwd)
        .map_err(InstallError::context_resolution)?
    {
        Some(project) => WorkingContext::Project(project),
        None => WorkingContext::None,
    };
    Ok(context)
}

/// The policy pack manifest to install from, if the policy pack takes precedence.
fn policy_pack_manifest(locator: &dyn MarkerLocator, cwd: &Path) -> Result<Option<PathBuf>> {
    let Some(policy_pack) = locator
        .find_policy_pack(cwd)
        .map_err(InstallError::context_resolution)?
    else {
        return Ok(None);
    };

    let Some(project) = locator
        .find_project(cwd)
        .map_err(InstallError::context_resolution)?
    else {
        debug!(policy_pack = %policy_pack.display(), "policy pack has no enclosing project");
        return Ok(Some(policy_pack));
    };

    let policy_dir = parent_str(&policy_pack);
    let project_dir = parent_str(&project);
    let nested = policy_dir.contains(project_dir.as_str());
    debug!(
        policy_pack = %policy_pack.display(),
        project = %project.display(),
        nested,
        "found both policy pack and project"
    );

    Ok(nested.then_some(policy_pack))
}

fn parent_str(marker: &Path) -> String {
    marker
        .parent()
        .unwrap_or(marker)
        .to_string_lossy()
        .into_owned()
}
