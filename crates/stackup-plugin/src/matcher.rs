//! Decides whether an installed plugin already satisfies a requirement.

use crate::cache::PluginCache;
use crate::requirement::PluginRequirement;

/// Why a requirement needs no install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Satisfaction {
    /// The pinned version is installed.
    Exact,
    /// Some version is installed and nothing was pinned.
    AtLeast,
}

/// Compares requirements against the plugin cache.
///
/// Pinned requirements need the exact version. Unpinned requirements accept
/// any installed version. With `force` set nothing is ever satisfied.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionMatcher {
    force: bool,
}

impl VersionMatcher {
    pub fn new(force: bool) -> Self {
        Self { force }
    }

    /// Check a requirement, returning how it is satisfied.
    pub fn check(&self, req: &PluginRequirement, cache: &dyn PluginCache) -> Option<Satisfaction> {
        if self.force {
            return None;
        }

        match &req.version {
            Some(version) => cache
                .has_exact(req.kind, &req.name, version)
                .then_some(Satisfaction::Exact),
            None => cache
                .has_at_least(req.kind, &req.name, None)
                .then_some(Satisfaction::AtLeast),
        }
    }

    /// Whether the requirement is already satisfied.
    pub fn satisfied(&self, req: &PluginRequirement, cache: &dyn PluginCache) -> bool {
        self.check(req, cache).is_some()
    }
}
