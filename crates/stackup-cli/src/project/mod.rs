//! Project and policy pack manifests, and the runtime built from them.

mod manifest;
mod runtime;

pub use manifest::{load_manifest, PolicyPackManifest, ProjectManifest, RuntimeSpec};
pub use runtime::ManifestRuntime;
