//! Manifest definitions (Pulumi.yaml and PulumiPolicy.yaml).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stackup_plugin::{PluginRequirement, ProgramInfo};

use crate::error::CliError;

/// Runtime declaration, either a bare name or a name with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeSpec {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        options: BTreeMap<String, serde_yaml::Value>,
    },
}

impl RuntimeSpec {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    pub fn options(&self) -> BTreeMap<String, serde_yaml::Value> {
        match self {
            Self::Name(_) => BTreeMap::new(),
            Self::Detailed { options, .. } => options.clone(),
        }
    }
}

/// Project manifest (Pulumi.yaml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Project name
    pub name: String,

    /// Language runtime
    pub runtime: RuntimeSpec,

    #[serde(default)]
    pub description: Option<String>,

    /// Program directory, relative to the manifest
    #[serde(default)]
    pub main: Option<PathBuf>,

    /// Plugins the program needs
    #[serde(default)]
    pub plugins: Vec<PluginRequirement>,
}

impl ProjectManifest {
    /// Program described by this manifest, located at `manifest_path`.
    pub fn program(&self, manifest_path: &Path) -> ProgramInfo {
        program_info(manifest_path, &self.runtime, self.main.as_deref())
    }
}

/// Policy pack manifest (PulumiPolicy.yaml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPackManifest {
    /// Language runtime
    pub runtime: RuntimeSpec,

    #[serde(default)]
    pub description: Option<String>,

    /// Program directory, relative to the manifest
    #[serde(default)]
    pub main: Option<PathBuf>,
}

impl PolicyPackManifest {
    /// Program described by this manifest, located at `manifest_path`.
    pub fn program(&self, manifest_path: &Path) -> ProgramInfo {
        program_info(manifest_path, &self.runtime, self.main.as_deref())
    }
}

fn program_info(manifest_path: &Path, runtime: &RuntimeSpec, main: Option<&Path>) -> ProgramInfo {
    let root = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut program = ProgramInfo::new(root, runtime.name());
    if let Some(main) = main {
        program.program_dir = program.root.join(main);
    }
    program.options = runtime.options();
    program
}

/// Read and parse a YAML manifest.
pub fn load_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::io_with_path(format!("Failed to read {}", path.display()), e, path))?;

    serde_yaml::from_str(&contents)
        .map_err(|e| CliError::manifest(format!("Invalid manifest {}: {e}", path.display()), path, e))
}
