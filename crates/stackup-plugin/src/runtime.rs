//! Language runtime capability consumed by the orchestrator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::requirement::PluginRequirement;

/// The program an install run is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramInfo {
    /// Directory holding the project or policy pack manifest
    pub root: PathBuf,

    /// Directory holding the program sources
    pub program_dir: PathBuf,

    /// Runtime name, e.g. `nodejs`
    pub runtime: String,

    /// Runtime options from the manifest
    #[serde(default)]
    pub options: BTreeMap<String, serde_yaml::Value>,
}

impl ProgramInfo {
    /// Program rooted at `root` with sources in the same directory.
    pub fn new(root: impl Into<PathBuf>, runtime: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            program_dir: root.clone(),
            root,
            runtime: runtime.into(),
            options: BTreeMap::new(),
        }
    }

    /// String-valued runtime option.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(serde_yaml::Value::as_str)
    }
}

/// Dependency and plugin knowledge of a language ecosystem.
#[async_trait]
pub trait LanguageRuntime: Send + Sync {
    /// Install the program's own dependencies.
    async fn install_dependencies(
        &self,
        program: &ProgramInfo,
        use_version_tools: bool,
    ) -> anyhow::Result<()>;

    /// Plugins the program needs, in the order they should be installed.
    async fn required_plugins(&self, program: &ProgramInfo) -> anyhow::Result<Vec<PluginRequirement>>;
}
