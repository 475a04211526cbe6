//! Language runtime backed by manifest declarations.

use anyhow::Context;
use async_trait::async_trait;
use stackup_common_config::vars;
use stackup_plugin::{LanguageRuntime, PluginRequirement, ProgramInfo};
use tokio::process::Command;
use tracing::{debug, info};

/// Runtime option naming the dependency install command.
pub const INSTALL_OPTION: &str = "install";

/// Runtime whose plugins come from the manifest and whose dependency install
/// runs the manifest's `install` command.
#[derive(Debug, Clone, Default)]
pub struct ManifestRuntime {
    plugins: Vec<PluginRequirement>,
}

impl ManifestRuntime {
    pub fn new(plugins: Vec<PluginRequirement>) -> Self {
        Self { plugins }
    }
}

#[async_trait]
impl LanguageRuntime for ManifestRuntime {
    async fn install_dependencies(
        &self,
        program: &ProgramInfo,
        use_version_tools: bool,
    ) -> anyhow::Result<()> {
        let Some(command) = program.option_str(INSTALL_OPTION) else {
            info!(runtime = %program.runtime, "no install command declared, nothing to do");
            return Ok(());
        };

        debug!(command, dir = %program.program_dir.display(), use_version_tools, "running dependency install");
        let mut cmd = shell(command);
        cmd.current_dir(&program.program_dir);
        if use_version_tools {
            cmd.env(vars::STACKUP_USE_VERSION_TOOLS, "1");
        }

        let status = cmd
            .status()
            .await
            .with_context(|| format!("failed to start `{command}`"))?;
        if !status.success() {
            anyhow::bail!("`{command}` exited with {status}");
        }
        Ok(())
    }

    async fn required_plugins(&self, _program: &ProgramInfo) -> anyhow::Result<Vec<PluginRequirement>> {
        Ok(self.plugins.clone())
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
