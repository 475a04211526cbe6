//! Common test utilities for CLI testing.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

/// Base URL nothing listens on, so any download attempt fails fast.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1/releases";

/// Test context with a temporary home, config file and work directory
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub work_dir: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.yaml");
        let cache_dir = temp_dir.path().join("plugins");
        let work_dir = temp_dir.path().join("work");
        std::fs::create_dir_all(&work_dir).expect("Failed to create work dir");

        let ctx = Self {
            temp_dir,
            config_path,
            cache_dir,
            work_dir,
        };
        ctx.write_config();
        ctx
    }

    fn write_config(&self) {
        let config = format!(
            "plugins:\n  cache_dir: {}\n  download_base_url: {UNREACHABLE_URL}\nretry:\n  max_attempts: 1\n",
            self.cache_dir.display()
        );
        std::fs::write(&self.config_path, config).expect("Failed to write config");
    }

    /// Write a file under the work directory, creating parents.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.work_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("Failed to write file");
        path
    }

    /// Pretend a plugin is already in the cache.
    pub fn cache_plugin(&self, dir_name: &str) {
        std::fs::create_dir_all(self.cache_dir.join(dir_name)).expect("Failed to create cache entry");
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command running in `dir` configured for this context
    pub fn command_in(&self, dir: &Path) -> Command {
        let mut cmd = Command::cargo_bin("stackup").expect("Binary not found");
        cmd.current_dir(dir)
            .env("STACKUP_CONFIG", &self.config_path)
            .env("STACKUP_HOME", self.path())
            .env("NO_COLOR", "1")
            .env_remove("STACKUP_PLUGIN_DIR")
            .env_remove("STACKUP_DOWNLOAD_URL")
            .env_remove("STACKUP_DOWNLOAD_ATTEMPTS")
            .env_remove("STACKUP_LOG_LEVEL")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Like [`command_in`](Self::command_in) but without `STACKUP_CONFIG` set.
    pub fn command_without_config_env(&self, dir: &Path) -> Command {
        let mut cmd = self.command_in(dir);
        cmd.env_remove("STACKUP_CONFIG");
        cmd
    }

    /// Create a command running in the work directory
    pub fn command(&self) -> Command {
        self.command_in(&self.work_dir)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
