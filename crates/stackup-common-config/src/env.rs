//! Environment variable handling.

use std::env;

/// Environment variable names.
pub mod vars {
    // Configuration
    pub const STACKUP_CONFIG: &str = "STACKUP_CONFIG";
    pub const STACKUP_HOME: &str = "STACKUP_HOME";
    pub const STACKUP_PLUGIN_DIR: &str = "STACKUP_PLUGIN_DIR";
    pub const STACKUP_DOWNLOAD_URL: &str = "STACKUP_DOWNLOAD_URL";
    pub const STACKUP_DOWNLOAD_ATTEMPTS: &str = "STACKUP_DOWNLOAD_ATTEMPTS";

    // Passed to dependency installers
    pub const STACKUP_USE_VERSION_TOOLS: &str = "STACKUP_USE_VERSION_TOOLS";

    // Development
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Environment configuration.
pub struct Environment {
    _guard: (), // Prevent construction outside module
}

impl Environment {
    /// Initialize environment from `.env` files in the working directory.
    pub fn init() -> Self {
        // Variables already set win, so the more specific file goes first.
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        Self { _guard: () }
    }

    /// Get an optional string variable. Empty values count as unset.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok().filter(|v| !v.is_empty())
    }
}
