//! Configuration file loading and parsing.

use crate::env::{vars, Environment};
use crate::types::StackupConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error("cannot determine home directory; set {}", vars::STACKUP_HOME)]
    NoHomeDir,
}

/// Root directory for stackup state: `$STACKUP_HOME` or `~/.stackup`.
pub fn stackup_home() -> Result<PathBuf, ConfigError> {
    if let Some(home) = Environment::get(vars::STACKUP_HOME) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|h| h.join(".stackup"))
        .ok_or(ConfigError::NoHomeDir)
}

impl StackupConfig {
    /// Resolved plugin cache directory.
    pub fn plugin_cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.plugins.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(stackup_home()?.join("plugins")),
        }
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("env var pattern is valid")
    })
}

/// Configuration loader.
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for an explicit config file.
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Create a loader for `$STACKUP_CONFIG` or `<stackup home>/config.yaml`.
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let path = match Environment::get(vars::STACKUP_CONFIG) {
            Some(path) => PathBuf::from(path),
            None => stackup_home()?.join("config.yaml"),
        };
        Ok(Self::new(path))
    }

    /// Path this loader reads.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration, falling back to defaults when the file is absent.
    ///
    /// Environment overrides are applied after parsing and before validation.
    pub fn load(&self) -> Result<StackupConfig, ConfigError> {
        let mut config = if self.config_path.exists() {
            let contents = std::fs::read_to_string(&self.config_path)?;
            let expanded = self.expand_env_vars(&contents)?;

            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        } else {
            StackupConfig::default()
        };

        apply_overrides(&mut config, |var| Environment::get(var))?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in env_var_pattern().captures_iter(content) {
            let full_match = &cap[0];
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    /// Validate configuration values.
    fn validate(&self, config: &StackupConfig) -> Result<(), ConfigError> {
        if config.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError {
                message: "retry.max_attempts must be greater than 0".to_string(),
            });
        }

        if config.retry.backoff_factor.is_nan() || config.retry.backoff_factor < 1.0 {
            return Err(ConfigError::ValidationError {
                message: "retry.backoff_factor must be at least 1.0".to_string(),
            });
        }

        if config.retry.max_delay_ms < config.retry.initial_delay_ms {
            return Err(ConfigError::ValidationError {
                message: "retry.max_delay_ms must not be less than retry.initial_delay_ms".to_string(),
            });
        }

        let base = config.plugins.download_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "plugins.download_base_url must not be empty".to_string(),
            });
        }
        if let Err(e) = url::Url::parse(base) {
            return Err(ConfigError::ValidationError {
                message: format!("plugins.download_base_url is not a valid URL: {e}"),
            });
        }

        Ok(())
    }
}

/// Apply `STACKUP_*` overrides using `lookup` to read variables.
fn apply_overrides<F>(config: &mut StackupConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(vars::STACKUP_PLUGIN_DIR) {
        config.plugins.cache_dir = Some(PathBuf::from(dir));
    }

    if let Some(url) = lookup(vars::STACKUP_DOWNLOAD_URL) {
        config.plugins.download_base_url = url;
    }

    if let Some(attempts) = lookup(vars::STACKUP_DOWNLOAD_ATTEMPTS) {
        config.retry.max_attempts = attempts.parse().map_err(|_| ConfigError::ValidationError {
            message: format!("{} must be a positive integer, got {attempts:?}", vars::STACKUP_DOWNLOAD_ATTEMPTS),
        })?;
    }

    Ok(())
}
