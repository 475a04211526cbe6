//! Logging infrastructure for stackup.

use std::io;
use std::path::PathBuf;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Log file path (if file logging enabled).
    pub file_path: Option<PathBuf>,
    /// Include source location.
    pub source_location: bool,
    /// Include span open/close events.
    pub span_events: bool,
    /// Colorize stderr output.
    pub ansi: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        }
    }
}

impl LogLevel {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Map a `-v` occurrence count to a level. `quiet` wins over verbosity.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        match verbose {
            0 if quiet => Self::Error,
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON structured format.
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            file_path: None,
            source_location: false,
            span_events: false,
            ansi: true,
        }
    }
}

/// Environment variables read by [`LogConfig::with_env_overrides`].
pub mod vars {
    pub const STACKUP_LOG_LEVEL: &str = "STACKUP_LOG_LEVEL";
    pub const STACKUP_LOG_FORMAT: &str = "STACKUP_LOG_FORMAT";
    pub const STACKUP_LOG_FILE: &str = "STACKUP_LOG_FILE";
    pub const STACKUP_LOG_SOURCE: &str = "STACKUP_LOG_SOURCE";
    pub const STACKUP_LOG_SPANS: &str = "STACKUP_LOG_SPANS";
    pub const RUST_LOG: &str = "RUST_LOG";
}

fn env_flag(var: &str) -> Option<bool> {
    std::env::var(var)
        .ok()
        .map(|v| v.to_lowercase() == "true" || v == "1")
}

impl LogConfig {
    /// Apply environment overrides on top of an existing config.
    pub fn with_env_overrides(mut self) -> Self {
        let level = std::env::var(vars::STACKUP_LOG_LEVEL)
            .or_else(|_| std::env::var(vars::RUST_LOG))
            .ok()
            .and_then(|l| LogLevel::parse(&l));
        if let Some(level) = level {
            self.level = level;
        }

        if let Ok(format) = std::env::var(vars::STACKUP_LOG_FORMAT) {
            self.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        if let Ok(file_path) = std::env::var(vars::STACKUP_LOG_FILE) {
            self.file_path = Some(PathBuf::from(file_path));
        }

        if let Some(source) = env_flag(vars::STACKUP_LOG_SOURCE) {
            self.source_location = source;
        }

        if let Some(spans) = env_flag(vars::STACKUP_LOG_SPANS) {
            self.span_events = spans;
        }

        self
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn span_events(config: &LogConfig) -> FmtSpan {
    if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn stderr_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events(config));

    match config.format {
        LogFormat::Pretty => layer.with_ansi(config.ansi).with_target(false).boxed(),
        LogFormat::Compact => layer.compact().with_ansi(config.ansi).boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_layer(config: &LogConfig, file: std::fs::File) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events(config));

    match config.format {
        LogFormat::Pretty => layer.with_target(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Level filter for `config`.
///
/// `RUST_LOG` directives apply only when `STACKUP_LOG_LEVEL` does not name a
/// level; otherwise `config.level` is used as is.
fn env_filter(config: &LogConfig, stackup_level: Option<&str>, rust_log: Option<&str>) -> EnvFilter {
    let level_pinned = stackup_level.and_then(LogLevel::parse).is_some();
    if !level_pinned {
        if let Some(filter) = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok()) {
            return filter;
        }
    }
    EnvFilter::new(config.level.as_str())
}

/// Initialize logging with the given configuration.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = env_filter(
        &config,
        std::env::var(vars::STACKUP_LOG_LEVEL).ok().as_deref(),
        std::env::var(vars::RUST_LOG).ok().as_deref(),
    );

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(&config)];

    if let Some(file_path) = &config.file_path {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        layers.push(file_layer(&config, file));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::InitError(e.to_string()))
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    #[error("failed to open log file: {0}")]
    FileError(#[from] io::Error),
}

/// Span helpers for plugin work.
pub mod spans;
