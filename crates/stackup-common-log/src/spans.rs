//! Tracing spans for plugin work.

use tracing::{info_span, Span};

/// Create a span covering all work for one plugin requirement.
pub fn plugin_span(kind: &str, name: &str, version: Option<&str>) -> Span {
    info_span!(
        "plugin",
        kind = %kind,
        name = %name,
        version = %version.unwrap_or("unspecified"),
    )
}

/// Create a span for a single download attempt.
pub fn download_span(url: &str, attempt: u32) -> Span {
    info_span!("download", url = %url, attempt)
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Complete the timer and record duration.
    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
    }
}
