//! Observer hooks for install progress.
//!
//! Observers report only. Nothing they do changes retry or install
//! behaviour.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use stackup_common_http::{ByteStream, HttpError};

use crate::error::InstallError;
use crate::matcher::Satisfaction;
use crate::requirement::PluginLabel;

/// Wraps a download body to render transfer progress.
pub trait ProgressObserver: Send + Sync {
    /// Wrap `stream`. The returned stream must yield the same bytes and end
    /// at the same point.
    fn wrap(&self, stream: ByteStream, expected: Option<u64>) -> ByteStream {
        let _ = expected;
        stream
    }
}

/// Notified before each download retry.
pub trait RetryObserver: Send + Sync {
    /// Attempt `attempt` of `limit` failed with `error`; the next one starts
    /// after `delay`.
    fn on_retry(&self, error: &HttpError, attempt: u32, limit: u32, delay: Duration) {
        let _ = (error, attempt, limit, delay);
    }
}

/// Per-requirement events of an install run.
pub trait InstallObserver: ProgressObserver + RetryObserver {
    /// The requirement is already satisfied.
    fn on_skipped(&self, plugin: &PluginLabel, reason: Satisfaction) {
        let _ = (plugin, reason);
    }

    /// Download of the requirement is starting.
    fn on_installing(&self, plugin: &PluginLabel, url: &str) {
        let _ = (plugin, url);
    }

    /// The requirement was installed into `path`.
    fn on_installed(&self, plugin: &PluginLabel, path: &Path) {
        let _ = (plugin, path);
    }

    /// The requirement was downloaded but `path` already existed and was kept.
    fn on_kept(&self, plugin: &PluginLabel, path: &Path) {
        let _ = (plugin, path);
    }

    /// The requirement failed and the run is stopping.
    fn on_failed(&self, plugin: &PluginLabel, error: &InstallError) {
        let _ = (plugin, error);
    }

    /// A temporary file could not be removed.
    fn on_cleanup_warning(&self, path: &Path, error: &io::Error) {
        let _ = (path, error);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressObserver for Silent {}
impl RetryObserver for Silent {}
impl InstallObserver for Silent {}

/// An event seen by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum InstallEvent {
    Retry { attempt: u32, limit: u32, delay: Duration },
    Skipped(PluginLabel),
    Installing(PluginLabel),
    Installed(PluginLabel),
    Kept(PluginLabel),
    Failed(PluginLabel),
    CleanupWarning(PathBuf),
}

/// Observer that records events in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<InstallEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<InstallEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Attempt numbers of recorded retries.
    pub fn retry_attempts(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                InstallEvent::Retry { attempt, .. } => Some(attempt),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: InstallEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressObserver for RecordingObserver {}

impl RetryObserver for RecordingObserver {
    fn on_retry(&self, _error: &HttpError, attempt: u32, limit: u32, delay: Duration) {
        self.push(InstallEvent::Retry {
            attempt,
            limit,
            delay,
        });
    }
}

impl InstallObserver for RecordingObserver {
    fn on_skipped(&self, plugin: &PluginLabel, _reason: Satisfaction) {
        self.push(InstallEvent::Skipped(plugin.clone()));
    }

    fn on_installing(&self, plugin: &PluginLabel, _url: &str) {
        self.push(InstallEvent::Installing(plugin.clone()));
    }

    fn on_installed(&self, plugin: &PluginLabel, _path: &Path) {
        self.push(InstallEvent::Installed(plugin.clone()));
    }

    fn on_kept(&self, plugin: &PluginLabel, _path: &Path) {
        self.push(InstallEvent::Kept(plugin.clone()));
    }

    fn on_failed(&self, plugin: &PluginLabel, _error: &InstallError) {
        self.push(InstallEvent::Failed(plugin.clone()));
    }

    fn on_cleanup_warning(&self, path: &Path, _error: &io::Error) {
        self.push(InstallEvent::CleanupWarning(path.to_path_buf()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::{PluginKind, PluginRequirement};
    use bytes::Bytes;
    use futures_util::{stream, StreamExt};

    #[tokio::test]
    async fn test_default_wrap_is_identity() {
        let chunks = vec![Ok(Bytes::from_static(b"abc")), Ok(Bytes::from_static(b"de"))];
        let mut wrapped = Silent.wrap(Box::pin(stream::iter(chunks)), Some(5));

        let mut body = Vec::new();
        while let Some(chunk) = wrapped.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"abcde");
    }

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        let label = PluginRequirement::new(PluginKind::Resource, "aws").label();

        observer.on_installing(&label, "https://example.com");
        observer.on_retry(&HttpError::Timeout, 1, 3, Duration::from_secs(1));
        observer.on_installed(&label, Path::new("/tmp/x"));

        assert_eq!(
            observer.events(),
            vec![
                InstallEvent::Installing(label.clone()),
                InstallEvent::Retry {
                    attempt: 1,
                    limit: 3,
                    delay: Duration::from_secs(1)
                },
                InstallEvent::Installed(label),
            ]
        );
        assert_eq!(observer.retry_attempts(), vec![1]);
    }
}
