//! Plugin archive download with bounded retry.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use stackup_common_http::{ByteStream, HttpClient, HttpError};
use stackup_common_log::spans::download_span;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn, Instrument};

use crate::observer::{ProgressObserver, RetryObserver};
use crate::requirement::{Platform, PluginLabel, PluginRequirement};

/// Raw byte-stream fetch by URL.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open `url`, returning the body and its advertised length.
    async fn open(&self, url: &str) -> Result<(ByteStream, Option<u64>), HttpError>;
}

/// [`Transport`] over the shared HTTP client.
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &str) -> Result<(ByteStream, Option<u64>), HttpError> {
        self.client.get_stream(url).await
    }
}

/// How many times to try a download and how long to wait between tries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// Never exceeds `max_delay`; a computed delay below zero means no wait.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if secs.is_nan() {
            return self.max_delay;
        }
        if secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    fn limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// A download that exhausted its retries or hit a permanent failure.
#[derive(Debug, thiserror::Error)]
#[error("fetching {url} failed after {attempts} attempt(s): {source}")]
pub struct DownloadError {
    /// Requirement being downloaded
    pub plugin: PluginLabel,
    /// URL that was fetched
    pub url: String,
    /// Attempts made
    pub attempts: u32,
    /// Cause of the last failed attempt
    #[source]
    pub source: HttpError,
}

/// A downloaded archive in a temporary file.
///
/// The file is deleted by [`DownloadedArtifact::close`] or, failing that,
/// when the value is dropped.
#[derive(Debug)]
pub struct DownloadedArtifact {
    path: TempPath,
    bytes: u64,
}

impl DownloadedArtifact {
    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Delete the temporary file, reporting failure.
    pub fn close(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Fetches plugin archives, retrying transient failures.
pub struct RetryingDownloader<T> {
    transport: T,
    policy: RetryPolicy,
    base_url: String,
    platform: Platform,
    temp_dir: Option<PathBuf>,
}

impl<T: Transport> RetryingDownloader<T> {
    /// Create a downloader that resolves unconfigured URLs against `base_url`.
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            base_url: base_url.into(),
            platform: Platform::current(),
            temp_dir: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Write temporary files to `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// URL a requirement is fetched from.
    pub fn url_for(&self, req: &PluginRequirement) -> String {
        req.download_url(&self.base_url, &self.platform)
    }

    /// Download the archive for `req` into a temporary file.
    pub async fn fetch(
        &self,
        req: &PluginRequirement,
        progress: &dyn ProgressObserver,
        retry: &dyn RetryObserver,
    ) -> Result<DownloadedArtifact, DownloadError> {
        let url = self.url_for(req);
        let limit = self.policy.limit();
        let mut attempt = 1;

        loop {
            let result = self
                .attempt(&url, progress)
                .instrument(download_span(&url, attempt))
                .await;

            let error = match result {
                Ok(artifact) => {
                    debug!(url = %url, bytes = artifact.len(), attempt, "download complete");
                    return Ok(artifact);
                }
                Err(e) => e,
            };

            if attempt >= limit || !error.is_transient() {
                return Err(DownloadError {
                    plugin: req.label(),
                    url,
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                "Error downloading plugin: {}\nWill retry in {:?} [{}/{}]",
                error, delay, attempt, limit
            );
            retry.on_retry(&error, attempt, limit, delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        url: &str,
        progress: &dyn ProgressObserver,
    ) -> Result<DownloadedArtifact, HttpError> {
        let (stream, expected) = self.transport.open(url).await?;
        let mut stream = progress.wrap(stream, expected);

        let mut builder = tempfile::Builder::new();
        builder.prefix("stackup-plugin-").suffix(".tar.gz");
        let named = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        // Dropping `path` on any early return deletes the partial file.
        let (file, path) = named.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if let Some(expected) = expected {
            if written != expected {
                return Err(HttpError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {expected} bytes, received {written}"),
                )));
            }
        }

        Ok(DownloadedArtifact {
            path,
            bytes: written,
        })
    }
}
