//! Fakes shared by the plugin integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::stream;
use stackup_common_http::{ByteStream, HttpError};
use stackup_plugin::{
    DirPluginCache, Platform, PluginInstaller, PluginRequirement, ProgramInfo, RetryPolicy,
    RetryingDownloader, Transport,
};

pub const BASE_URL: &str = "https://plugins.test/releases";

/// One scripted transport response.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(u16),
    Timeout,
    /// Advertises `claimed` bytes but sends `body`.
    Short { body: Vec<u8>, claimed: u64 },
    /// Sends `body` then fails mid-stream.
    Broken(Vec<u8>),
}

/// Transport answering from a queue of replies. An empty queue answers 404.
#[derive(Clone, Default)]
pub struct FakeTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            urls: Arc::default(),
        }
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// URLs opened so far.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

fn chunks(body: Vec<u8>) -> Vec<Result<Bytes, HttpError>> {
    body.chunks(7).map(|c| Ok(Bytes::copy_from_slice(c))).collect()
}

fn body_stream(items: Vec<Result<Bytes, HttpError>>) -> ByteStream {
    Box::pin(stream::iter(items))
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, url: &str) -> Result<(ByteStream, Option<u64>), HttpError> {
        self.urls.lock().unwrap().push(url.to_string());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Status(404));

        match reply {
            Reply::Body(body) => {
                let len = body.len() as u64;
                Ok((body_stream(chunks(body)), Some(len)))
            }
            Reply::Status(429) => Err(HttpError::RateLimited { retry_after: None }),
            Reply::Status(status) if status >= 500 => Err(HttpError::ServerError {
                status,
                body: format!("status {status}"),
            }),
            Reply::Status(status) => Err(HttpError::ClientError {
                status,
                body: format!("status {status}"),
            }),
            Reply::Timeout => Err(HttpError::Timeout),
            Reply::Short { body, claimed } => Ok((body_stream(chunks(body)), Some(claimed))),
            Reply::Broken(body) => {
                let mut items = chunks(body);
                items.push(Err(HttpError::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset",
                ))));
                Ok((body_stream(items), None))
            }
        }
    }
}

/// Runtime returning a fixed requirement list.
#[derive(Default)]
pub struct FakeRuntime {
    pub requirements: Vec<PluginRequirement>,
    pub fail_dependencies: bool,
    pub fail_lookup: bool,
    pub dependency_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub used_version_tools: AtomicBool,
}

impl FakeRuntime {
    pub fn with_requirements(requirements: Vec<PluginRequirement>) -> Self {
        Self {
            requirements,
            ..Self::default()
        }
    }

    pub fn dependency_calls(&self) -> usize {
        self.dependency_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl stackup_plugin::LanguageRuntime for FakeRuntime {
    async fn install_dependencies(&self, _program: &ProgramInfo, use_version_tools: bool) -> anyhow::Result<()> {
        self.dependency_calls.fetch_add(1, Ordering::SeqCst);
        self.used_version_tools.store(use_version_tools, Ordering::SeqCst);
        if self.fail_dependencies {
            anyhow::bail!("dependency install exited with status 1");
        }
        Ok(())
    }

    async fn required_plugins(&self, _program: &ProgramInfo) -> anyhow::Result<Vec<PluginRequirement>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            anyhow::bail!("could not query runtime for plugins");
        }
        Ok(self.requirements.clone())
    }
}

/// A gzip-compressed tarball holding `files`.
pub fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, *body).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Archive for a plugin binary named after the requirement.
pub fn plugin_archive(req: &PluginRequirement) -> Vec<u8> {
    let binary = format!("pulumi-{}-{}", req.kind, req.name);
    tarball(&[(binary.as_str(), &b"#!/bin/sh\necho plugin\n"[..])])
}

/// Retry policy with short delays.
pub fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(10),
        backoff_factor: 2.0,
        max_delay: Duration::from_millis(100),
    }
}

pub fn linux() -> Platform {
    Platform::from_rust("linux", "x86_64")
}

/// Downloader writing temporary files into `temp_dir`.
pub fn downloader(transport: FakeTransport, temp_dir: &Path, max_attempts: u32) -> RetryingDownloader<FakeTransport> {
    RetryingDownloader::new(transport, BASE_URL)
        .with_policy(quick_policy(max_attempts))
        .with_platform(linux())
        .with_temp_dir(temp_dir)
}

pub fn installer(cache_root: &Path) -> PluginInstaller {
    PluginInstaller::new(DirPluginCache::new(cache_root))
}

/// Number of entries in a directory.
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
