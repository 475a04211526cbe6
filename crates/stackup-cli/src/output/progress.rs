//! Progress indicators for plugin downloads.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use is_terminal::IsTerminal;
use stackup_common_http::ByteStream;
use stackup_plugin::ProgressObserver;

/// Progress bar style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStyle {
    pub filled: char,
    pub current: char,
    pub empty: char,
    pub brackets: (char, char),
    pub width: usize,
    pub show_percentage: bool,
    pub show_speed: bool,
}

impl Default for ProgressStyle {
    fn default() -> Self {
        Self {
            filled: '█',
            current: '█',
            empty: '░',
            brackets: ('[', ']'),
            width: 30,
            show_percentage: true,
            show_speed: true,
        }
    }
}

impl ProgressStyle {
    pub fn ascii() -> Self {
        Self {
            filled: '=',
            current: '>',
            empty: '-',
            ..Default::default()
        }
    }

    /// Block characters under a UTF-8 locale, ASCII otherwise.
    pub fn detect() -> Self {
        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()));
        if supports_unicode(locale.as_deref()) {
            Self::default()
        } else {
            Self::ascii()
        }
    }
}

fn supports_unicode(locale: Option<&str>) -> bool {
    if cfg!(windows) {
        return true;
    }
    locale.is_some_and(|l| {
        let l = l.to_ascii_lowercase();
        l.contains("utf-8") || l.contains("utf8")
    })
}

/// Byte progress bar drawn on stderr.
///
/// The line is cleared when the bar is dropped.
pub struct ProgressBar {
    total: Option<u64>,
    current: AtomicU64,
    message: String,
    style: ProgressStyle,
    started: Instant,
    enabled: bool,
}

impl ProgressBar {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total,
            current: AtomicU64::new(0),
            message: String::new(),
            style: ProgressStyle::default(),
            started: Instant::now(),
            enabled: io::stderr().is_terminal(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn style(mut self, style: ProgressStyle) -> Self {
        self.style = style;
        self
    }

    /// Draw even when stderr is not a terminal.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Increment progress by n bytes
    pub fn inc_by(&self, n: u64) {
        self.current.fetch_add(n, Ordering::Relaxed);
        self.render();
    }

    pub fn position(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Text of the bar at the current position.
    pub fn line(&self) -> String {
        let current = self.position();
        let mut parts = Vec::new();

        if let Some(total) = self.total.filter(|t| *t > 0) {
            let ratio = (current as f64 / total as f64).min(1.0);
            let filled = (self.style.width as f64 * ratio) as usize;
            let empty = self.style.width.saturating_sub(filled);
            parts.push(format!(
                "{}{}{}{}{}",
                self.style.brackets.0,
                self.style.filled.to_string().repeat(filled.saturating_sub(1)),
                if filled > 0 { self.style.current.to_string() } else { String::new() },
                self.style.empty.to_string().repeat(empty),
                self.style.brackets.1,
            ));
            if self.style.show_percentage {
                parts.push(format!("{:3}%", (ratio * 100.0) as u8));
            }
            parts.push(format!("{}/{}", format_bytes(current), format_bytes(total)));
        } else {
            parts.push(format_bytes(current));
        }

        if self.style.show_speed && current > 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                parts.push(format!("{}/s", format_bytes((current as f64 / elapsed) as u64)));
            }
        }

        let info = parts.join(" ");
        if self.message.is_empty() {
            info
        } else {
            format!("{} {info}", self.message)
        }
    }

    fn render(&self) {
        if !self.enabled {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[K{}", self.line());
        let _ = stderr.flush();
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        if self.enabled {
            let mut stderr = io::stderr().lock();
            let _ = write!(stderr, "\r\x1b[K");
            let _ = stderr.flush();
        }
    }
}

/// Render a byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for u in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = u;
    }
    format!("{value:.1} {unit}")
}

/// Draws a progress bar for each download.
#[derive(Debug, Clone, Copy)]
pub struct DownloadProgress {
    enabled: bool,
    style: ProgressStyle,
}

impl DownloadProgress {
    /// Progress shown only when stderr is a terminal and output is not quiet.
    pub fn new(quiet: bool) -> Self {
        Self {
            enabled: !quiet && io::stderr().is_terminal(),
            style: ProgressStyle::detect(),
        }
    }
}

impl ProgressObserver for DownloadProgress {
    fn wrap(&self, stream: ByteStream, expected: Option<u64>) -> ByteStream {
        if !self.enabled {
            return stream;
        }

        let bar = Arc::new(
            ProgressBar::new(expected)
                .message("Downloading")
                .style(self.style)
                .enabled(true),
        );
        Box::pin(stream.inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                bar.inc_by(bytes.len() as u64);
            }
        }))
    }
}
