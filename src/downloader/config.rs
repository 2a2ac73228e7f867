//! Configuration structures and defaults for the downloader.
//!
//! # Examples
//!
//! ```rust
//! use obsup::downloader::{DownloadProgress, ProgressCallback};
//!
//! let callback: ProgressCallback = Box::new(|p: &DownloadProgress| {
//!     if let Some(total) = p.total_bytes {
//!         println!("{}/{} bytes at {:.0} B/s", p.downloaded_bytes, total, p.speed_bps);
//!     }
//! });
//! ```

use crate::download::Summary;
use crate::progress::ProgressDisplay;

use reqwest::header::HeaderMap;
use std::env::current_dir;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Callback type for download completion events
pub type DownloadCallback = Box<dyn Fn(&Summary) + Send + Sync>;

/// Callback type for throttled transfer progress
pub type ProgressCallback = Box<dyn Fn(&DownloadProgress) + Send + Sync>;

/// A snapshot of a running transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes on disk, including any resumed prefix.
    pub downloaded_bytes: u64,
    /// Total size when the server announced one.
    pub total_bytes: Option<u64>,
    /// Bytes per second over this transfer attempt.
    pub speed_bps: f64,
    /// Estimated time to completion.
    pub eta: Option<Duration>,
}

impl DownloadProgress {
    /// Completed fraction in `0.0..=1.0`, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded_bytes as f64 / total as f64).min(1.0)),
        }
    }
}

/// Configuration structure for the downloader
#[derive(Clone)]
pub struct DownloaderConfig {
    /// Directory where to store the downloaded files.
    pub directory: PathBuf,
    /// Number of additional attempts after a connection-level failure.
    pub retries: u32,
    /// Fixed pause between two attempts.
    pub retry_delay: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Maximum time to wait for the response head or for the next chunk.
    pub read_timeout: Duration,
    /// Custom HTTP headers.
    pub headers: Option<HeaderMap>,
    /// Optional proxy configuration.
    pub proxy: Option<reqwest::Proxy>,
    /// Minimum interval between two progress callbacks.
    pub progress_interval: Duration,
    /// Callback for throttled transfer progress.
    pub on_progress: Option<Arc<ProgressCallback>>,
    /// Callback for when the download completes.
    pub on_complete: Option<Arc<DownloadCallback>>,
    /// Checked before each request and between chunks.
    pub cancel: CancellationToken,
    /// Where the transfer bars are drawn.
    pub progress: ProgressDisplay,
}

impl std::fmt::Debug for DownloaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloaderConfig")
            .field("directory", &self.directory)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("headers", &self.headers)
            .field("proxy", &self.proxy.is_some())
            .field("progress_interval", &self.progress_interval)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            directory: current_dir().unwrap_or_default(),
            retries: 3,
            retry_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            headers: None,
            proxy: None,
            progress_interval: Duration::from_millis(100),
            on_progress: None,
            on_complete: None,
            cancel: CancellationToken::new(),
            progress: ProgressDisplay::hidden(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.progress_interval, Duration::from_millis(100));
        assert!(!config.cancel.is_cancelled());
    }

    #[test]
    fn test_fraction() {
        let p = DownloadProgress {
            downloaded_bytes: 25,
            total_bytes: Some(100),
            speed_bps: 0.0,
            eta: None,
        };
        assert_eq!(p.fraction(), Some(0.25));

        let unknown = DownloadProgress {
            total_bytes: None,
            ..p
        };
        assert_eq!(unknown.fraction(), None);
    }
}
