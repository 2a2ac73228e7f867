//! Builder pattern implementation for creating [`Downloader`] instances.
//!
//! # Examples
//!
//! ```rust
//! use obsup::downloader::DownloaderBuilder;
//! use obsup::download::Status;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new()
//!     .directory("./downloads".into())
//!     .retries(5)
//!     .retry_delay(Duration::from_millis(500))
//!     .on_complete(|summary| {
//!         if let Status::Fail(msg) = summary.status() {
//!             eprintln!("{} failed: {}", summary.download().filename, msg);
//!         }
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use super::{
    config::{DownloadProgress, DownloaderConfig},
    downloader::Downloader,
};
use crate::download::Summary;
use crate::error::Error;
use crate::progress::ProgressDisplay;

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// A builder used to create a [`Downloader`].
///
/// ```rust
/// # fn main() -> Result<(), obsup::Error> {
/// use obsup::downloader::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().retries(5).directory("downloads".into()).build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DownloaderBuilder {
    config: DownloaderConfig,
}

impl DownloaderBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloaderBuilder::default()
    }

    /// Sets the directory where to store the downloads.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = directory;
        self
    }

    /// Set the number of retries after a connection-level failure.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the fixed delay between two attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Maximum wait for the response head or for the next chunk of the body.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn proxy(mut self, proxy: reqwest::Proxy) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Draw transfer bars on this display.
    pub fn progress(mut self, progress: ProgressDisplay) -> Self {
        self.config.progress = progress;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.config.cancel = cancel;
        self
    }

    /// Minimum interval between two progress callbacks.
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// Set callback for throttled transfer progress.
    ///
    /// The callback also receives one final update when the body ends.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DownloadProgress) + Send + Sync + 'static,
    {
        self.config.on_progress = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Set callback for when the download completes, whatever its status.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Summary) + Send + Sync + 'static,
    {
        self.config.on_complete = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Helper method to get or create a new HeaderMap.
    fn new_header(&self) -> HeaderMap {
        match self.config.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add the http headers.
    ///
    /// Calling `.headers()` multiple times merges every map into one.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.headers = Some(new);
        self
    }

    /// Add the http header
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.headers = Some(new);
        self
    }

    /// Create the [`Downloader`] with the specified options.
    ///
    /// Fails when the HTTP client cannot be built, for instance with an
    /// unusable proxy or TLS backend.
    pub fn build(self) -> Result<Downloader, Error> {
        Downloader::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::ACCEPT;

    #[test]
    fn test_builder_sets_options() {
        let d = DownloaderBuilder::new()
            .directory("dl".into())
            .retries(7)
            .retry_delay(Duration::from_millis(10))
            .read_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(d.directory(), &PathBuf::from("dl"));
        assert_eq!(d.retries(), 7);
        assert_eq!(d.retry_delay(), Duration::from_millis(10));
        assert_eq!(d.read_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_headers_are_merged() {
        let mut extra = HeaderMap::new();
        extra.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let d = DownloaderBuilder::new()
            .header("x-one", HeaderValue::from_static("1"))
            .headers(extra)
            .build()
            .unwrap();

        let headers = d.headers().unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-one").unwrap(), "1");
    }
}
