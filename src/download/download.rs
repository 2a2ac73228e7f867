//! Core download description.
//!
//! A [`Download`] names a remote URL and the file name it is stored under in
//! the downloader's directory.
//!
//! # Examples
//!
//! ```rust
//! use obsup::download::Download;
//! use reqwest::Url;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("https://example.com/releases/obs.zip")?;
//! let download = Download::new(&url, "obs.zip");
//! assert_eq!(download.filename, "obs.zip");
//!
//! // Throw away any partial file and start from byte zero.
//! let fresh = Download::new(&url, "obs.zip").restart(true);
//! assert!(fresh.restart);
//! # Ok(())
//! # }
//! ```

use crate::error::Error;
use crate::utils::header_content_length;

use reqwest::{header::ACCEPT_RANGES, Url};
use reqwest_middleware::ClientWithMiddleware;

/// Represents a file to be downloaded.
#[derive(Debug, Clone)]
pub struct Download {
    /// URL of the file to download.
    pub url: Url,
    /// File name used to save the file on disk.
    pub filename: String,
    /// Discard any existing file instead of resuming it.
    pub restart: bool,
}

impl Download {
    /// Creates a new [`Download`].
    pub fn new(url: &Url, filename: &str) -> Self {
        Self {
            url: url.clone(),
            filename: String::from(filename),
            restart: false,
        }
    }

    /// Parses `url` and creates a new [`Download`].
    pub fn parse(url: &str, filename: &str) -> Result<Self, Error> {
        let url = Url::parse(url)
            .map_err(|e| Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", url, e)))?;
        Ok(Self::new(&url, filename))
    }

    /// Set whether an existing file should be discarded.
    pub fn restart(self, restart: bool) -> Self {
        Self { restart, ..self }
    }

    /// Probe the remote file with a `HEAD` request.
    ///
    /// Returns `(resumable, content_length)`. A server that omits
    /// `Accept-Ranges` or answers `none` is treated as not resumable.
    pub async fn probe(
        &self,
        client: &ClientWithMiddleware,
    ) -> Result<(bool, Option<u64>), reqwest_middleware::Error> {
        let res = client.head(self.url.clone()).send().await?;
        if !res.status().is_success() {
            return Ok((false, None));
        }
        let headers = res.headers();
        let resumable = match headers.get(ACCEPT_RANGES) {
            None => false,
            Some(x) if x == "none" => false,
            Some(_) => true,
        };
        Ok((resumable, header_content_length(headers)))
    }
}
