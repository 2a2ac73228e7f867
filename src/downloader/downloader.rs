//! Core downloader implementation with fetch logic.
//!
//! A [`Downloader`] fetches one URL at a time into its directory. It resumes
//! partial files with byte-range requests, retries connection-level failures
//! with a fixed delay, reports throttled progress and stops as soon as its
//! [`CancellationToken`] is cancelled, even while waiting on the network.
//!
//! # Examples
//!
//! ```rust,no_run
//! use obsup::downloader::DownloaderBuilder;
//! use obsup::download::Download;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new()
//!     .directory("./downloads".into())
//!     .on_progress(|p| println!("{} bytes", p.downloaded_bytes))
//!     .build()?;
//!
//! let download = Download::parse("https://example.com/obs.zip", "obs.zip")?;
//! let summary = downloader.download(&download).await;
//! println!("{:?}", summary.status());
//! # Ok(())
//! # }
//! ```

use super::config::{DownloadProgress, DownloaderConfig};
use crate::download::{Download, Status, Summary};
use crate::error::Error;
use crate::http::{create_http_client, HttpClientConfig};
use crate::utils::{header_content_length, parse_content_range_start, parse_content_range_total};

use futures::stream::StreamExt;
use reqwest::{
    header::{HeaderMap, CONTENT_RANGE, RANGE},
    StatusCode,
};
use reqwest_middleware::ClientWithMiddleware;
use std::fmt;
use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::{fs, fs::OpenOptions, io::AsyncWriteExt, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Represents the download controller.
///
/// A downloader can be created via its builder:
///
/// ```rust
/// # fn main() -> Result<(), obsup::Error> {
/// use obsup::downloader::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Downloader {
    config: DownloaderConfig,
    client: ClientWithMiddleware,
}

impl Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .finish()
    }
}

/// How a single attempt ended.
enum Attempt {
    /// Final answer, no further attempts.
    Done(Summary),
    /// Connection-level failure worth another attempt.
    Retry(String),
    /// The server refused the range; drop the local file and start over.
    Restart,
}

impl Downloader {
    /// Creates a new Downloader with the given configuration.
    pub(crate) fn new(config: DownloaderConfig) -> Result<Self, Error> {
        // The downloader retries on its own so it can resume the partial file.
        let client = create_http_client(HttpClientConfig {
            retries: 0,
            proxy: config.proxy.clone(),
            headers: config.headers.clone(),
            connect_timeout: config.connect_timeout,
        })?;
        Ok(Self { config, client })
    }

    /// Gets the directory where files will be downloaded.
    pub fn directory(&self) -> &PathBuf {
        &self.config.directory
    }

    /// Gets the number of retries per download.
    pub fn retries(&self) -> u32 {
        self.config.retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.config.retry_delay
    }

    pub fn read_timeout(&self) -> Duration {
        self.config.read_timeout
    }

    /// Gets the custom headers.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.config.headers.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.config.cancel
    }

    /// Fetch `download` into the downloader's directory.
    ///
    /// Never fails: every outcome, including cancellation, is described by
    /// the returned [`Summary`]. The completion callback sees it first.
    pub async fn download(&self, download: &Download) -> Summary {
        let summary = self.fetch(download).await;

        if let Some(ref callback) = self.config.on_complete {
            callback(&summary);
        }

        summary
    }

    async fn fetch(&self, download: &Download) -> Summary {
        let output = self.config.directory.join(&download.filename);
        let summary =
            Summary::new(download.clone(), StatusCode::BAD_REQUEST, 0, false).with_path(output.clone());

        if self.config.cancel.is_cancelled() {
            return summary.with_status(Status::Cancelled);
        }

        debug!("Creating destination directory {:?}", self.config.directory);
        if let Err(e) = fs::create_dir_all(&self.config.directory).await {
            return summary.fail(e);
        }

        if download.restart && output.exists() {
            debug!("Discarding {:?} before a fresh download", output);
            if let Err(e) = fs::remove_file(&output).await {
                return summary.fail(format!("cannot remove previous file: {}", e));
            }
        }

        // A failed probe is not fatal: the GET below may still succeed.
        let Some(probe) = self
            .cancellable(timeout(self.config.read_timeout, download.probe(&self.client)))
            .await
        else {
            return summary.with_status(Status::Cancelled);
        };
        let (resumable, remote_len) = match probe {
            Ok(Ok(probe)) => probe,
            Ok(Err(e)) => {
                debug!("HEAD {} failed: {}", download.url, e);
                (false, None)
            }
            Err(_) => {
                debug!("HEAD {} timed out", download.url);
                (false, None)
            }
        };

        let mut attempt: u32 = 0;
        loop {
            match self.attempt(download, &output, resumable, remote_len).await {
                Attempt::Done(summary) => return summary,
                Attempt::Restart => {
                    warn!("Server refused to resume {}, starting over", download.filename);
                    if let Err(e) = remove_if_exists(&output).await {
                        return summary.fail(e);
                    }
                }
                Attempt::Retry(reason) => {
                    if attempt >= self.config.retries {
                        return summary.fail(format!(
                            "giving up after {} attempts: {}",
                            attempt + 1,
                            reason
                        ));
                    }
                    attempt += 1;
                    warn!(
                        "Download of {} interrupted ({}), retry {}/{} in {:?}",
                        download.filename,
                        reason,
                        attempt,
                        self.config.retries,
                        self.config.retry_delay
                    );
                    if self
                        .cancellable(tokio::time::sleep(self.config.retry_delay))
                        .await
                        .is_none()
                    {
                        let _ = remove_if_exists(&output).await;
                        return summary.with_status(Status::Cancelled);
                    }
                }
            }
        }
    }

    /// One request, streamed to disk.
    async fn attempt(
        &self,
        download: &Download,
        output: &Path,
        resumable: bool,
        remote_len: Option<u64>,
    ) -> Attempt {
        let base = Summary::new(download.clone(), StatusCode::BAD_REQUEST, 0, resumable)
            .with_path(output.to_path_buf());

        let mut size_on_disk = match fs::metadata(output).await {
            Ok(m) => m.len(),
            Err(_) => 0,
        };

        if let Some(remote_len) = remote_len {
            if size_on_disk > 0 && size_on_disk == remote_len {
                return Attempt::Done(
                    Summary::new(download.clone(), StatusCode::OK, size_on_disk, resumable)
                        .with_path(output.to_path_buf())
                        .skip("the file was already fully downloaded"),
                );
            }
            if size_on_disk > remote_len {
                debug!(
                    "{:?} is larger than the remote file ({} > {}), truncating",
                    output, size_on_disk, remote_len
                );
                size_on_disk = 0;
            }
        }
        if !resumable {
            size_on_disk = 0;
        }

        debug!("Fetching {}", &download.url);
        let mut req = self.client.get(download.url.clone());
        if size_on_disk > 0 {
            debug!("Resuming {} from byte {}", download.filename, size_on_disk);
            req = req.header(RANGE, format!("bytes={}-", size_on_disk));
        }

        let Some(sent) = self.cancellable(timeout(self.config.read_timeout, req.send())).await
        else {
            return Attempt::Done(base.with_status(Status::Cancelled));
        };
        let res = match sent {
            Err(_) => return Attempt::Retry("timed out waiting for a response".into()),
            Ok(Err(e)) => return Attempt::Retry(e.to_string()),
            Ok(Ok(res)) => res,
        };

        let status = res.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE && size_on_disk > 0 {
            return Attempt::Restart;
        }
        if !status.is_success() {
            return Attempt::Done(
                Summary::new(download.clone(), status, size_on_disk, resumable)
                    .with_path(output.to_path_buf())
                    .fail(format!("HTTP {}", status)),
            );
        }

        let content_range = res
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        // 206 appends where the server says it starts; anything else rewrites.
        let start = if status == StatusCode::PARTIAL_CONTENT {
            let start = content_range
                .as_deref()
                .and_then(parse_content_range_start)
                .unwrap_or(size_on_disk);
            if start != size_on_disk {
                warn!(
                    "Server resumed {} at byte {} instead of {}",
                    download.filename, start, size_on_disk
                );
                return Attempt::Restart;
            }
            start
        } else {
            0
        };

        let total = content_range
            .as_deref()
            .and_then(parse_content_range_total)
            .or_else(|| header_content_length(res.headers()).map(|len| len + start))
            .or(remote_len);

        debug!("Opening {:?} (append: {})", output, start > 0);
        let mut file = match OpenOptions::new()
            .create(true)
            .write(true)
            .append(start > 0)
            .truncate(start == 0)
            .open(output)
            .await
        {
            Ok(file) => file,
            Err(e) => return Attempt::Done(base.fail(e)),
        };

        let pb = self
            .config
            .progress
            .create_transfer_progress(&download.filename, total.unwrap_or(0), start);

        let started = Instant::now();
        let mut last_report: Option<Instant> = None;
        let mut written = start;
        let mut stream = res.bytes_stream();

        let outcome = loop {
            let next = self
                .cancellable(timeout(self.config.read_timeout, stream.next()))
                .await;
            let Some(next) = next else {
                drop(file);
                self.config.progress.finish_child(pb);
                info!("Download of {} cancelled", download.filename);
                let _ = remove_if_exists(output).await;
                return Attempt::Done(
                    Summary::new(download.clone(), status, written, resumable)
                        .with_path(output.to_path_buf())
                        .with_status(Status::Cancelled),
                );
            };

            let chunk = match next {
                Err(_) => break Some("no data received before the read timeout".to_string()),
                Ok(None) => break None,
                Ok(Some(Err(e))) => break Some(e.to_string()),
                Ok(Some(Ok(chunk))) => chunk,
            };

            if let Err(e) = file.write_all(&chunk).await {
                self.config.progress.finish_child(pb);
                return Attempt::Done(base.fail(e));
            }
            written += chunk.len() as u64;
            pb.inc(chunk.len() as u64);

            let due = last_report.map_or(true, |t| t.elapsed() >= self.config.progress_interval);
            if due {
                self.report_progress(written, start, total, started);
                last_report = Some(Instant::now());
            }
        };

        if let Err(e) = file.flush().await {
            self.config.progress.finish_child(pb);
            return Attempt::Done(base.fail(e));
        }
        drop(file);
        self.config.progress.finish_child(pb);
        self.report_progress(written, start, total, started);

        if let Some(reason) = outcome {
            return Attempt::Retry(reason);
        }
        if let Some(total) = total {
            if written < total {
                return Attempt::Retry(format!("body ended at {} of {} bytes", written, total));
            }
        }

        info!("Downloaded {} ({} bytes)", download.filename, written);
        Attempt::Done(
            Summary::new(download.clone(), status, written, resumable)
                .with_path(output.to_path_buf())
                .with_resumed_from(start)
                .with_status(Status::Success),
        )
    }

    /// Run `fut` unless the token fires first.
    async fn cancellable<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.config.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    fn report_progress(&self, written: u64, start: u64, total: Option<u64>, started: Instant) {
        let Some(ref callback) = self.config.on_progress else {
            return;
        };

        let elapsed = started.elapsed().as_secs_f64();
        let speed_bps = if elapsed > 0.0 {
            (written - start) as f64 / elapsed
        } else {
            0.0
        };
        let eta = match total {
            Some(total) if speed_bps > 0.0 && total >= written => {
                Some(Duration::from_secs_f64((total - written) as f64 / speed_bps))
            }
            _ => None,
        };

        callback(&DownloadProgress {
            downloaded_bytes: written,
            total_bytes: total,
            speed_bps,
            eta,
        });
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
