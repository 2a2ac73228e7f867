//! Single-file downloader, its builder and configuration.
//!
//! - `downloader` - the resumable, retrying fetch loop
//! - `builder` - [`DownloaderBuilder`] for configuration
//! - `config` - configuration, progress snapshots and callback types
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
//!     .retries(3)
//!     .build()?;
//!
//! let download = Download::parse("https://example.com/plugin.zip", "plugin.zip")?;
//! let summary = downloader.download(&download).await;
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod downloader;

pub use builder::DownloaderBuilder;
pub use config::{DownloadCallback, DownloadProgress, DownloaderConfig, ProgressCallback};
pub use downloader::Downloader;
