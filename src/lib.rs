//! obsup installs OBS Studio and a configured set of plugins, and keeps them
//! up to date.
//!
//! Each configured object is resolved to a concrete release asset (GitHub
//! releases or OBS forum resources), compared with what was last installed,
//! and only when it changed downloaded, extracted and recorded. Running the
//! installer twice in a row downloads nothing the second time.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use obsup::{config::InstallConfig, installer::InstallerBuilder, Error};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let config = InstallConfig::from_json(r#"{
//!     "downloads": {
//!         "OBS": { "github": "obsproject/obs-studio", "filename": "OBS-Studio-*-Windows*.zip" }
//!     }
//! }"#)?;
//!
//! let installer = InstallerBuilder::new().install_dir("cgg-obs".into()).build()?;
//! let report = installer.run(&config).await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`config`] - The configuration document and its download objects
//! - [`resolver`] - GitHub and forum release resolution behind the `ReleaseSource` trait
//! - [`tracker`] - The `versions.json` state and the update decision
//! - [`download`] / [`downloader`] - Resumable, retrying file transfers
//! - [`archive`] - Traversal-safe ZIP and 7z extraction with single-root flattening
//! - [`installer`] - The orchestrator tying the above together
//! - [`error`] - Error types per pipeline stage
//! - [`http`], [`progress`], [`utils`] and [`cache`] - Shared plumbing

pub mod archive;
pub mod cache;
pub mod config;
pub mod download;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod progress;
pub mod resolver;
pub mod tracker;
pub mod utils;

pub use archive::{ArchiveExtractor, ExtractionProgress, ExtractionResult};
pub use tokio_util::sync::CancellationToken;
pub use config::{DownloadObject, InstallConfig, Source};
pub use download::{Download, Status, Summary};
pub use downloader::{DownloadProgress, Downloader, DownloaderBuilder};
pub use error::{Error, Result};
pub use http::{create_http_client, HttpClientConfig};
pub use installer::{DownloadOutcome, Installer, InstallerBuilder, RunReport, Stage};
pub use progress::{ProgressBarOpts, StyleOptions};
pub use resolver::{FilenamePattern, ReleaseSource, ResolvedAsset, Resolver, ResolverConfig};
pub use tracker::{InstalledRecord, UpdateReason, VersionTracker};
pub use utils::content_length::{get_content_length, parse_content_range_total};
