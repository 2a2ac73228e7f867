//! Download module containing download-related functionality.
//!
//! - [`download`] - the [`Download`] description and its `HEAD` probe
//! - [`summary`] - how a transfer ended
//!
//! # Examples
//!
//! ```rust
//! use obsup::download::{Download, Status, Summary};
//! use reqwest::StatusCode;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let download = Download::parse("https://example.com/file.zip", "file.zip")?;
//! let summary = Summary::new(download, StatusCode::OK, 1024, true);
//!
//! match summary.status() {
//!     Status::Success => println!("Download completed successfully"),
//!     Status::Fail(msg) => println!("Download failed: {}", msg),
//!     _ => println!("Download not finished"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod download;
pub mod summary;

pub use download::Download;
pub use summary::{Status, Summary};
