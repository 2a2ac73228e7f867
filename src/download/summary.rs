//! Download summary functionality.
//!
//! This module contains the [`Summary`] struct and [`Status`] enum describing
//! how a single transfer ended.
//!
//! # Examples
//!
//! ```rust
//! use obsup::download::{Download, Status, Summary};
//! use reqwest::StatusCode;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let download = Download::parse("https://example.com/file.zip", "file.zip")?;
//! let summary = Summary::new(download, StatusCode::OK, 2048, false)
//!     .with_status(Status::Success);
//!
//! assert!(summary.is_success());
//! println!("Downloaded {} bytes", summary.size());
//! # Ok(())
//! # }
//! ```

use super::download::Download;
use reqwest::StatusCode;
use std::path::PathBuf;

/// Download status enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Download failed with error message
    Fail(String),
    /// Download not yet started
    NotStarted,
    /// Nothing had to be transferred, with reason
    Skipped(String),
    /// Download completed successfully
    Success,
    /// The run was cancelled; the partial file was removed
    Cancelled,
}

/// Represents a [`Download`] summary.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Downloaded item.
    download: Download,
    /// HTTP status code of the last response.
    statuscode: StatusCode,
    /// Size of the file on disk in bytes.
    size: u64,
    /// Status.
    status: Status,
    /// Resumable.
    resumable: bool,
    /// Byte offset the transfer resumed from.
    resumed_from: u64,
    /// Where the file was written.
    path: Option<PathBuf>,
}

impl Summary {
    /// Create a new [`Download`] [`Summary`].
    pub fn new(download: Download, statuscode: StatusCode, size: u64, resumable: bool) -> Self {
        Self {
            download,
            statuscode,
            size,
            status: Status::NotStarted,
            resumable,
            resumed_from: 0,
            path: None,
        }
    }

    /// Attach a status to a [`Download`] [`Summary`].
    pub fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }

    /// Attach the on-disk location.
    pub fn with_path(self, path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..self
        }
    }

    /// Record the offset a resumed transfer started from.
    pub fn with_resumed_from(self, resumed_from: u64) -> Self {
        Self {
            resumed_from,
            ..self
        }
    }

    /// Get the HTTP status code.
    pub fn statuscode(&self) -> StatusCode {
        self.statuscode
    }

    /// Get the summary's size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get a reference to the summary's download.
    pub fn download(&self) -> &Download {
        &self.download
    }

    /// Get a reference to the summary's status.
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn resumed_from(&self) -> u64 {
        self.resumed_from
    }

    /// The file is complete on disk, either freshly transferred or already
    /// present.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Status::Success | Status::Skipped(_))
    }

    /// Mark the summary as failed with a message.
    pub fn fail(self, msg: impl std::fmt::Display) -> Self {
        Self {
            status: Status::Fail(format!("{}", msg)),
            ..self
        }
    }

    /// Mark the summary as skipped with a message.
    pub fn skip(self, msg: impl std::fmt::Display) -> Self {
        Self {
            status: Status::Skipped(format!("{}", msg)),
            ..self
        }
    }

    /// Set the summary's resumable.
    pub fn set_resumable(&mut self, resumable: bool) {
        self.resumable = resumable;
    }

    /// Get the summary's resumable.
    #[must_use]
    pub fn resumable(&self) -> bool {
        self.resumable
    }
}
