//! Per-object outcomes and the run report.

use crate::tracker::UpdateReason;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Where an object's pipeline currently is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Resolving,
    Deciding,
    Downloading,
    Extracting,
    Recording,
    Done,
    /// Already up to date.
    Skipped,
    Failed,
    Cancelled,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Stage::Done | Stage::Skipped | Stage::Failed | Stage::Cancelled
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Idle => "idle",
            Stage::Resolving => "resolving",
            Stage::Deciding => "deciding",
            Stage::Downloading => "downloading",
            Stage::Extracting => "extracting",
            Stage::Recording => "recording",
            Stage::Done => "installed",
            Stage::Skipped => "up to date",
            Stage::Failed => "failed",
            Stage::Cancelled => "cancelled",
        })
    }
}

/// What happened to one object during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    pub name: String,
    pub stage: Stage,
    /// Stage the object was in when it failed or was cancelled.
    pub failed_at: Option<Stage>,
    pub filename: Option<String>,
    pub version: Option<String>,
    pub reason: Option<UpdateReason>,
    pub downloaded: bool,
    pub download_bytes: u64,
    /// HTTP status of the transfer, when one was attempted.
    pub http_status: Option<u16>,
    pub extracted: bool,
    pub files_extracted: usize,
    pub entries_skipped: usize,
    pub entries_failed: usize,
    /// Only an administrator-deployment package was available.
    pub variant: bool,
    pub error: Option<String>,
    /// The configured move did not complete; its source folder may remain.
    pub move_error: Option<String>,
}

impl DownloadOutcome {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stage: Stage::Idle,
            failed_at: None,
            filename: None,
            version: None,
            reason: None,
            downloaded: false,
            download_bytes: 0,
            http_status: None,
            extracted: false,
            files_extracted: 0,
            entries_skipped: 0,
            entries_failed: 0,
            variant: false,
            error: None,
            move_error: None,
        }
    }

    /// Move to `stage`.
    pub(crate) fn enter(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Stop in [`Stage::Failed`], remembering where.
    pub(crate) fn fail(mut self, error: impl fmt::Display) -> Self {
        self.failed_at = Some(self.stage);
        self.stage = Stage::Failed;
        self.error = Some(error.to_string());
        self
    }

    pub(crate) fn cancel(mut self) -> Self {
        self.failed_at = Some(self.stage);
        self.stage = Stage::Cancelled;
        self
    }

    /// Installed now or already up to date.
    pub fn is_success(&self) -> bool {
        matches!(self.stage, Stage::Done | Stage::Skipped)
    }
}

/// Everything a run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// RFC 3339 start time.
    pub started_at: String,
    pub finished_at: String,
    pub outcomes: Vec<DownloadOutcome>,
    pub cancelled: bool,
    /// Set when the version state could not be written.
    pub state_error: Option<String>,
    pub pruned: Vec<PathBuf>,
    /// Diagnostics log written for this run.
    #[serde(skip)]
    pub log_file: Option<PathBuf>,
}

impl RunReport {
    pub fn outcome(&self, name: &str) -> Option<&DownloadOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    pub fn downloaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.downloaded).count()
    }

    pub fn installed(&self) -> usize {
        self.count(Stage::Done)
    }

    pub fn skipped(&self) -> usize {
        self.count(Stage::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(Stage::Failed)
    }

    fn count(&self, stage: Stage) -> usize {
        self.outcomes.iter().filter(|o| o.stage == stage).count()
    }

    /// Every object is installed or up to date and the state was saved.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.state_error.is_none()
            && self.outcomes.iter().all(DownloadOutcome::is_success)
    }
}
