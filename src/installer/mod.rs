//! The install pipeline.
//!
//! For each configured object, the primary application first, an
//! [`Installer`] walks `resolve → decide → download → extract → record`,
//! then applies the object's configured move. Objects are processed one at
//! a time; a failure ends that object's pipeline only. The version state is
//! saved once, after the last object.
//!
//! # Examples
//!
//! ```rust,no_run
//! use obsup::config::InstallConfig;
//! use obsup::installer::InstallerBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let installer = InstallerBuilder::new()
//!     .install_dir("C:/cgg-obs".into())
//!     .github_token(std::env::var("GITHUB_TOKEN").ok())
//!     .build()?;
//!
//! let config = InstallConfig::load_file("cgg-obs.json".as_ref())?;
//! let report = installer.run(&config).await;
//! println!("{} installed, {} up to date, {} failed",
//!     report.installed(), report.skipped(), report.failed());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod moves;
pub mod outcome;

pub use builder::{InstallerBuilder, InstallerConfig};
pub use moves::apply_move;
pub use outcome::{DownloadOutcome, RunReport, Stage};

use crate::archive::{ArchiveExtractor, ExtractionResult};
use crate::cache;
use crate::config::{DownloadObject, InstallConfig};
use crate::download::{Download, Status};
use crate::downloader::{Downloader, DownloaderBuilder};
use crate::error::{ConfigError, Error};
use crate::progress::ProgressDisplay;
use crate::resolver::Resolver;
use crate::tracker::{UpdateReason, VersionTracker, STATE_FILE};

use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Drives the install pipeline. Built with [`InstallerBuilder`].
#[derive(Debug)]
pub struct Installer {
    config: InstallerConfig,
    resolver: Resolver,
    downloader: Downloader,
    progress: ProgressDisplay,
}

impl Installer {
    pub(crate) fn new(config: InstallerConfig, resolver: Resolver) -> Result<Self, Error> {
        let progress = ProgressDisplay::new(config.style_options.clone(), 0);
        let downloader = DownloaderBuilder::new()
            .directory(config.cache_dir.clone())
            .retries(config.retries)
            .retry_delay(config.retry_delay)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .progress(progress.clone())
            .cancel_token(config.cancel.clone())
            .build()?;

        Ok(Self {
            config,
            resolver,
            downloader,
            progress,
        })
    }

    pub fn install_dir(&self) -> &Path {
        &self.config.install_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    /// Cancelling this token stops the run at the next checkpoint.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.config.cancel
    }

    pub fn progress(&self) -> &ProgressDisplay {
        &self.progress
    }

    /// Location of `versions.json`.
    pub fn state_path(&self) -> PathBuf {
        self.config.cache_dir.join(STATE_FILE)
    }

    /// Install or update every object of `config`.
    pub async fn run(&self, config: &InstallConfig) -> RunReport {
        let objects = config.install_order();
        let span = info_span!("install_run", objects = objects.len());
        self.run_objects(&objects).instrument(span).await
    }

    /// Run the pipeline for the single object called `name`.
    pub async fn install_only(&self, config: &InstallConfig, name: &str) -> Result<RunReport, Error> {
        let object = config
            .objects
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownObject(name.to_string()))?;

        let span = info_span!("install_run", only = %object.name);
        Ok(self.run_objects(&[object]).instrument(span).await)
    }

    async fn run_objects(&self, objects: &[&DownloadObject]) -> RunReport {
        let mut report = RunReport {
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        };
        let mut tracker = VersionTracker::load(&self.state_path());
        info!(
            "Installing {} objects into {:?}",
            objects.len(),
            self.config.install_dir
        );

        let main = self.progress.main();
        main.set_length(objects.len() as u64);
        main.set_position(0);

        for object in objects {
            if self.config.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            self.progress.set_main_message(&object.name);
            let span = info_span!("object", name = %object.name);
            let outcome = self.install_object(object, &mut tracker).instrument(span).await;
            self.progress.increment_main();

            let cancelled = outcome.stage == Stage::Cancelled;
            report.outcomes.push(outcome);
            if cancelled {
                report.cancelled = true;
                break;
            }
        }
        self.progress.finish();

        if report.cancelled {
            warn!(
                "Run cancelled after {} of {} objects",
                report.outcomes.len(),
                objects.len()
            );
        }

        if tracker.is_dirty() {
            if let Err(e) = tracker.save() {
                error!("Cannot save version state: {}", e);
                report.state_error = Some(e.to_string());
            }
        }

        if let Some(days) = self.config.cache_retention_days {
            let keep: HashSet<String> = tracker
                .records()
                .values()
                .map(|r| r.filename.clone())
                .collect();
            match cache::prune(&self.config.cache_dir, days, &keep) {
                Ok(pruned) => report.pruned = pruned,
                Err(e) => warn!("Cannot prune {:?}: {}", self.config.cache_dir, e),
            }
        }

        report.finished_at = Utc::now().to_rfc3339();
        if self.config.write_log && report.downloaded() > 0 {
            report.log_file = self.write_log(&report);
        }

        info!(
            "Run finished: {} installed, {} up to date, {} failed",
            report.installed(),
            report.skipped(),
            report.failed()
        );
        report
    }

    async fn install_object(
        &self,
        object: &DownloadObject,
        tracker: &mut VersionTracker,
    ) -> DownloadOutcome {
        let mut outcome = DownloadOutcome::new(&object.name);

        outcome.enter(Stage::Resolving);
        let asset = match self.resolver.resolve(object).await {
            Ok(asset) => asset,
            Err(e) => {
                error!("Cannot resolve {}: {}", object.name, e);
                return outcome.fail(e);
            }
        };
        outcome.filename = Some(asset.filename.clone());
        outcome.version = asset.version.clone();
        outcome.variant = asset.variant;

        outcome.enter(Stage::Deciding);
        let Some(reason) = tracker.update_reason(
            &object.name,
            &object.pattern,
            &asset,
            object.force_download,
        ) else {
            info!("{} is up to date ({})", object.name, asset.filename);
            outcome.enter(Stage::Skipped);
            return outcome;
        };
        info!("Updating {} to {} ({})", object.name, asset.filename, reason);
        outcome.reason = Some(reason);

        outcome.enter(Stage::Downloading);
        // A cached file under this name may be an older payload; only a
        // never-installed object can have a partial file worth resuming.
        let stale = reason != UpdateReason::NotInstalled
            || tracker
                .get(&object.name)
                .is_some_and(|r| r.filename == asset.filename);
        let download = Download::new(&asset.url, &asset.filename).restart(stale);
        let summary = self.downloader.download(&download).await;
        outcome.http_status = Some(summary.statuscode().as_u16());
        outcome.download_bytes = summary.size();
        match summary.status() {
            Status::Success | Status::Skipped(_) => {}
            Status::Cancelled => return outcome.cancel(),
            Status::Fail(msg) => {
                error!("Download of {} failed: {}", asset.filename, msg);
                return outcome.fail(msg);
            }
            Status::NotStarted => return outcome.fail("download did not start"),
        }
        outcome.downloaded = true;

        let archive = summary
            .path()
            .cloned()
            .unwrap_or_else(|| self.config.cache_dir.join(&asset.filename));

        if let Some(expected) = asset.size {
            match tokio::fs::metadata(&archive).await {
                Ok(meta) if meta.len() != expected => {
                    let message = format!(
                        "{} is {} bytes, the release lists {}",
                        asset.filename,
                        meta.len(),
                        expected
                    );
                    error!("{}", message);
                    if let Err(e) = tokio::fs::remove_file(&archive).await {
                        warn!("Cannot remove {:?}: {}", archive, e);
                    }
                    return outcome.fail(message);
                }
                Ok(_) => {}
                Err(e) => return outcome.fail(format!("cannot stat {:?}: {}", archive, e)),
            }
        }

        if self.config.cancel.is_cancelled() {
            return outcome.cancel();
        }

        outcome.enter(Stage::Extracting);
        let result = match self.extract(&archive, object.flatten()).await {
            Ok(result) => result,
            Err(e) => {
                error!("Extraction worker for {} died: {}", asset.filename, e);
                return outcome.fail(e);
            }
        };
        outcome.files_extracted = result.files_extracted;
        outcome.entries_skipped = result.entries_skipped;
        outcome.entries_failed = result.entries_failed;
        if !result.success {
            if self.config.cancel.is_cancelled() {
                return outcome.cancel();
            }
            let message = result.error.unwrap_or_else(|| "extraction failed".into());
            error!("Cannot extract {}: {}", asset.filename, message);
            return outcome.fail(message);
        }
        outcome.extracted = true;

        outcome.enter(Stage::Recording);
        tracker.record(&object.name, &asset.filename, asset.version.as_deref());

        if let Some(sub) = &object.move_to {
            match apply_move(&self.config.install_dir, sub) {
                Ok(stats) if stats.failed > 0 => {
                    warn!(
                        "Move of '{}' for {} left {} items behind",
                        sub, object.name, stats.failed
                    );
                    outcome.move_error = Some(format!(
                        "{} items could not be moved, '{}' left in place",
                        stats.failed, sub
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Move of '{}' for {} failed: {}", sub, object.name, e);
                    outcome.move_error = Some(e.to_string());
                }
            }
        }

        outcome.enter(Stage::Done);
        info!("Installed {}", asset.filename);
        outcome
    }

    /// Extract on a blocking worker, with an entries bar.
    async fn extract(
        &self,
        archive: &Path,
        flatten: bool,
    ) -> Result<ExtractionResult, tokio::task::JoinError> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pb = self.progress.create_entries_progress(&name, 0);

        let bar = pb.clone();
        let extractor = ArchiveExtractor::new()
            .cancel_token(self.config.cancel.clone())
            .on_progress(move |p| {
                bar.set_length(p.total_files as u64);
                bar.set_position(p.files_extracted as u64);
            });

        let archive = archive.to_path_buf();
        let target = self.config.install_dir.clone();
        let span = Span::current();
        let result = tokio::task::spawn_blocking(move || {
            span.in_scope(|| extractor.extract(&archive, &target, flatten))
        })
        .await;

        self.progress.finish_child(pb);
        result
    }

    /// Write the run report as `downloads_<timestamp>.log` in the cache.
    fn write_log(&self, report: &RunReport) -> Option<PathBuf> {
        let path = self.config.cache_dir.join(format!(
            "downloads_{}.log",
            Utc::now().format("%Y%m%d%H%M%S")
        ));

        let json = match serde_json::to_string_pretty(report) {
            Ok(json) => json,
            Err(e) => {
                warn!("Cannot serialize run report: {}", e);
                return None;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.config.cache_dir)
            .and_then(|_| std::fs::write(&path, json))
        {
            warn!("Cannot write run log {:?}: {}", path, e);
            return None;
        }

        debug!("Run log written to {:?}", path);
        Some(path)
    }
}
